//! Flattening of a generated dataset into export rows.

use crate::domain::{ConditionAged, Facility, Installation, ReferenceData, System};
use crate::prediction::{DegradationPredictor, HistoricalPoint, historical_series};
use crate::simulation::GeneratedDataset;
use serde::Serialize;

/// A single exported value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        Cell::Text(value.unwrap_or_default())
    }
}

/// A row type with a fixed column layout.
pub trait TabularRow: Serialize {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

/// Named, header-first table ready for a writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn from_rows<T: TabularRow>(name: &'static str, rows: &[T]) -> Self {
        Self {
            name,
            headers: T::HEADERS,
            rows: rows.iter().map(TabularRow::cells).collect(),
        }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationRow {
    pub installation_id: String,
    pub title: String,
    pub facility_count: usize,
    pub condition: f64,
}

impl TabularRow for InstallationRow {
    const HEADERS: &'static [&'static str] =
        &["installation_id", "title", "facility_count", "condition"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.installation_id.as_str().into(),
            self.title.as_str().into(),
            self.facility_count.into(),
            self.condition.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRow {
    pub facility_id: String,
    pub installation_id: String,
    pub facility_type_key: u32,
    pub facility_type: String,
    pub construction_year: i32,
    pub age_years: i32,
    pub position: String,
    pub promoted: bool,
    pub resiliency_grade: String,
    pub life_expectancy: u32,
    pub mission_criticality: u32,
    pub system_count: usize,
    pub condition: f64,
    pub predicted_crossing: Option<String>,
}

impl TabularRow for FacilityRow {
    const HEADERS: &'static [&'static str] = &[
        "facility_id",
        "installation_id",
        "facility_type_key",
        "facility_type",
        "construction_year",
        "age_years",
        "position",
        "promoted",
        "resiliency_grade",
        "life_expectancy",
        "mission_criticality",
        "system_count",
        "condition",
        "predicted_crossing",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.facility_id.as_str().into(),
            self.installation_id.as_str().into(),
            self.facility_type_key.into(),
            self.facility_type.as_str().into(),
            self.construction_year.into(),
            self.age_years.into(),
            self.position.as_str().into(),
            self.promoted.into(),
            self.resiliency_grade.as_str().into(),
            self.life_expectancy.into(),
            self.mission_criticality.into(),
            self.system_count.into(),
            self.condition.into(),
            self.predicted_crossing.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemRow {
    pub system_id: String,
    pub facility_id: String,
    pub system_type_key: u32,
    pub system_type: String,
    pub construction_year: i32,
    pub age_years: i32,
    pub life_expectancy: u32,
    pub condition: f64,
    pub predicted_crossing: Option<String>,
}

impl TabularRow for SystemRow {
    const HEADERS: &'static [&'static str] = &[
        "system_id",
        "facility_id",
        "system_type_key",
        "system_type",
        "construction_year",
        "age_years",
        "life_expectancy",
        "condition",
        "predicted_crossing",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.system_id.as_str().into(),
            self.facility_id.as_str().into(),
            self.system_type_key.into(),
            self.system_type.as_str().into(),
            self.construction_year.into(),
            self.age_years.into(),
            self.life_expectancy.into(),
            self.condition.into(),
            self.predicted_crossing.clone().into(),
        ]
    }
}

/// One point of a facility or system condition history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub entity_id: String,
    pub date: String,
    pub months_ago: u32,
    pub value: f64,
}

impl TabularRow for HistoryRow {
    const HEADERS: &'static [&'static str] = &["entity_id", "date", "months_ago", "value"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.entity_id.as_str().into(),
            self.date.as_str().into(),
            self.months_ago.into(),
            self.value.into(),
        ]
    }
}

/// One system joined with its facility and installation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenormalizedRow {
    pub installation_id: String,
    pub installation_title: String,
    pub installation_condition: f64,
    pub facility_id: String,
    pub facility_type: String,
    pub position: String,
    pub resiliency_grade: String,
    pub facility_condition: f64,
    pub system_id: String,
    pub system_type: String,
    pub system_age_years: i32,
    pub system_condition: f64,
    pub predicted_crossing: Option<String>,
}

impl TabularRow for DenormalizedRow {
    const HEADERS: &'static [&'static str] = &[
        "installation_id",
        "installation_title",
        "installation_condition",
        "facility_id",
        "facility_type",
        "position",
        "resiliency_grade",
        "facility_condition",
        "system_id",
        "system_type",
        "system_age_years",
        "system_condition",
        "predicted_crossing",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.installation_id.as_str().into(),
            self.installation_title.as_str().into(),
            self.installation_condition.into(),
            self.facility_id.as_str().into(),
            self.facility_type.as_str().into(),
            self.position.as_str().into(),
            self.resiliency_grade.as_str().into(),
            self.facility_condition.into(),
            self.system_id.as_str().into(),
            self.system_type.as_str().into(),
            self.system_age_years.into(),
            self.system_condition.into(),
            self.predicted_crossing.clone().into(),
        ]
    }
}

// ============================================================================
// Nested tree
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemNode {
    #[serde(flatten)]
    pub system: SystemRow,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoricalPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityNode {
    #[serde(flatten)]
    pub facility: FacilityRow,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoricalPoint>,
    pub systems: Vec<SystemNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationNode {
    #[serde(flatten)]
    pub installation: InstallationRow,
    pub facilities: Vec<FacilityNode>,
}

/// Normalized tables; the history tables are empty unless requested.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTables {
    pub installations: Vec<InstallationRow>,
    pub facilities: Vec<FacilityRow>,
    pub systems: Vec<SystemRow>,
    pub facility_history: Vec<HistoryRow>,
    pub system_history: Vec<HistoryRow>,
}

impl NormalizedTables {
    pub fn tables(&self) -> Vec<Table> {
        let mut tables = vec![
            Table::from_rows("installations", &self.installations),
            Table::from_rows("facilities", &self.facilities),
            Table::from_rows("systems", &self.systems),
        ];
        if !self.facility_history.is_empty() {
            tables.push(Table::from_rows("facility_history", &self.facility_history));
        }
        if !self.system_history.is_empty() {
            tables.push(Table::from_rows("system_history", &self.system_history));
        }
        tables
    }
}

// ============================================================================
// DataTransformer
// ============================================================================

/// Builds export rows from a dataset, resolving type titles from the
/// reference tables and crossings from the predictor.
pub struct DataTransformer<'a> {
    dataset: &'a GeneratedDataset,
    reference: &'a ReferenceData,
    predictor: DegradationPredictor,
    include_time_series: bool,
}

impl<'a> DataTransformer<'a> {
    pub fn new(
        dataset: &'a GeneratedDataset,
        reference: &'a ReferenceData,
        predictor: DegradationPredictor,
    ) -> Self {
        Self {
            dataset,
            reference,
            predictor,
            include_time_series: false,
        }
    }

    pub fn with_time_series(mut self, include: bool) -> Self {
        self.include_time_series = include;
        self
    }

    fn age_years(&self, construction_year: i32) -> i32 {
        (self.dataset.reference_month().year() - construction_year).max(0)
    }

    fn crossing<E: ConditionAged>(&self, entity: &E) -> Option<String> {
        self.predictor
            .predict_entity(entity)
            .and_then(|crossing| crossing.year_month())
            .map(|month| month.to_string())
    }

    fn history(&self, condition: f64, construction_year: i32) -> Vec<HistoricalPoint> {
        if !self.include_time_series {
            return Vec::new();
        }
        historical_series(
            condition,
            construction_year,
            self.predictor.initial_value(),
            self.dataset.reference_month(),
        )
    }

    pub fn installation_row(&self, installation: &Installation) -> InstallationRow {
        InstallationRow {
            installation_id: installation.id().to_string(),
            title: installation.title().to_string(),
            facility_count: installation.facility_ids().len(),
            condition: installation.condition(),
        }
    }

    pub fn facility_row(&self, facility: &Facility) -> FacilityRow {
        let facility_type = self.reference.facility_type(facility.facility_type_key());
        FacilityRow {
            facility_id: facility.id().to_string(),
            installation_id: facility.installation_id().to_string(),
            facility_type_key: facility.facility_type_key(),
            facility_type: facility_type.map(|t| t.title.clone()).unwrap_or_default(),
            construction_year: facility.construction_year(),
            age_years: self.age_years(facility.construction_year()),
            position: facility.position(),
            promoted: facility.was_promoted(),
            resiliency_grade: facility.resiliency().to_string(),
            life_expectancy: facility_type.map(|t| t.life_expectancy).unwrap_or_default(),
            mission_criticality: facility_type
                .map(|t| t.mission_criticality)
                .unwrap_or_default(),
            system_count: facility.system_ids().len(),
            condition: facility.condition(),
            predicted_crossing: self.crossing(facility),
        }
    }

    pub fn system_row(&self, system: &System) -> SystemRow {
        let system_type = self.reference.system_type(system.system_type_key());
        SystemRow {
            system_id: system.id().to_string(),
            facility_id: system.facility_id().to_string(),
            system_type_key: system.system_type_key(),
            system_type: system_type.map(|t| t.title.clone()).unwrap_or_default(),
            construction_year: system.construction_year(),
            age_years: self.age_years(system.construction_year()),
            life_expectancy: system_type.map(|t| t.life_expectancy).unwrap_or_default(),
            condition: system.condition(),
            predicted_crossing: self.crossing(system),
        }
    }

    pub fn normalized(&self) -> NormalizedTables {
        let mut tables = NormalizedTables {
            installations: self
                .dataset
                .installations()
                .values()
                .map(|i| self.installation_row(i))
                .collect(),
            facilities: self
                .dataset
                .facilities()
                .values()
                .map(|f| self.facility_row(f))
                .collect(),
            systems: self
                .dataset
                .systems()
                .values()
                .map(|s| self.system_row(s))
                .collect(),
            ..NormalizedTables::default()
        };

        if self.include_time_series {
            for facility in self.dataset.facilities().values() {
                let id = facility.id().to_string();
                tables.facility_history.extend(
                    self.history(facility.condition(), facility.construction_year())
                        .into_iter()
                        .map(|point| history_row(&id, point)),
                );
            }
            for system in self.dataset.systems().values() {
                let id = system.id().to_string();
                tables.system_history.extend(
                    self.history(system.condition(), system.construction_year())
                        .into_iter()
                        .map(|point| history_row(&id, point)),
                );
            }
        }
        tables
    }

    /// One row per system, in generation order.
    pub fn denormalized(&self) -> Vec<DenormalizedRow> {
        let mut rows = Vec::with_capacity(self.dataset.systems().len());
        for installation in self.dataset.installations().values() {
            for facility in self.dataset.facilities_of(installation) {
                let facility_type = self
                    .reference
                    .facility_type(facility.facility_type_key())
                    .map(|t| t.title.clone())
                    .unwrap_or_default();
                for system in self.dataset.systems_of(facility) {
                    let system_row = self.system_row(system);
                    rows.push(DenormalizedRow {
                        installation_id: installation.id().to_string(),
                        installation_title: installation.title().to_string(),
                        installation_condition: installation.condition(),
                        facility_id: facility.id().to_string(),
                        facility_type: facility_type.clone(),
                        position: facility.position(),
                        resiliency_grade: facility.resiliency().to_string(),
                        facility_condition: facility.condition(),
                        system_id: system_row.system_id,
                        system_type: system_row.system_type,
                        system_age_years: system_row.age_years,
                        system_condition: system_row.condition,
                        predicted_crossing: system_row.predicted_crossing,
                    });
                }
            }
        }
        rows
    }

    /// Installations with their facilities and systems nested inside.
    pub fn tree(&self) -> Vec<InstallationNode> {
        self.dataset
            .installations()
            .values()
            .map(|installation| InstallationNode {
                installation: self.installation_row(installation),
                facilities: self
                    .dataset
                    .facilities_of(installation)
                    .map(|facility| FacilityNode {
                        facility: self.facility_row(facility),
                        history: self.history(facility.condition(), facility.construction_year()),
                        systems: self
                            .dataset
                            .systems_of(facility)
                            .map(|system| SystemNode {
                                system: self.system_row(system),
                                history: self
                                    .history(system.condition(), system.construction_year()),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

fn history_row(entity_id: &str, point: HistoricalPoint) -> HistoryRow {
    HistoryRow {
        entity_id: entity_id.to_string(),
        date: point.date,
        months_ago: point.months_ago,
        value: point.value,
    }
}
