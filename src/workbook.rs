//! Reference workbook loading.
//!
//! A reference workbook is an `.xlsx` file with a `Facilities` sheet, a
//! `Systems` sheet and an optional `Config` sheet. Columns are located by
//! header name on row 1, ignoring case, spacing and punctuation.

use crate::config::{CountRange, WorkbookOverrides};
use crate::domain::{FacilityType, ReferenceData, SystemType};
use crate::error::{Result, SimError};
use std::collections::HashMap;
use std::path::Path;
use umya_spreadsheet::reader::xlsx;
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub const FACILITIES_SHEET: &str = "Facilities";
pub const SYSTEMS_SHEET: &str = "Systems";
pub const CONFIG_SHEET: &str = "Config";

const DEFAULT_FACILITY_LIFE: u32 = 50;
const DEFAULT_SYSTEM_LIFE: u32 = 30;
const DEFAULT_MISSION_CRITICALITY: u32 = 1;

/// Reference tables plus any scalar overrides from the `Config` sheet.
#[derive(Debug, Clone, Default)]
pub struct LoadedReference {
    pub reference: ReferenceData,
    pub overrides: WorkbookOverrides,
}

pub fn load_reference_workbook(path: &Path) -> Result<LoadedReference> {
    if !path.exists() {
        return Err(SimError::Workbook(format!(
            "workbook {:?} does not exist",
            path
        )));
    }
    let book = xlsx::read(path)
        .map_err(|e| SimError::Workbook(format!("failed to read {:?}: {}", path, e)))?;
    Ok(reference_from_book(&book))
}

/// Extracts reference data from an already opened workbook. Missing sheets
/// yield empty tables.
pub fn reference_from_book(book: &Spreadsheet) -> LoadedReference {
    let facilities = book
        .get_sheet_by_name(FACILITIES_SHEET)
        .map(|sheet| parse_rows(sheet, FACILITIES_SHEET, facility_from_row))
        .unwrap_or_default();
    let systems = book
        .get_sheet_by_name(SYSTEMS_SHEET)
        .map(|sheet| parse_rows(sheet, SYSTEMS_SHEET, system_from_row))
        .unwrap_or_default();
    let overrides = book
        .get_sheet_by_name(CONFIG_SHEET)
        .map(overrides_from_sheet)
        .unwrap_or_default();

    tracing::debug!(
        facility_types = facilities.len(),
        system_types = systems.len(),
        "loaded reference workbook"
    );

    LoadedReference {
        reference: ReferenceData::new(facilities, systems),
        overrides,
    }
}

/// Writes reference tables in the layout `load_reference_workbook` reads.
pub fn write_reference_workbook(reference: &ReferenceData, path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    let sheet = new_sheet(&mut book, FACILITIES_SHEET)?;
    for (col, header) in ["Key", "Title", "Life Expectancy", "Mission Criticality"]
        .iter()
        .enumerate()
    {
        sheet.get_cell_mut((col as u32 + 1, 1)).set_value(*header);
    }
    for (row, facility) in (2u32..).zip(reference.facility_types().values()) {
        sheet.get_cell_mut((1, row)).set_value_number(facility.key);
        sheet.get_cell_mut((2, row)).set_value(facility.title.as_str());
        sheet.get_cell_mut((3, row)).set_value_number(facility.life_expectancy);
        sheet.get_cell_mut((4, row)).set_value_number(facility.mission_criticality);
    }

    let sheet = new_sheet(&mut book, SYSTEMS_SHEET)?;
    for (col, header) in ["Key", "Title", "Life Expectancy", "Facility Key(s)"]
        .iter()
        .enumerate()
    {
        sheet.get_cell_mut((col as u32 + 1, 1)).set_value(*header);
    }
    for (row, system) in (2u32..).zip(reference.system_types().values()) {
        let keys = system
            .facility_keys
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        sheet.get_cell_mut((1, row)).set_value_number(system.key);
        sheet.get_cell_mut((2, row)).set_value(system.title.as_str());
        sheet.get_cell_mut((3, row)).set_value_number(system.life_expectancy);
        sheet.get_cell_mut((4, row)).set_value(keys);
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| SimError::Workbook(format!("failed to write {:?}: {}", path, e)))
}

pub(crate) fn new_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.new_sheet(name)
        .map_err(|e| SimError::Workbook(format!("failed to create sheet {name}: {e}")))
}

// ============================================================================
// Row parsing
// ============================================================================

type Row = HashMap<String, String>;

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn cell_text(sheet: &Worksheet, col: u32, row: u32) -> String {
    sheet
        .get_cell((col, row))
        .map(|cell| cell.get_value().trim().to_string())
        .unwrap_or_default()
}

/// Data rows keyed by normalized header; blank rows are dropped.
fn read_rows(sheet: &Worksheet) -> Vec<(u32, Row)> {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    if max_col == 0 || max_row < 2 {
        return Vec::new();
    }
    let headers: Vec<(u32, String)> = (1..=max_col)
        .map(|col| (col, normalize_header(&cell_text(sheet, col, 1))))
        .filter(|(_, header)| !header.is_empty())
        .collect();

    (2..=max_row)
        .map(|row| {
            let values = headers
                .iter()
                .map(|(col, header)| (header.clone(), cell_text(sheet, *col, row)))
                .filter(|(_, value)| !value.is_empty())
                .collect::<Row>();
            (row, values)
        })
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

fn parse_rows<T>(
    sheet: &Worksheet,
    sheet_name: &str,
    parse: fn(&Row) -> std::result::Result<Option<T>, String>,
) -> Vec<T> {
    read_rows(sheet)
        .into_iter()
        .filter_map(|(row, values)| match parse(&values) {
            Ok(parsed) => parsed,
            Err(reason) => {
                tracing::warn!(sheet = sheet_name, row, %reason, "skipping reference row");
                None
            }
        })
        .collect()
}

fn parse_whole(text: &str) -> Option<u32> {
    let value = text.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then_some(value as u32)
}

fn field_u32(row: &Row, field: &str, default: u32) -> std::result::Result<u32, String> {
    match row.get(field) {
        None => Ok(default),
        Some(text) => parse_whole(text).ok_or_else(|| format!("{field} '{text}' is not a whole number")),
    }
}

/// Key 0 or blank means "no entry".
fn row_key(row: &Row) -> std::result::Result<Option<u32>, String> {
    match row.get("key") {
        None => Ok(None),
        Some(text) => match parse_whole(text) {
            Some(0) => Ok(None),
            Some(key) => Ok(Some(key)),
            None => Err(format!("key '{text}' is not a whole number")),
        },
    }
}

fn facility_from_row(row: &Row) -> std::result::Result<Option<FacilityType>, String> {
    let Some(key) = row_key(row)? else {
        return Ok(None);
    };
    Ok(Some(FacilityType {
        key,
        title: row.get("title").cloned().unwrap_or_default(),
        life_expectancy: field_u32(row, "lifeexpectancy", DEFAULT_FACILITY_LIFE)?,
        mission_criticality: field_u32(row, "missioncriticality", DEFAULT_MISSION_CRITICALITY)?,
    }))
}

fn system_from_row(row: &Row) -> std::result::Result<Option<SystemType>, String> {
    let Some(key) = row_key(row)? else {
        return Ok(None);
    };
    let facility_keys = row
        .get("facilitykeys")
        .or_else(|| row.get("facilitykey"))
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    parse_whole(part).ok_or_else(|| format!("facility key '{part}' is not a whole number"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    Ok(Some(SystemType {
        key,
        title: row.get("title").cloned().unwrap_or_default(),
        life_expectancy: field_u32(row, "lifeexpectancy", DEFAULT_SYSTEM_LIFE)?,
        facility_keys,
    }))
}

fn overrides_from_sheet(sheet: &Worksheet) -> WorkbookOverrides {
    let mut overrides = WorkbookOverrides::default();
    for (row, values) in read_rows(sheet) {
        let (Some(key), Some(value)) = (values.get("key"), values.get("value")) else {
            continue;
        };
        let applied = match normalize_header(key).as_str() {
            "threshold" | "degradationthreshold" => {
                value.parse().ok().map(|v| overrides.threshold = Some(v))
            }
            "initialcondition" | "initialconditionindex" => {
                value.parse().ok().map(|v| overrides.initial_condition = Some(v))
            }
            "resiliencythreshold" => {
                parse_whole(value).map(|v| overrides.resiliency_threshold = Some(v))
            }
            "facilitiesperinstallation" | "facilitycount" => value
                .parse::<CountRange>()
                .ok()
                .map(|v| overrides.facilities_per_installation = Some(v)),
            "groupcount" | "dependencygrouprange" => value
                .parse::<CountRange>()
                .ok()
                .map(|v| overrides.group_count = Some(v)),
            "maxfacilityage" => parse_whole(value).map(|v| overrides.max_facility_age = Some(v)),
            "maxsystemage" => parse_whole(value).map(|v| overrides.max_system_age = Some(v)),
            _ => None,
        };
        if applied.is_none() {
            tracing::warn!(sheet = CONFIG_SHEET, row, key = %key, value = %value, "ignoring config row");
        }
    }
    overrides
}
