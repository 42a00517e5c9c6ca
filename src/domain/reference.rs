//! Facility and system type reference tables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Definition of a facility type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityType {
    pub key: u32,
    pub title: String,
    /// Expected lifespan in years
    pub life_expectancy: u32,
    /// Importance rating, typically 1-5
    #[serde(default = "default_mission_criticality")]
    pub mission_criticality: u32,
}

fn default_mission_criticality() -> u32 {
    1
}

impl FacilityType {
    pub fn life_expectancy_months(&self) -> u32 {
        self.life_expectancy * 12
    }
}

/// Definition of a system type and the facility types it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemType {
    pub key: u32,
    pub title: String,
    /// Expected lifespan in years
    pub life_expectancy: u32,
    #[serde(default)]
    pub facility_keys: Vec<u32>,
}

impl SystemType {
    pub fn life_expectancy_months(&self) -> u32 {
        self.life_expectancy * 12
    }

    pub fn belongs_to(&self, facility_key: u32) -> bool {
        self.facility_keys.contains(&facility_key)
    }
}

/// Both reference tables, keyed and iterated in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    facility_types: BTreeMap<u32, FacilityType>,
    system_types: BTreeMap<u32, SystemType>,
}

impl ReferenceData {
    pub fn new(
        facility_types: impl IntoIterator<Item = FacilityType>,
        system_types: impl IntoIterator<Item = SystemType>,
    ) -> Self {
        Self {
            facility_types: facility_types.into_iter().map(|t| (t.key, t)).collect(),
            system_types: system_types.into_iter().map(|t| (t.key, t)).collect(),
        }
    }

    /// Checks that both tables are populated and every system type points at
    /// a known facility type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.facility_types.is_empty() {
            return Err(ConfigError::EmptyReferenceTable("facility_types"));
        }
        if self.system_types.is_empty() {
            return Err(ConfigError::EmptyReferenceTable("system_types"));
        }
        for system in self.system_types.values() {
            if let Some(&missing) = system
                .facility_keys
                .iter()
                .find(|key| !self.facility_types.contains_key(key))
            {
                return Err(ConfigError::UnknownFacilityType {
                    system_key: system.key,
                    facility_key: missing,
                });
            }
        }
        Ok(())
    }

    pub fn facility_types(&self) -> &BTreeMap<u32, FacilityType> {
        &self.facility_types
    }

    pub fn system_types(&self) -> &BTreeMap<u32, SystemType> {
        &self.system_types
    }

    pub fn facility_type(&self, key: u32) -> Option<&FacilityType> {
        self.facility_types.get(&key)
    }

    pub fn system_type(&self, key: u32) -> Option<&SystemType> {
        self.system_types.get(&key)
    }

    /// System type keys registered for a facility type, ascending.
    pub fn system_keys_for(&self, facility_key: u32) -> Vec<u32> {
        self.system_types
            .values()
            .filter(|s| s.belongs_to(facility_key))
            .map(|s| s.key)
            .collect()
    }

    /// The catalogue used when no reference workbook is supplied.
    pub fn builtin() -> Self {
        let facility = |key, title: &str, life_expectancy, mission_criticality| FacilityType {
            key,
            title: title.to_string(),
            life_expectancy,
            mission_criticality,
        };
        let system = |key, title: &str, life_expectancy, facility_keys: &[u32]| SystemType {
            key,
            title: title.to_string(),
            life_expectancy,
            facility_keys: facility_keys.to_vec(),
        };

        Self::new(
            [
                facility(1, "Headquarters Building", 60, 5),
                facility(2, "Warehouse", 50, 2),
                facility(3, "Aircraft Hangar", 50, 4),
                facility(4, "Barracks", 45, 3),
                facility(5, "Central Power Plant", 40, 5),
                facility(6, "Water Treatment Plant", 40, 5),
                facility(7, "Communications Center", 35, 5),
                facility(8, "Fuel Depot", 40, 4),
                facility(9, "Maintenance Shop", 45, 3),
                facility(10, "Medical Clinic", 50, 4),
                facility(11, "Dining Facility", 40, 2),
                facility(12, "Training Range", 60, 1),
            ],
            [
                system(1, "HVAC", 20, &[1, 3, 4, 7, 9, 10, 11]),
                system(2, "Electrical Distribution", 30, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
                system(3, "Plumbing", 35, &[1, 4, 6, 9, 10, 11]),
                system(4, "Roofing", 25, &[1, 2, 3, 4, 9, 10, 11]),
                system(5, "Fire Suppression", 30, &[1, 2, 3, 7, 8, 10]),
                system(6, "Backup Generator", 25, &[1, 5, 6, 7, 10]),
                system(7, "Water Distribution", 40, &[6]),
                system(8, "Telecom Cabling", 20, &[1, 7]),
                system(9, "Fuel Storage Tanks", 30, &[5, 8]),
                system(10, "Structural Frame", 60, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
                system(11, "Access Control", 15, &[1, 7, 8, 10]),
                system(12, "Elevator", 25, &[1, 10]),
                system(13, "Kitchen Equipment", 15, &[11]),
                system(14, "Turbine Generator", 35, &[5]),
            ],
        )
    }
}
