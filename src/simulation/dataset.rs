//! The output of a generation run.

use crate::domain::{
    Facility, FacilityId, Installation, InstallationId, System, SystemId, YearMonth,
};
use crate::error::{Result, SimError};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Everything generated for one installation.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationBundle {
    pub installation: Installation,
    pub facilities: Vec<Facility>,
    pub systems: Vec<System>,
}

/// Generated entities keyed by id, in generation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDataset {
    seed: u64,
    reference_month: YearMonth,
    installations: IndexMap<InstallationId, Installation>,
    facilities: IndexMap<FacilityId, Facility>,
    systems: IndexMap<SystemId, System>,
}

fn insert_unique<K, V>(
    map: &mut IndexMap<K, V>,
    kind: &'static str,
    id: K,
    value: V,
) -> Result<()>
where
    K: Hash + Eq + std::fmt::Display,
{
    match map.entry(id) {
        Entry::Occupied(entry) => Err(SimError::DuplicateId {
            kind,
            id: entry.key().to_string(),
        }),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

impl GeneratedDataset {
    pub fn new(seed: u64, reference_month: YearMonth) -> Self {
        Self {
            seed,
            reference_month,
            installations: IndexMap::new(),
            facilities: IndexMap::new(),
            systems: IndexMap::new(),
        }
    }

    /// Collects bundles in order.
    ///
    /// # Errors
    /// `SimError::DuplicateId` if any id repeats; nothing is overwritten.
    pub fn from_bundles(
        seed: u64,
        reference_month: YearMonth,
        bundles: impl IntoIterator<Item = InstallationBundle>,
    ) -> Result<Self> {
        let mut dataset = Self::new(seed, reference_month);
        for bundle in bundles {
            dataset.push(bundle)?;
        }
        Ok(dataset)
    }

    pub fn push(&mut self, bundle: InstallationBundle) -> Result<()> {
        let InstallationBundle {
            installation,
            facilities,
            systems,
        } = bundle;
        insert_unique(
            &mut self.installations,
            "installation",
            installation.id(),
            installation,
        )?;
        for facility in facilities {
            insert_unique(&mut self.facilities, "facility", facility.id(), facility)?;
        }
        for system in systems {
            insert_unique(&mut self.systems, "system", system.id(), system)?;
        }
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn reference_month(&self) -> YearMonth {
        self.reference_month
    }

    pub fn installations(&self) -> &IndexMap<InstallationId, Installation> {
        &self.installations
    }

    pub fn facilities(&self) -> &IndexMap<FacilityId, Facility> {
        &self.facilities
    }

    pub fn systems(&self) -> &IndexMap<SystemId, System> {
        &self.systems
    }

    /// Facilities of an installation, in the installation's order.
    pub fn facilities_of<'a>(
        &'a self,
        installation: &'a Installation,
    ) -> impl Iterator<Item = &'a Facility> + 'a {
        installation
            .facility_ids()
            .iter()
            .filter_map(|id| self.facilities.get(id))
    }

    /// Systems of a facility, in the facility's order.
    pub fn systems_of<'a>(&'a self, facility: &'a Facility) -> impl Iterator<Item = &'a System> + 'a {
        facility
            .system_ids()
            .iter()
            .filter_map(|id| self.systems.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.installations.is_empty()
    }
}
