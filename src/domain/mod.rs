//! Domain model
//!
//! ## Layout
//!
//! ```text
//! value_objects  ids, YearMonth, DependencyTier, ResiliencyGrade
//! entities       Installation, Facility, System, DependencyChain
//! reference      FacilityType / SystemType tables
//! ```
//!
//! Entities are built only by `crate::simulation`; everything outside that
//! module reads them through accessors.

pub mod entities;
pub mod reference;
pub mod value_objects;

pub use entities::{ConditionAged, DependencyChain, Facility, GroupIds, Installation, System};
pub use reference::{FacilityType, ReferenceData, SystemType};
pub use value_objects::{
    DependencyTier, FacilityId, InstallationId, ResiliencyGrade, SystemId, YearMonth,
};
