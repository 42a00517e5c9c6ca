//! Generated entities: installations, facilities and systems.
//!
//! Entities are assembled once by the generation layer and are read-only
//! afterwards. Fields are private; derived values (condition, resiliency) are
//! written by aggregation before an entity leaves the generator.

use super::value_objects::{
    DependencyTier, FacilityId, InstallationId, ResiliencyGrade, SystemId, YearMonth,
};
use crate::error::ConfigError;
use crate::validation::bounds::validate_group_id;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Group ids of one chain; at most nine distinct values.
pub type GroupIds = SmallVec<[u8; 4]>;

// ============================================================================
// DependencyChain
// ============================================================================

/// A facility's tier plus the dependency groups it participates in.
///
/// Group ids are kept sorted and deduplicated, so the position token is a
/// pure function of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyChain {
    tier: DependencyTier,
    groups: GroupIds,
}

impl DependencyChain {
    /// Builds a chain, sorting and deduplicating the group ids.
    ///
    /// # Errors
    /// Fails if `groups` is empty or contains an id outside 1..=9.
    pub fn new(
        tier: DependencyTier,
        groups: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ConfigError> {
        let mut groups: GroupIds = groups
            .into_iter()
            .map(validate_group_id)
            .collect::<Result<_, _>>()?;
        if groups.is_empty() {
            return Err(ConfigError::InvalidPosition(tier.letter().to_string()));
        }
        groups.sort_unstable();
        groups.dedup();
        Ok(Self { tier, groups })
    }

    /// Builds a chain from ids already drawn from a validated, distinct pool.
    pub(crate) fn from_pool_draw(tier: DependencyTier, mut groups: GroupIds) -> Self {
        groups.sort_unstable();
        groups.dedup();
        Self { tier, groups }
    }

    pub fn tier(&self) -> DependencyTier {
        self.tier
    }

    pub fn groups(&self) -> &[u8] {
        &self.groups
    }

    /// True when the two chains have at least one group id in common.
    pub fn shares_group(&self, other: &DependencyChain) -> bool {
        // both sides are sorted
        let (mut a, mut b) = (self.groups.iter().peekable(), other.groups.iter().peekable());
        while let (Some(x), Some(y)) = (a.peek(), b.peek()) {
            match x.cmp(y) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => {
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    b.next();
                }
            }
        }
        false
    }

    /// True when `self` sits above `lower` and shares a group with it.
    pub fn supports(&self, lower: &DependencyChain) -> bool {
        self.tier.supports(lower.tier) && self.shares_group(lower)
    }

    /// Compact position token: tier letter followed by sorted group ids.
    pub fn position(&self) -> String {
        let mut token = String::with_capacity(1 + self.groups.len());
        token.push(self.tier.letter());
        for id in &self.groups {
            token.push(char::from(b'0' + id));
        }
        token
    }

    /// Same groups, tier forced to Primary.
    pub(crate) fn promoted(&self) -> Self {
        Self {
            tier: DependencyTier::Primary,
            groups: self.groups.clone(),
        }
    }
}

impl fmt::Display for DependencyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.position())
    }
}

impl FromStr for DependencyChain {
    type Err = ConfigError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPosition(token.to_string());
        let mut chars = token.trim().chars();
        let tier = chars
            .next()
            .and_then(DependencyTier::from_letter)
            .ok_or_else(invalid)?;
        let groups = chars
            .map(|c| c.to_digit(10).map(|d| d as u8).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tier, groups).map_err(|_| invalid())
    }
}

// ============================================================================
// ConditionAged
// ============================================================================

/// Anything with a condition value and an age can be run through the
/// degradation predictor.
pub trait ConditionAged {
    /// Current condition value in [0, 100].
    fn condition_value(&self) -> f64;

    /// Age in whole months at `reference`.
    fn age_months(&self, reference: YearMonth) -> u32;
}

// ============================================================================
// System
// ============================================================================

/// A subsystem of a facility with a directly sampled condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    id: SystemId,
    facility_id: FacilityId,
    system_type_key: u32,
    construction_year: i32,
    condition: f64,
}

impl System {
    pub(crate) fn new(
        id: SystemId,
        facility_id: FacilityId,
        system_type_key: u32,
        construction_year: i32,
        condition: f64,
    ) -> Self {
        Self {
            id,
            facility_id,
            system_type_key,
            construction_year,
            condition,
        }
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn facility_id(&self) -> FacilityId {
        self.facility_id
    }

    pub fn system_type_key(&self) -> u32 {
        self.system_type_key
    }

    pub fn construction_year(&self) -> i32 {
        self.construction_year
    }

    pub fn condition(&self) -> f64 {
        self.condition
    }
}

impl ConditionAged for System {
    fn condition_value(&self) -> f64 {
        self.condition
    }

    fn age_months(&self, reference: YearMonth) -> u32 {
        reference.months_since_year(self.construction_year)
    }
}

// ============================================================================
// Facility
// ============================================================================

/// A facility of an installation. Condition is the mean of its systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    id: FacilityId,
    installation_id: InstallationId,
    facility_type_key: u32,
    construction_year: i32,
    chain: DependencyChain,
    promoted: bool,
    resiliency: ResiliencyGrade,
    system_ids: Vec<SystemId>,
    condition: f64,
}

/// Field bundle used by the generator to assemble a facility.
#[derive(Debug, Clone)]
pub(crate) struct FacilityParts {
    pub id: FacilityId,
    pub installation_id: InstallationId,
    pub facility_type_key: u32,
    pub construction_year: i32,
    pub chain: DependencyChain,
    pub promoted: bool,
    pub resiliency: ResiliencyGrade,
    pub system_ids: Vec<SystemId>,
    pub condition: f64,
}

impl Facility {
    pub(crate) fn from_parts(parts: FacilityParts) -> Self {
        Self {
            id: parts.id,
            installation_id: parts.installation_id,
            facility_type_key: parts.facility_type_key,
            construction_year: parts.construction_year,
            chain: parts.chain,
            promoted: parts.promoted,
            resiliency: parts.resiliency,
            system_ids: parts.system_ids,
            condition: parts.condition,
        }
    }

    pub fn id(&self) -> FacilityId {
        self.id
    }

    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    pub fn facility_type_key(&self) -> u32 {
        self.facility_type_key
    }

    pub fn construction_year(&self) -> i32 {
        self.construction_year
    }

    pub fn chain(&self) -> &DependencyChain {
        &self.chain
    }

    pub fn tier(&self) -> DependencyTier {
        self.chain.tier()
    }

    /// Position token of the dependency chain, e.g. `"S13"`.
    pub fn position(&self) -> String {
        self.chain.position()
    }

    /// Whether the repair pass promoted this facility to Primary.
    pub fn was_promoted(&self) -> bool {
        self.promoted
    }

    pub fn resiliency(&self) -> ResiliencyGrade {
        self.resiliency
    }

    pub fn system_ids(&self) -> &[SystemId] {
        &self.system_ids
    }

    pub fn condition(&self) -> f64 {
        self.condition
    }
}

impl ConditionAged for Facility {
    fn condition_value(&self) -> f64 {
        self.condition
    }

    fn age_months(&self, reference: YearMonth) -> u32 {
        reference.months_since_year(self.construction_year)
    }
}

// ============================================================================
// Installation
// ============================================================================

/// A site. Condition is the mean of its facilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    id: InstallationId,
    title: String,
    facility_ids: Vec<FacilityId>,
    condition: f64,
}

impl Installation {
    pub(crate) fn new(
        id: InstallationId,
        title: String,
        facility_ids: Vec<FacilityId>,
        condition: f64,
    ) -> Self {
        Self {
            id,
            title,
            facility_ids,
            condition,
        }
    }

    pub fn id(&self) -> InstallationId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn facility_ids(&self) -> &[FacilityId] {
        &self.facility_ids
    }

    pub fn condition(&self) -> f64 {
        self.condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_token_sorts_groups() {
        let chain = DependencyChain::new(DependencyTier::Secondary, [3, 1]).unwrap();
        assert_eq!(chain.position(), "S13");
        assert_eq!(chain.groups(), &[1, 3]);
    }

    #[test]
    fn test_position_token_parses_back() {
        let chain: DependencyChain = "T257".parse().unwrap();
        assert_eq!(chain.tier(), DependencyTier::Tertiary);
        assert_eq!(chain.groups(), &[2, 5, 7]);
        assert!("X12".parse::<DependencyChain>().is_err());
        assert!("P".parse::<DependencyChain>().is_err());
        assert!("P10".parse::<DependencyChain>().is_err());
    }

    #[test]
    fn test_duplicate_groups_collapse() {
        let chain = DependencyChain::new(DependencyTier::Primary, [2, 2, 1]).unwrap();
        assert_eq!(chain.position(), "P12");
    }

    #[test]
    fn test_support_requires_higher_tier_and_shared_group() {
        let primary = DependencyChain::new(DependencyTier::Primary, [1, 2]).unwrap();
        let secondary = DependencyChain::new(DependencyTier::Secondary, [2]).unwrap();
        let tertiary = DependencyChain::new(DependencyTier::Tertiary, [3]).unwrap();
        assert!(primary.supports(&secondary));
        assert!(!secondary.supports(&primary));
        assert!(!primary.supports(&tertiary));
        assert!(!secondary.supports(&secondary));
    }

    #[test]
    fn test_promotion_keeps_groups() {
        let chain = DependencyChain::new(DependencyTier::Tertiary, [4, 6]).unwrap();
        assert_eq!(chain.promoted().position(), "P46");
    }
}
