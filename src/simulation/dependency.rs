//! Dependency chain assignment and repair.
//!
//! Every facility of an installation gets a tier and a set of group ids.
//! Once all facilities are drawn the installation is checked as a whole:
//! a Secondary needs a Primary sharing a group, a Tertiary needs a Primary or
//! Secondary sharing a group. Unsupported facilities are promoted to Primary.
//!
//! Promotion only moves tiers up, so it can add support but never remove it.
//! Floating facilities are therefore found against the drawn chains and
//! repaired in one pass.

use super::distribution::TierDistribution;
use crate::domain::{DependencyChain, DependencyTier, GroupIds};
use crate::error::ConfigError;
use crate::validation::bounds::validate_group_id;
use rand::Rng;
use rand::seq::SliceRandom;

/// A facility's final chain and whether repair changed its tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAssignment {
    pub chain: DependencyChain,
    pub promoted: bool,
}

/// Draws and repairs dependency chains for one installation at a time.
#[derive(Debug, Clone)]
pub struct DependencyChainBuilder {
    tiers: TierDistribution,
    group_count: (usize, usize),
    pool: Vec<u8>,
}

impl DependencyChainBuilder {
    /// # Errors
    /// - empty pool, or a pool id outside 1..=9
    /// - group count range that is reversed, starts at zero, or needs more
    ///   ids than the pool holds
    pub fn new(
        tiers: TierDistribution,
        group_count: (usize, usize),
        pool: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ConfigError> {
        let mut pool = pool
            .into_iter()
            .map(validate_group_id)
            .collect::<Result<Vec<_>, _>>()?;
        pool.sort_unstable();
        pool.dedup();

        let (min, max) = group_count;
        if min == 0 || min > max {
            return Err(ConfigError::InvalidRange {
                field: "group_count",
                min: min as f64,
                max: max as f64,
            });
        }
        if pool.is_empty() || max > pool.len() {
            return Err(ConfigError::GroupPool {
                min,
                max,
                pool_size: pool.len(),
            });
        }

        Ok(Self {
            tiers,
            group_count,
            pool,
        })
    }

    pub fn pool(&self) -> &[u8] {
        &self.pool
    }

    /// Draws one unrepaired chain.
    pub fn draw_chain<R: Rng + ?Sized>(&self, rng: &mut R) -> DependencyChain {
        let tier = self.tiers.sample(rng);
        let (min, max) = self.group_count;
        let count = rng.gen_range(min..=max);
        let groups: GroupIds = self.pool.choose_multiple(rng, count).copied().collect();
        DependencyChain::from_pool_draw(tier, groups)
    }

    /// Draws `count` chains for one installation and repairs them.
    pub fn assign<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<ChainAssignment> {
        let drawn: Vec<DependencyChain> = (0..count).map(|_| self.draw_chain(rng)).collect();
        repair(drawn)
    }
}

/// Whether the chain at `index` is supported by some other chain.
/// Primary chains are always supported.
pub fn is_supported(chains: &[DependencyChain], index: usize) -> bool {
    let chain = &chains[index];
    chain.tier() == DependencyTier::Primary
        || chains
            .iter()
            .enumerate()
            .any(|(other, candidate)| other != index && candidate.supports(chain))
}

/// Indices of Secondary/Tertiary chains with no supporting chain.
pub fn floating_indices(chains: &[DependencyChain]) -> Vec<usize> {
    (0..chains.len())
        .filter(|&index| !is_supported(chains, index))
        .collect()
}

/// Promotes every floating chain to Primary, keeping its groups.
pub fn repair(chains: Vec<DependencyChain>) -> Vec<ChainAssignment> {
    let floating = floating_indices(&chains);
    chains
        .into_iter()
        .enumerate()
        .map(|(index, chain)| {
            if floating.binary_search(&index).is_ok() {
                let promoted = chain.promoted();
                tracing::debug!(
                    from = %chain.position(),
                    to = %promoted.position(),
                    "promoted floating facility to primary"
                );
                ChainAssignment {
                    chain: promoted,
                    promoted: true,
                }
            } else {
                ChainAssignment {
                    chain,
                    promoted: false,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentSpec;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn chain(token: &str) -> DependencyChain {
        token.parse().unwrap()
    }

    fn uniform_tiers() -> TierDistribution {
        TierDistribution::new(
            "tier",
            &[
                SegmentSpec::pair(34.0, "P"),
                SegmentSpec::pair(33.0, "S"),
                SegmentSpec::pair(33.0, "T"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_secondary_needs_primary() {
        let chains = vec![chain("S1"), chain("S1")];
        assert_eq!(floating_indices(&chains), vec![0, 1]);

        let chains = vec![chain("P12"), chain("S2")];
        assert!(floating_indices(&chains).is_empty());
    }

    #[test]
    fn test_tertiary_accepts_secondary_support() {
        let chains = vec![chain("P1"), chain("S12"), chain("T2")];
        assert!(floating_indices(&chains).is_empty());
    }

    #[test]
    fn test_tertiary_ignores_tertiary_support() {
        let chains = vec![chain("P3"), chain("T1"), chain("T1")];
        assert_eq!(floating_indices(&chains), vec![1, 2]);
    }

    #[test]
    fn test_repair_promotes_and_keeps_groups() {
        let repaired = repair(vec![chain("P1"), chain("S2"), chain("T2"), chain("T1")]);
        let tokens: Vec<String> = repaired.iter().map(|a| a.chain.position()).collect();
        assert_eq!(tokens, vec!["P1", "P2", "T2", "T1"]);
        let promoted: Vec<bool> = repaired.iter().map(|a| a.promoted).collect();
        assert_eq!(promoted, vec![false, true, false, false]);
    }

    #[test]
    fn test_repair_leaves_no_floaters() {
        let builder = DependencyChainBuilder::new(uniform_tiers(), (1, 3), 1..=3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..200 {
            let assigned = builder.assign(12, &mut rng);
            let chains: Vec<_> = assigned.into_iter().map(|a| a.chain).collect();
            assert!(floating_indices(&chains).is_empty());
        }
    }

    #[test]
    fn test_drawn_groups_come_from_pool_without_repeats() {
        let builder = DependencyChainBuilder::new(uniform_tiers(), (2, 3), [2, 4, 6]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let drawn = builder.draw_chain(&mut rng);
            assert!((2..=3).contains(&drawn.groups().len()));
            assert!(drawn.groups().iter().all(|g| [2, 4, 6].contains(g)));
        }
    }

    #[test]
    fn test_group_count_larger_than_pool_rejected() {
        assert_matches!(
            DependencyChainBuilder::new(uniform_tiers(), (1, 4), 1..=3),
            Err(ConfigError::GroupPool { pool_size: 3, .. })
        );
        assert_matches!(
            DependencyChainBuilder::new(uniform_tiers(), (1, 1), Vec::new()),
            Err(ConfigError::GroupPool { pool_size: 0, .. })
        );
        assert_matches!(
            DependencyChainBuilder::new(uniform_tiers(), (1, 2), [0, 1]),
            Err(ConfigError::OutOfBounds { .. })
        );
    }
}
