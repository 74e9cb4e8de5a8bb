//! Validator registry — stake-weighted, longevity-aware selection.
//!
//! Priority score = capped stake reward × (1 + longevity bonus). Strictly
//! more stake or strictly more age never lowers the score. Selection is a
//! weighted draw over eligible validators with an injected random source,
//! so tests can seed it and replay draws deterministically.

use std::collections::BTreeMap;

use merit_message::IdentityKey;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MeritCoreError;

/// Minimum stake to be eligible to validate.
pub const MINIMUM_STAKE: f64 = 100.0;

/// Stake past `MINIMUM_STAKE × MAX_STAKE_MULTIPLIER` earns no extra
/// base reward — discourages stake concentration.
pub const MAX_STAKE_MULTIPLIER: f64 = 1.5;

/// Base reward per staked token (up to the cap).
pub const BASE_REWARD_RATE: f64 = 0.01;

/// Longevity bonus per year of validator age.
const LONGEVITY_BONUS_PER_YEAR: f64 = 0.25;

/// Longevity bonus ceiling (+75%, reached after 3 years).
const MAX_LONGEVITY_BONUS: f64 = 0.75;

const MS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// A staked participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub address: IdentityKey,
    stake: f64,
    /// Unix ms timestamp of registration.
    pub joined_at: u64,
}

impl Validator {
    /// Create a validator. Negative initial stake is clamped to zero.
    pub fn new(address: IdentityKey, stake: f64, joined_at: u64) -> Self {
        Self {
            address,
            stake: stake.max(0.0),
            joined_at,
        }
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn increase_stake(&mut self, amount: f64) {
        self.stake += amount.max(0.0);
    }

    /// Withdraw stake. Overdrafts are rejected and leave the stake
    /// unchanged — the stake invariant (never negative) holds always.
    pub fn decrease_stake(&mut self, amount: f64) -> Result<(), MeritCoreError> {
        if amount > self.stake {
            return Err(MeritCoreError::StakeOverdraft {
                requested: amount,
                available: self.stake,
            });
        }
        self.stake -= amount;
        Ok(())
    }

    /// Validator age in years at `now`.
    pub fn age_years_at(&self, now: u64) -> f64 {
        now.saturating_sub(self.joined_at) as f64 / MS_PER_YEAR
    }

    /// Stake-proportional reward, capped at the stake ceiling.
    ///
    /// `BASE_REWARD_RATE × min(stake, MINIMUM_STAKE × MAX_STAKE_MULTIPLIER)`:
    /// linear up to 1.5× the minimum stake, flat beyond it.
    pub fn base_reward(&self) -> f64 {
        BASE_REWARD_RATE * self.stake.min(MINIMUM_STAKE * MAX_STAKE_MULTIPLIER)
    }

    /// Longevity bonus at `now`: +25% per year of age, capped at +75%.
    /// Non-decreasing in age, independent of stake.
    pub fn longevity_bonus_at(&self, now: u64) -> f64 {
        (self.age_years_at(now) * LONGEVITY_BONUS_PER_YEAR).min(MAX_LONGEVITY_BONUS)
    }

    /// Selection weight: `base_reward × (1 + longevity_bonus)`.
    ///
    /// Monotone in both inputs — more stake or more age never lowers it.
    pub fn priority_score_at(&self, now: u64) -> f64 {
        self.base_reward() * (1.0 + self.longevity_bonus_at(now))
    }

    pub fn is_eligible(&self) -> bool {
        self.stake >= MINIMUM_STAKE
    }
}

/// The set of all registered validators, unique by address.
pub struct ValidatorRegistry {
    /// BTreeMap: deterministic address order, so seeded draws replay.
    validators: BTreeMap<IdentityKey, Validator>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    /// Insert or replace by address. Re-registering an address updates
    /// stake and join time — last write wins, never a duplicate entry.
    pub fn register(&mut self, validator: Validator) {
        debug!(address = %validator.address, stake = validator.stake, "validator registered");
        self.validators.insert(validator.address.clone(), validator);
    }

    pub fn get(&self, address: &IdentityKey) -> Option<&Validator> {
        self.validators.get(address)
    }

    pub fn get_mut(&mut self, address: &IdentityKey) -> Option<&mut Validator> {
        self.validators.get_mut(address)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    /// Weighted draw of the next validator, weight = priority score.
    ///
    /// Only eligible validators participate. Fails explicitly when the
    /// eligible set is empty — never falls back to a default. Iteration
    /// is address-ordered, so the same seed and state reproduce the
    /// same pick.
    pub fn select_next<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: u64,
    ) -> Result<&Validator, MeritCoreError> {
        let eligible: Vec<(&Validator, f64)> = self
            .validators
            .values()
            .filter(|v| v.is_eligible())
            .map(|v| (v, v.priority_score_at(now)))
            .collect();

        if eligible.is_empty() {
            return Err(MeritCoreError::NoEligibleValidator);
        }

        let total: f64 = eligible.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            // Unreachable while MINIMUM_STAKE > 0, but never draw from
            // a degenerate distribution.
            return Ok(eligible[0].0);
        }

        let mut draw = rng.random_range(0.0..total);
        for (validator, weight) in &eligible {
            if draw < *weight {
                return Ok(validator);
            }
            draw -= weight;
        }
        // Float summation slack: the draw landed past the last bucket.
        Ok(eligible[eligible.len() - 1].0)
    }

    /// Up to `n` validators by priority score, descending.
    ///
    /// Ties go to the earliest `joined_at` (longevity wins
    /// deterministically), then to address order. Stable across calls
    /// on identical state.
    pub fn top_validators(&self, n: usize, now: u64) -> Vec<&Validator> {
        let mut ranked: Vec<(&Validator, f64)> = self
            .validators
            .values()
            .map(|v| (v, v.priority_score_at(now)))
            .collect();

        ranked.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.joined_at.cmp(&b.joined_at))
                .then_with(|| a.address.cmp(&b.address))
        });

        ranked.into_iter().take(n).map(|(v, _)| v).collect()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    const YEAR_MS: u64 = 365 * 24 * 60 * 60 * 1000;

    fn validator(address: &str, stake: f64, joined_at: u64) -> Validator {
        Validator::new(IdentityKey::from(address), stake, joined_at)
    }

    #[test]
    fn eligibility_follows_minimum_stake() {
        assert!(validator("a", MINIMUM_STAKE, 0).is_eligible());
        assert!(validator("a", 250.0, 0).is_eligible());
        assert!(!validator("a", MINIMUM_STAKE - 0.01, 0).is_eligible());
    }

    #[test]
    fn stake_overdraft_rejected_and_unchanged() {
        let mut v = validator("a", 100.0, 0);
        let result = v.decrease_stake(150.0);
        assert!(matches!(
            result,
            Err(MeritCoreError::StakeOverdraft {
                requested,
                available
            }) if requested == 150.0 && available == 100.0
        ));
        assert_eq!(v.stake(), 100.0);

        v.decrease_stake(100.0).unwrap();
        assert_eq!(v.stake(), 0.0);
    }

    #[test]
    fn negative_amounts_never_reduce_stake() {
        let mut v = validator("a", 100.0, 0);
        v.increase_stake(-50.0);
        assert_eq!(v.stake(), 100.0);
    }

    #[test]
    fn base_reward_caps_at_stake_ceiling() {
        let at_cap = validator("a", MINIMUM_STAKE * MAX_STAKE_MULTIPLIER, 0);
        let above_cap = validator("b", 10_000.0, 0);
        assert_eq!(at_cap.base_reward(), above_cap.base_reward());

        let below = validator("c", 100.0, 0);
        assert!(below.base_reward() < at_cap.base_reward());
    }

    #[test]
    fn longevity_bonus_grows_then_caps() {
        let v = validator("a", 100.0, 0);
        assert_eq!(v.longevity_bonus_at(0), 0.0);

        let one_year = v.longevity_bonus_at(YEAR_MS);
        assert!((one_year - 0.25).abs() < 1e-9);

        let ten_years = v.longevity_bonus_at(10 * YEAR_MS);
        assert!((ten_years - 0.75).abs() < 1e-12, "capped at 75%");
    }

    #[test]
    fn priority_score_monotone_in_stake_and_age() {
        let now = 2 * YEAR_MS;
        let poor = validator("a", 100.0, YEAR_MS);
        let rich = validator("b", 140.0, YEAR_MS);
        assert!(rich.priority_score_at(now) > poor.priority_score_at(now));

        let young = validator("c", 100.0, YEAR_MS);
        let old = validator("d", 100.0, 0);
        assert!(old.priority_score_at(now) > young.priority_score_at(now));
    }

    #[test]
    fn register_replaces_by_address() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 100.0, 1000));
        registry.register(validator("a", 300.0, 2000));

        assert_eq!(registry.len(), 1);
        let v = registry.get(&IdentityKey::from("a")).unwrap();
        assert_eq!(v.stake(), 300.0);
        assert_eq!(v.joined_at, 2000);
    }

    #[test]
    fn select_on_empty_registry_fails() {
        let registry = ValidatorRegistry::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            registry.select_next(&mut rng, 0),
            Err(MeritCoreError::NoEligibleValidator)
        ));
    }

    #[test]
    fn select_with_only_ineligible_fails() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 50.0, 0));
        registry.register(validator("b", 99.9, 0));

        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            registry.select_next(&mut rng, 0),
            Err(MeritCoreError::NoEligibleValidator)
        ));
    }

    #[test]
    fn selection_never_picks_ineligible_and_weights_by_score() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 100.0, 0));
        registry.register(validator("b", 200.0, 0));
        registry.register(validator("c", 50.0, 0)); // ineligible

        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..2000 {
            let picked = registry.select_next(&mut rng, 0).unwrap();
            *counts.entry(picked.address.to_string()).or_default() += 1;
        }

        assert_eq!(counts.get("c"), None, "ineligible must never win");
        let a = counts.get("a").copied().unwrap_or(0);
        let b = counts.get("b").copied().unwrap_or(0);
        // Weights: a = 1.0, b = 1.5 (stake capped at 150). Expect b ahead.
        assert!(b > a, "b (weight 1.5) should beat a (weight 1.0): {b} vs {a}");
    }

    #[test]
    fn selection_reproducible_with_same_seed() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 100.0, 0));
        registry.register(validator("b", 200.0, 0));
        registry.register(validator("d", 120.0, 0));

        let picks = |seed: u64| -> Vec<String> {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| registry.select_next(&mut rng, 0).unwrap().address.to_string())
                .collect()
        };

        assert_eq!(picks(7), picks(7));
        assert_ne!(picks(7), picks(8));
    }

    #[test]
    fn top_validators_orders_by_score_desc() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 100.0, 0));
        registry.register(validator("b", 150.0, 0));
        registry.register(validator("c", 120.0, 0));

        let top = registry.top_validators(2, 0);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].address, IdentityKey::from("b"));
        assert_eq!(top[1].address, IdentityKey::from("c"));
    }

    #[test]
    fn top_validators_ties_break_by_earliest_join() {
        // Both past the longevity cap: equal scores, different ages.
        let now = 10 * YEAR_MS;
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("late", 100.0, 5 * YEAR_MS));
        registry.register(validator("early", 100.0, 4 * YEAR_MS));

        let top = registry.top_validators(2, now);
        assert_eq!(top[0].address, IdentityKey::from("early"));
        assert_eq!(top[1].address, IdentityKey::from("late"));
    }

    #[test]
    fn earlier_join_ranks_first_at_equal_stake() {
        let now = 2 * YEAR_MS;
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("a", 100.0, 0));
        registry.register(validator("b", 100.0, YEAR_MS));

        let top = registry.top_validators(2, now);
        assert_eq!(top[0].address, IdentityKey::from("a"));
        assert_eq!(top[1].address, IdentityKey::from("b"));
    }

    #[test]
    fn top_validators_includes_ineligible_ranked_low() {
        let mut registry = ValidatorRegistry::new();
        registry.register(validator("small", 50.0, 0));
        registry.register(validator("big", 150.0, 0));

        let top = registry.top_validators(10, 0);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].address, IdentityKey::from("big"));
    }
}
