//! Shared point-pool allocation step

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Eval;
use crate::data::{CharacterData, SourceData};
use crate::state::PoolState;

/// One named pool the shared budget can be spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDef {
    pub key: String,
    pub label: String,
    /// Per-pool cap; `None` means only the remaining budget limits it.
    #[serde(default)]
    pub max: Option<i64>,
}

impl PoolDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            max: None,
        }
    }

    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// A shared point budget distributed across named pools.
///
/// Every pass re-clamps each stored allocation against the current remaining
/// budget and per-pool cap, walking pools in definition order so that as much
/// of the prior allocation as still fits is preserved. After recomputation,
/// `sum(allocations) + remaining == total` always holds.
#[derive(Clone)]
pub struct PoolStep {
    total: Eval<i64>,
    pools: Eval<Vec<PoolDef>>,
}

impl PoolStep {
    pub fn new(
        total: impl Fn(&SourceData, &CharacterData) -> i64 + Send + Sync + 'static,
        pools: impl Fn(&SourceData, &CharacterData) -> Vec<PoolDef> + Send + Sync + 'static,
    ) -> Self {
        Self {
            total: Arc::new(total),
            pools: Arc::new(pools),
        }
    }

    /// Fixed budget and pool list independent of wizard state.
    pub fn fixed(total: i64, pools: Vec<PoolDef>) -> Self {
        Self::new(move |_, _| total, move |_, _| pools.clone())
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut PoolState,
        required: bool,
    ) -> bool {
        let total = (self.total)(source, data).max(0);
        let pools = (self.pools)(source, data);

        let mut remaining = total;
        let mut allocations = BTreeMap::new();
        for pool in &pools {
            let prior = state.allocations.get(&pool.key).copied().unwrap_or(0).max(0);
            let cap = pool.max.unwrap_or(remaining).clamp(0, remaining);
            let value = prior.min(cap);
            remaining -= value;
            allocations.insert(pool.key.clone(), value);
        }

        state.total = total;
        state.remaining = remaining;
        state.allocations = allocations;
        state.pools = pools;
        !required || remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> (SourceData, CharacterData) {
        (SourceData::new(json!({})), CharacterData::empty())
    }

    fn step() -> PoolStep {
        PoolStep::fixed(
            10,
            vec![
                PoolDef::new("combat", "Combat").with_max(6),
                PoolDef::new("lore", "Lore"),
                PoolDef::new("craft", "Craft"),
            ],
        )
    }

    fn state_with(entries: &[(&str, i64)]) -> PoolState {
        PoolState {
            allocations: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            ..Default::default()
        }
    }

    fn conserved(state: &PoolState) -> bool {
        state.allocations.values().sum::<i64>() + state.remaining == state.total
    }

    #[test]
    fn preserves_prior_allocation_that_fits() {
        let (source, data) = fixture();
        let mut state = state_with(&[("combat", 4), ("lore", 3), ("craft", 3)]);
        assert!(step().update(&source, &data, &mut state, true));
        assert_eq!(state.remaining, 0);
        assert!(conserved(&state));
    }

    #[test]
    fn clamps_to_per_pool_max_then_budget() {
        let (source, data) = fixture();
        // combat capped at 6; lore then eats what remains of the budget.
        let mut state = state_with(&[("combat", 9), ("lore", 9), ("craft", 9)]);
        step().update(&source, &data, &mut state, true);
        assert_eq!(state.allocations["combat"], 6);
        assert_eq!(state.allocations["lore"], 4);
        assert_eq!(state.allocations["craft"], 0);
        assert!(conserved(&state));
    }

    #[test]
    fn drops_unknown_pools_and_negative_values() {
        let (source, data) = fixture();
        let mut state = state_with(&[("ghost", 5), ("lore", -3)]);
        assert!(!step().update(&source, &data, &mut state, true));
        assert!(!state.allocations.contains_key("ghost"));
        assert_eq!(state.allocations["lore"], 0);
        assert_eq!(state.remaining, 10);
        assert!(conserved(&state));
    }

    #[test]
    fn conservation_holds_after_budget_shrink() {
        let source = SourceData::new(json!({}));
        let data = CharacterData::new(json!({"bonus": 0}));
        let step = PoolStep::new(
            |_, data| 4 + data.i64_at("bonus").unwrap_or(0),
            |_, _| vec![PoolDef::new("a", "A"), PoolDef::new("b", "B")],
        );
        let mut state = state_with(&[("a", 4), ("b", 4)]);
        step.update(&source, &data, &mut state, true);
        assert_eq!(state.total, 4);
        assert_eq!(state.allocations["a"], 4);
        assert_eq!(state.allocations["b"], 0);
        assert!(conserved(&state));
    }
}
