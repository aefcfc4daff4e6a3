//! Policy proposals and the delayed, duration-scoped effect engine.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::{EventKind, GameEvent, Severity};
use crate::world::{CityState, DistrictId, Metric, PolicyCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRequirement {
    SimpleMajority,
    SuperMajority,
    ExecutiveOrder,
    Referendum,
}

/// Which districts a proposal is aimed at, for vote scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalScope {
    AllDistricts,
    Districts(Vec<DistrictId>),
}

impl ProposalScope {
    pub fn includes(&self, district: DistrictId) -> bool {
        match self {
            ProposalScope::AllDistricts => true,
            ProposalScope::Districts(list) => list.contains(&district),
        }
    }

    pub fn is_targeted(&self) -> bool {
        matches!(self, ProposalScope::Districts(_))
    }
}

/// Where an individual effect lands. `AdjacentTo` spills onto every
/// neighbour of the named district at half magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectScope {
    District(DistrictId),
    Districts(Vec<DistrictId>),
    Citywide,
    AdjacentTo(DistrictId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEffect {
    pub scope: EffectScope,
    pub metric: Metric,
    pub delta: f64,
    /// Turns before the effect starts acting.
    #[serde(default)]
    pub delay: u32,
    /// Turns the effect stays active once it starts; 0 means permanent.
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProposal {
    pub name: String,
    pub category: PolicyCategory,
    pub requirement: VoteRequirement,
    /// Budget cost on enactment; negative values raise revenue.
    pub cost: f64,
    /// How politically charged the proposal is, in [0, 1].
    pub political_cost: f64,
    pub scope: ProposalScope,
    pub effects: Vec<PolicyEffect>,
}

/// A scheduled effect being tracked by its delay and duration countdowns,
/// distinct from the static template on the proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub source: String,
    pub effect: PolicyEffect,
    pub delay_remaining: u32,
    /// `None` is the permanent sentinel and never triggers removal.
    pub duration_remaining: Option<u32>,
    announced: bool,
}

impl ActiveEffect {
    pub fn new(source: impl Into<String>, effect: PolicyEffect) -> Self {
        let duration_remaining = if effect.duration == 0 {
            None
        } else {
            Some(effect.duration)
        };
        Self {
            source: source.into(),
            delay_remaining: effect.delay,
            duration_remaining,
            effect,
            announced: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct EffectEngine {
    active: Vec<ActiveEffect>,
}

impl EffectEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, proposal: &PolicyProposal) {
        for effect in &proposal.effects {
            self.active
                .push(ActiveEffect::new(proposal.name.clone(), effect.clone()));
        }
    }

    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advances every tracked effect by one turn. An effect is inert until
    /// its delay countdown has run out; once active it applies its delta
    /// every tick, and its expiry countdown only decrements while active.
    pub fn run(&mut self, state: &mut CityState, events: &mut Vec<GameEvent>) {
        self.active.retain_mut(|active| {
            if active.delay_remaining > 0 {
                active.delay_remaining -= 1;
                return true;
            }
            if !active.announced {
                events.push(GameEvent::new(
                    EventKind::PolicyEffect,
                    Severity::Info,
                    format!("policy '{}' is now in effect", active.source),
                ));
                active.announced = true;
            }
            apply_scoped(state, &active.effect);
            match &mut active.duration_remaining {
                Some(remaining) => {
                    *remaining -= 1;
                    *remaining > 0
                }
                None => true,
            }
        });
    }
}

fn apply_scoped(state: &mut CityState, effect: &PolicyEffect) {
    match &effect.scope {
        EffectScope::District(id) => apply_delta(state, *id, effect.metric, effect.delta),
        EffectScope::Districts(list) => {
            for id in list {
                apply_delta(state, *id, effect.metric, effect.delta);
            }
        }
        EffectScope::Citywide => {
            for district in state.districts.values_mut() {
                district.metrics.apply(effect.metric, effect.delta);
            }
        }
        EffectScope::AdjacentTo(source) => {
            let neighbours = match state.district(*source) {
                Some(district) => district.adjacent.clone(),
                None => {
                    warn!(district = %source, "adjacency effect names an unknown source district");
                    return;
                }
            };
            for id in neighbours {
                apply_delta(state, id, effect.metric, effect.delta * 0.5);
            }
        }
    }
}

fn apply_delta(state: &mut CityState, id: DistrictId, metric: Metric, delta: f64) {
    match state.district_mut(id) {
        // DistrictMetrics::set re-clamps ratio metrics after every write.
        Some(district) => district.metrics.apply(metric, delta),
        None => warn!(district = %id, "policy effect targets an unknown district"),
    }
}
