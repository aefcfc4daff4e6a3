use std::collections::BTreeMap;
use std::mem;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CityConfig, ConfigError, GoalComparison, GoalMetric, ScenarioGoal};
use crate::events::{EventKind, GameEvent, Severity};
use crate::policy::{EffectEngine, PolicyProposal};
use crate::systems::{
    district_priorities, EconomySystem, ElectionResult, PoliticsSystem, PopulationMove,
    TrafficSystem, TransitSystem, VoteResult, ZoningError, ZoningSystem,
    ELECTION_INTERVAL,
};
use crate::world::{
    CityMetrics, CityState, District, DistrictId, DistrictMetrics, VoteRecord, ZoneKind,
};

/// Balance below which the city is bankrupt and the run ends.
pub const BANKRUPTCY_THRESHOLD: f64 = -500_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Policies must pass a council vote before they are enacted.
    Political,
    /// Policies apply immediately and the direct controls are unlocked.
    Sandbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub won: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub goal: ScenarioGoal,
    pub met: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictDelta {
    pub district: DistrictId,
    pub name: String,
    pub population_before: u64,
    pub population_after: u64,
    pub before: DistrictMetrics,
    pub after: DistrictMetrics,
}

/// Structured summary of one advanced turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub turn: u64,
    pub before: CityMetrics,
    pub after: CityMetrics,
    pub districts: Vec<DistrictDelta>,
    pub moves: Vec<PopulationMove>,
    pub events: Vec<GameEvent>,
    pub election: Option<ElectionResult>,
    /// Votes conducted via `propose_policy` since the previous tick.
    pub votes: Vec<VoteResult>,
    pub game_over: Option<GameOutcome>,
}

/// Direct levers, honoured only in Sandbox mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxControls {
    pub density_cap_scale: Option<f64>,
    pub road_capacity_scale: Option<f64>,
    pub parking_minimums: Option<bool>,
    pub tax_rate: Option<f64>,
    pub transit_subsidy: Option<f64>,
}

/// The simulation orchestrator: owns the canonical state, sequences the
/// subsystems in a fixed order each tick and evaluates termination.
pub struct Engine {
    state: CityState,
    mode: GameMode,
    seed: u64,
    turn: u64,
    goals: Vec<ScenarioGoal>,
    effects: EffectEngine,
    outcome: Option<GameOutcome>,
    pending_votes: Vec<VoteResult>,
    zoning: ZoningSystem,
    traffic: TrafficSystem,
    transit: TransitSystem,
    economy: EconomySystem,
    politics: PoliticsSystem,
}

impl Engine {
    /// Validates the config and deep-builds the owned state, seeding the
    /// persistent road loads and each representative's priorities.
    pub fn new(config: CityConfig, mode: GameMode) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = config.build_state();
        let traffic = TrafficSystem::new();
        traffic.seed_loads(&mut state);

        let priorities: BTreeMap<DistrictId, _> = state
            .districts
            .iter()
            .map(|(id, district)| (*id, district_priorities(district)))
            .collect();
        for (id, rep) in state.representatives.iter_mut() {
            if let Some(p) = priorities.get(id) {
                rep.priorities = p.clone();
            }
        }

        info!(city = %state.name, districts = state.districts.len(), ?mode, "engine initialised");
        Ok(Self {
            state,
            mode,
            seed: config.seed,
            turn: 0,
            goals: config.goals,
            effects: EffectEngine::new(),
            outcome: None,
            pending_votes: Vec::new(),
            zoning: ZoningSystem::new(),
            traffic,
            transit: TransitSystem::new(),
            economy: EconomySystem::new(),
            politics: PoliticsSystem::new(),
        })
    }

    /// Advances the simulation one turn through the fixed phase order.
    /// After termination this is a no-op returning a sentinel result.
    pub fn tick(&mut self) -> TurnResult {
        if self.outcome.is_some() {
            return self.terminal_result();
        }
        self.turn += 1;
        debug!(turn = self.turn, "tick start");

        let before = self.state.city_metrics();
        let district_snapshot: Vec<(DistrictId, String, u64, DistrictMetrics)> = self
            .state
            .districts
            .values()
            .map(|d| (d.id, d.name.clone(), d.population, d.metrics.clone()))
            .collect();

        let mut events = Vec::new();

        // Phase order is a hard guarantee: later phases consume values the
        // earlier ones wrote this same tick.
        self.zoning.run(&mut self.state);
        self.traffic.run(&mut self.state);
        let transit_cost = self.transit.run(&mut self.state, &mut events);
        self.effects.run(&mut self.state, &mut events);
        let moves = self
            .economy
            .run(&mut self.state, transit_cost, &mut events);
        self.politics.update_approval(&mut self.state);
        let election = if self.turn % ELECTION_INTERVAL == 0 {
            Some(
                self.politics
                    .run_election(&mut self.state, self.seed, self.turn, &mut events),
            )
        } else {
            None
        };

        self.check_termination(&mut events);

        let after = self.state.city_metrics();
        let districts = district_snapshot
            .into_iter()
            .filter_map(|(id, name, population_before, metrics_before)| {
                self.state.district(id).map(|d| DistrictDelta {
                    district: id,
                    name,
                    population_before,
                    population_after: d.population,
                    before: metrics_before,
                    after: d.metrics.clone(),
                })
            })
            .collect();

        TurnResult {
            turn: self.turn,
            before,
            after,
            districts,
            moves,
            events,
            election,
            votes: mem::take(&mut self.pending_votes),
            game_over: self.outcome.clone(),
        }
    }

    /// In Political mode the proposal goes to a council vote and is enacted
    /// only if it passes; Sandbox mode enacts directly. Returns `None` once
    /// the game has ended.
    pub fn propose_policy(&mut self, proposal: &PolicyProposal) -> Option<VoteResult> {
        if self.outcome.is_some() {
            return None;
        }
        let result = match self.mode {
            GameMode::Political => {
                let result = self.politics.conduct_vote(&self.state, proposal);
                for ballot in &result.ballots {
                    if let Some(rep) = self.state.representatives.get_mut(&ballot.district) {
                        rep.vote_history.push(VoteRecord {
                            turn: self.turn,
                            proposal: proposal.name.clone(),
                            supported: ballot.supported,
                        });
                    }
                }
                if result.passed {
                    self.enact(proposal);
                }
                result
            }
            GameMode::Sandbox => {
                self.enact(proposal);
                VoteResult {
                    proposal: proposal.name.clone(),
                    requirement: proposal.requirement,
                    passed: true,
                    votes_for: 0,
                    votes_against: 0,
                    ballots: Vec::new(),
                }
            }
        };
        self.pending_votes.push(result.clone());
        Some(result)
    }

    fn enact(&mut self, proposal: &PolicyProposal) {
        self.state.budget.balance -= proposal.cost;
        self.effects.schedule(proposal);
        info!(policy = %proposal.name, cost = proposal.cost, "policy enacted");
    }

    /// Merges a partial zone allocation into a district. The merged mix must
    /// still sum to 100% within tolerance.
    pub fn apply_zoning_change(
        &mut self,
        district: DistrictId,
        changes: &BTreeMap<ZoneKind, f64>,
    ) -> Result<(), ZoningError> {
        match self.state.district_mut(district) {
            Some(d) => self.zoning.apply_zoning_change(d, changes),
            None => Err(ZoningError::UnknownDistrict(district)),
        }
    }

    /// Only effective in Sandbox mode; Political mode logs and ignores.
    pub fn apply_sandbox_controls(&mut self, controls: &SandboxControls) {
        if self.mode != GameMode::Sandbox {
            warn!("sandbox controls ignored outside Sandbox mode");
            return;
        }
        for district in self.state.districts.values_mut() {
            if let Some(scale) = controls.density_cap_scale {
                district.max_density = (district.max_density * scale).max(0.0);
            }
            if let Some(parking) = controls.parking_minimums {
                district.parking_minimums = parking;
            }
        }
        if let Some(scale) = controls.road_capacity_scale {
            for (_, segment) in self.state.roads.iter_mut() {
                segment.capacity = (segment.capacity * scale).max(0.0);
            }
        }
        if let Some(rate) = controls.tax_rate {
            self.state.budget.tax_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(subsidy) = controls.transit_subsidy {
            self.state.budget.transit_subsidy = subsidy.clamp(0.0, 1.0);
        }
    }

    pub fn check_goals(&self) -> Vec<GoalStatus> {
        let metrics = self.state.city_metrics();
        self.goals
            .iter()
            .map(|goal| GoalStatus {
                goal: goal.clone(),
                met: goal_met(goal, &metrics, self.state.budget.balance),
            })
            .collect()
    }

    fn check_termination(&mut self, events: &mut Vec<GameEvent>) {
        if self.state.budget.balance < BANKRUPTCY_THRESHOLD {
            let reason = format!(
                "bankruptcy: balance {:.0} fell below {:.0}",
                self.state.budget.balance, BANKRUPTCY_THRESHOLD
            );
            events.push(GameEvent::new(
                EventKind::Crisis,
                Severity::Critical,
                reason.clone(),
            ));
            info!(turn = self.turn, %reason, "simulation ended");
            self.outcome = Some(GameOutcome { won: false, reason });
            return;
        }
        if !self.goals.is_empty() {
            let statuses = self.check_goals();
            if statuses.iter().all(|s| s.met) {
                let reason = format!("all {} scenario goals met", statuses.len());
                events.push(GameEvent::new(
                    EventKind::Milestone,
                    Severity::Info,
                    reason.clone(),
                ));
                info!(turn = self.turn, %reason, "simulation ended");
                self.outcome = Some(GameOutcome { won: true, reason });
            }
        }
    }

    /// Sentinel for ticks requested after the run has ended: the turn
    /// counter and all metrics are left untouched.
    fn terminal_result(&self) -> TurnResult {
        let metrics = self.state.city_metrics();
        let outcome = self
            .outcome
            .clone()
            .expect("terminal result requires an outcome");
        TurnResult {
            turn: self.turn,
            before: metrics.clone(),
            after: metrics,
            districts: Vec::new(),
            moves: Vec::new(),
            events: vec![GameEvent::new(
                EventKind::Crisis,
                Severity::Critical,
                format!("simulation has ended: {}", outcome.reason),
            )],
            election: None,
            votes: Vec::new(),
            game_over: Some(outcome),
        }
    }

    pub fn state(&self) -> &CityState {
        &self.state
    }

    pub fn metrics(&self) -> CityMetrics {
        self.state.city_metrics()
    }

    pub fn districts(&self) -> impl Iterator<Item = &District> {
        self.state.districts.values()
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    pub fn active_effects(&self) -> usize {
        self.effects.active_count()
    }
}

fn goal_met(goal: &ScenarioGoal, metrics: &CityMetrics, balance: f64) -> bool {
    let value = match goal.metric {
        GoalMetric::Population => metrics.population as f64,
        GoalMetric::AverageCommute => metrics.average_commute,
        GoalMetric::AverageRent => metrics.average_rent,
        GoalMetric::OverallHappiness => metrics.overall_happiness,
        GoalMetric::CongestionIndex => metrics.congestion_index,
        GoalMetric::TransitRidership => metrics.transit_ridership,
        GoalMetric::EconomicOutput => metrics.economic_output,
        GoalMetric::BudgetBalance => balance,
    };
    match goal.comparison {
        GoalComparison::AtLeast => value >= goal.target,
        GoalComparison::AtMost => value <= goal.target,
    }
}
