use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::{EventKind, GameEvent, Severity};
use crate::world::{damp, CityState, DistrictId};

const HAPPINESS_ALPHA: f64 = 0.12;

// Happiness component weights; they sum to 1.
const WEIGHT_COMMUTE: f64 = 0.20;
const WEIGHT_RENT: f64 = 0.20;
const WEIGHT_JOBS: f64 = 0.20;
const WEIGHT_TRAFFIC: f64 = 0.15;
const WEIGHT_SERVICES: f64 = 0.15;
const WEIGHT_GREEN: f64 = 0.10;

/// Commute above which the commute score bottoms out.
const COMMUTE_TOLERANCE_MINUTES: f64 = 60.0;

/// Reachable-jobs normalisation: full score at 30% of all city jobs.
const JOB_ACCESS_NORM: f64 = 0.3;
const ADJACENT_JOB_SHARE: f64 = 0.4;
const ADJACENT_JOB_SHARE_TRANSIT: f64 = 0.65;

const MIGRATION_MARGIN: f64 = 0.05;
const MIGRATION_RATE: f64 = 0.02;
const GROWTH_RATE: f64 = 0.002;
/// Moves below this size do not produce an event.
const MIGRATION_EVENT_MIN: u64 = 25;

const TAX_PER_CAPITA: f64 = 18.0;
const BASELINE_TAX_RATE: f64 = 0.08;
const SERVICE_COST_PER_CAPITA: f64 = 14.0;
const FARE_PER_RIDER: f64 = 2.0;

/// Balance below which the deficit is a full crisis.
const CRISIS_BALANCE: f64 = -250_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationMove {
    pub from: DistrictId,
    pub to: DistrictId,
    pub moved: u64,
}

pub struct EconomySystem;

impl EconomySystem {
    pub fn new() -> Self {
        Self
    }

    /// Runs the per-tick economy phase: job access, happiness, migration,
    /// natural growth and the budget. `transit_cost` is the operating cost
    /// handed over by the transit system this tick.
    pub fn run(
        &self,
        state: &mut CityState,
        transit_cost: f64,
        events: &mut Vec<GameEvent>,
    ) -> Vec<PopulationMove> {
        self.update_job_access(state);
        self.update_happiness(state);
        let moves = self.run_migration(state, events);
        self.natural_growth(state);
        self.update_budget(state, transit_cost, events);
        moves
    }

    fn update_job_access(&self, state: &mut CityState) {
        let jobs: BTreeMap<DistrictId, f64> = state
            .districts
            .iter()
            .map(|(id, d)| (*id, d.job_capacity()))
            .collect();
        let total_jobs: f64 = jobs.values().sum();
        if total_jobs <= 0.0 {
            for district in state.districts.values_mut() {
                district.metrics.job_access = 0.0;
            }
            return;
        }

        let mut scores: Vec<(DistrictId, f64)> = Vec::with_capacity(jobs.len());
        for (id, district) in &state.districts {
            let mut reachable = jobs.get(id).copied().unwrap_or(0.0);
            for &other in &district.adjacent {
                let neighbour_jobs = match jobs.get(&other) {
                    Some(j) => *j,
                    None => {
                        warn!(district = %other, "job access references an unknown district");
                        continue;
                    }
                };
                let linked_by_transit = district.has_transit
                    && state
                        .district(other)
                        .map(|d| d.has_transit)
                        .unwrap_or(false);
                let share = if linked_by_transit {
                    ADJACENT_JOB_SHARE_TRANSIT
                } else {
                    ADJACENT_JOB_SHARE
                };
                reachable += neighbour_jobs * share;
            }
            let score = (reachable / (total_jobs * JOB_ACCESS_NORM)).min(1.0);
            scores.push((*id, score));
        }
        for (id, score) in scores {
            if let Some(district) = state.district_mut(id) {
                district.metrics.job_access = score;
            }
        }
    }

    fn update_happiness(&self, state: &mut CityState) {
        for district in state.districts.values_mut() {
            let m = &district.metrics;
            let commute_score =
                (1.0 - m.commute_minutes / COMMUTE_TOLERANCE_MINUTES).clamp(0.0, 1.0);
            let rent_score = (1.0 - m.rent_burden).clamp(0.0, 1.0);
            let traffic_score = (1.0 - m.congestion).clamp(0.0, 1.0);
            let target = WEIGHT_COMMUTE * commute_score
                + WEIGHT_RENT * rent_score
                + WEIGHT_JOBS * m.job_access
                + WEIGHT_TRAFFIC * traffic_score
                + WEIGHT_SERVICES * m.services
                + WEIGHT_GREEN * m.green_space;
            let happiness = damp(m.happiness, target, HAPPINESS_ALPHA);
            district.metrics.happiness = happiness.clamp(0.0, 1.0);
        }
    }

    /// Attractiveness blend used to direct migration.
    pub fn attractiveness(state: &CityState, id: DistrictId) -> f64 {
        match state.district(id) {
            Some(d) => {
                0.4 * d.metrics.happiness
                    + 0.3 * (1.0 - d.metrics.rent_burden)
                    + 0.3 * d.metrics.job_access
            }
            None => 0.0,
        }
    }

    /// Scores every district first, then applies all moves at once so no
    /// score observes a partial move.
    fn run_migration(
        &self,
        state: &mut CityState,
        events: &mut Vec<GameEvent>,
    ) -> Vec<PopulationMove> {
        let ids = state.district_ids();
        let scores: BTreeMap<DistrictId, f64> = ids
            .iter()
            .map(|&id| (id, Self::attractiveness(state, id)))
            .collect();
        let mut headroom: BTreeMap<DistrictId, f64> = ids
            .iter()
            .filter_map(|&id| state.district(id).map(|d| (id, d.remaining_capacity())))
            .collect();
        let mut outflow: BTreeMap<DistrictId, u64> = BTreeMap::new();

        let mut moves: Vec<PopulationMove> = Vec::new();
        for &from in &ids {
            let (population, adjacent) = match state.district(from) {
                Some(d) => (d.population, d.adjacent.clone()),
                None => continue,
            };
            let from_score = scores[&from];
            for to in adjacent {
                let to_score = match scores.get(&to) {
                    Some(score) => *score,
                    None => {
                        warn!(district = %to, "migration references an unknown district");
                        continue;
                    }
                };
                let gap = to_score - from_score;
                if gap <= MIGRATION_MARGIN {
                    continue;
                }
                let committed = outflow.get(&from).copied().unwrap_or(0);
                let available = population.saturating_sub(committed);
                let desired = (population as f64 * MIGRATION_RATE * gap).floor() as u64;
                let room = headroom.get(&to).copied().unwrap_or(0.0).max(0.0) as u64;
                let moved = desired.min(available).min(room);
                if moved == 0 {
                    continue;
                }
                *outflow.entry(from).or_insert(0) += moved;
                if let Some(h) = headroom.get_mut(&to) {
                    *h -= moved as f64;
                }
                moves.push(PopulationMove { from, to, moved });
            }
        }

        for mv in &moves {
            if let Some(district) = state.district_mut(mv.from) {
                district.population = district.population.saturating_sub(mv.moved);
            }
            if let Some(district) = state.district_mut(mv.to) {
                district.population += mv.moved;
            }
            if mv.moved >= MIGRATION_EVENT_MIN {
                events.push(GameEvent::for_district(
                    EventKind::Migration,
                    Severity::Info,
                    format!(
                        "{} residents moved from district {} to district {}",
                        mv.moved, mv.from, mv.to
                    ),
                    mv.to,
                ));
            }
        }
        moves
    }

    fn natural_growth(&self, state: &mut CityState) {
        for district in state.districts.values_mut() {
            let growth = (district.remaining_capacity() * GROWTH_RATE).floor() as u64;
            district.population += growth;
        }
    }

    fn update_budget(&self, state: &mut CityState, transit_cost: f64, events: &mut Vec<GameEvent>) {
        let population = state.total_population() as f64;
        let farebox: f64 = state
            .transit_lines
            .iter()
            .filter(|line| line.is_operational())
            .map(|line| line.ridership * FARE_PER_RIDER)
            .sum();
        let budget = &mut state.budget;
        let income =
            population * TAX_PER_CAPITA * (budget.tax_rate / BASELINE_TAX_RATE).max(0.0);
        let net_transit = ((transit_cost - farebox) * budget.transit_subsidy).max(0.0);
        let expenses = population * SERVICE_COST_PER_CAPITA + net_transit;

        budget.income = income;
        budget.expenses = expenses;
        budget.balance += income - expenses;

        if budget.balance < CRISIS_BALANCE {
            events.push(GameEvent::new(
                EventKind::Budget,
                Severity::Critical,
                format!("budget crisis: balance at {:.0}", budget.balance),
            ));
        } else if expenses > income && budget.balance < 0.0 {
            events.push(GameEvent::new(
                EventKind::Budget,
                Severity::Warning,
                format!(
                    "running deficit: spending {:.0} against income {:.0}",
                    expenses, income
                ),
            ));
        }
    }
}

impl Default for EconomySystem {
    fn default() -> Self {
        Self::new()
    }
}
