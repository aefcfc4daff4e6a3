use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::{EventKind, GameEvent, Severity};
use crate::policy::{PolicyProposal, VoteRequirement};
use crate::rng::election_draw;
use crate::world::{
    CityState, District, DistrictId, Leaning, PolicyCategory, Representative,
};

/// Turns between council elections.
pub const ELECTION_INTERVAL: u64 = 20;

const APPROVAL_WEIGHT: f64 = 0.1;
const APPROVAL_DECAY: f64 = 0.005;

/// District-need urgency only sways a vote once it clears this level.
const URGENCY_THRESHOLD: f64 = 0.5;
const URGENCY_WEIGHT: f64 = 0.6;
const PRIORITY_BONUS: f64 = 0.15;
const TARGETED_BONUS: f64 = 0.1;
const BYPASSED_PENALTY: f64 = 0.05;
/// Proposal cost at which cost resistance saturates.
const COST_SCALE: f64 = 100_000.0;
const COST_RESISTANCE: f64 = 0.3;
const REVENUE_BONUS: f64 = 0.1;
const RISK_THRESHOLD: f64 = 0.6;
const POLITICAL_COST_THRESHOLD: f64 = 0.5;
const RISK_AVERSION: f64 = 0.4;
/// Veto-like penalty; outweighs any achievable positive score.
const VETO_PENALTY: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    pub district: DistrictId,
    pub leaning: Leaning,
    pub supported: bool,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResult {
    pub proposal: String,
    pub requirement: VoteRequirement,
    pub passed: bool,
    pub votes_for: u32,
    pub votes_against: u32,
    pub ballots: Vec<Ballot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatOutcome {
    pub district: DistrictId,
    pub incumbent: Leaning,
    pub winner: Leaning,
    pub unseated: bool,
    pub approval: f64,
    pub draw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionResult {
    pub turn: u64,
    pub seats: Vec<SeatOutcome>,
    pub unseated: u32,
}

pub struct PoliticsSystem;

impl PoliticsSystem {
    pub fn new() -> Self {
        Self
    }

    /// Real-valued vote score; strictly positive means yes. No randomness.
    pub fn determine_vote(
        &self,
        rep: &Representative,
        proposal: &PolicyProposal,
        district: &District,
    ) -> f64 {
        let mut score = alignment(rep.leaning, proposal.category);

        // Need-based support scales continuously with how far past the
        // severity threshold the district sits, not a binary flag.
        let urgency = category_urgency(district, proposal.category);
        if urgency > URGENCY_THRESHOLD {
            score +=
                URGENCY_WEIGHT * (urgency - URGENCY_THRESHOLD) / (1.0 - URGENCY_THRESHOLD);
        }

        if rep.priorities.contains(&proposal.category) {
            score += PRIORITY_BONUS;
        }

        if proposal.scope.is_targeted() {
            if proposal.scope.includes(rep.district) {
                score += TARGETED_BONUS;
            } else {
                score -= BYPASSED_PENALTY;
            }
        }

        if proposal.cost > 0.0 {
            let pressure = (proposal.cost / COST_SCALE).min(1.0);
            score -= pressure * COST_RESISTANCE * fiscal_resistance(rep.leaning);
        } else if proposal.cost < 0.0 {
            score += REVENUE_BONUS;
        }

        // Risk aversion kicks in only when both the seat is at risk and the
        // proposal is politically charged.
        if rep.reelection_risk > RISK_THRESHOLD
            && proposal.political_cost > POLITICAL_COST_THRESHOLD
        {
            score -= rep.reelection_risk * proposal.political_cost * RISK_AVERSION;
        }

        if rep.leaning == Leaning::Populist
            && proposal.category == PolicyCategory::CongestionPricing
        {
            score -= VETO_PENALTY;
        }

        score
    }

    /// Scores every seated representative and applies the pass rule for the
    /// proposal's vote requirement. Does not mutate state; the orchestrator
    /// records vote history.
    pub fn conduct_vote(&self, state: &CityState, proposal: &PolicyProposal) -> VoteResult {
        let mut ballots = Vec::with_capacity(state.representatives.len());
        for (district_id, rep) in &state.representatives {
            let district = match state.district(*district_id) {
                Some(d) => d,
                None => {
                    warn!(district = %district_id, "representative holds an unknown district; skipping ballot");
                    continue;
                }
            };
            let score = self.determine_vote(rep, proposal, district);
            ballots.push(Ballot {
                district: *district_id,
                leaning: rep.leaning,
                supported: score > 0.0,
                score,
            });
        }

        let votes_for = ballots.iter().filter(|b| b.supported).count() as u32;
        let total = ballots.len() as u32;
        let votes_against = total - votes_for;

        let yes_population: u64 = ballots
            .iter()
            .filter(|b| b.supported)
            .filter_map(|b| state.district(b.district))
            .map(|d| d.population)
            .sum();
        let voting_population: u64 = ballots
            .iter()
            .filter_map(|b| state.district(b.district))
            .map(|d| d.population)
            .sum();

        let passed = passes(
            proposal.requirement,
            votes_for,
            total,
            yes_population,
            voting_population,
        );

        VoteResult {
            proposal: proposal.name.clone(),
            requirement: proposal.requirement,
            passed,
            votes_for,
            votes_against,
            ballots,
        }
    }

    /// Drifts each representative's approval with district happiness and
    /// refreshes the re-election risk band.
    pub fn update_approval(&self, state: &mut CityState) {
        let happiness: Vec<(DistrictId, f64)> = state
            .districts
            .iter()
            .map(|(id, d)| (*id, d.metrics.happiness))
            .collect();
        for (district_id, happiness) in happiness {
            let rep = match state.representatives.get_mut(&district_id) {
                Some(rep) => rep,
                None => {
                    warn!(district = %district_id, "district has no representative");
                    continue;
                }
            };
            rep.approval = (rep.approval + (happiness - 0.5) * APPROVAL_WEIGHT
                - APPROVAL_DECAY)
                .clamp(0.0, 1.0);
            rep.reelection_risk = risk_band(rep.approval);
        }
    }

    /// Runs one election round. An incumbent loses the seat only when the
    /// deterministic draw lands below their risk *and* approval is below
    /// 0.5; a popular representative survives any draw.
    pub fn run_election(
        &self,
        state: &mut CityState,
        seed: u64,
        turn: u64,
        events: &mut Vec<GameEvent>,
    ) -> ElectionResult {
        let mut seats = Vec::with_capacity(state.representatives.len());
        let mut unseated = 0u32;
        for id in state.district_ids() {
            let (rent_burden, density_ratio, congestion, district_name) =
                match state.district(id) {
                    Some(d) => (
                        d.metrics.rent_burden,
                        d.density_ratio(),
                        d.metrics.congestion,
                        d.name.clone(),
                    ),
                    None => continue,
                };
            let priorities = state
                .district(id)
                .map(district_priorities)
                .unwrap_or_default();
            let rep = match state.representatives.get_mut(&id) {
                Some(rep) => rep,
                None => {
                    warn!(district = %id, "no representative to stand for election");
                    continue;
                }
            };
            let draw = election_draw(seed, turn, id);
            let loses = draw < rep.reelection_risk && rep.approval < 0.5;
            let incumbent = rep.leaning;
            if loses {
                let winner = successor_leaning(rent_burden, density_ratio, congestion);
                *rep = Representative {
                    district: id,
                    name: format!("{district_name} delegate (turn {turn})"),
                    leaning: winner,
                    approval: 0.5,
                    reelection_risk: risk_band(0.5),
                    priorities,
                    vote_history: Vec::new(),
                };
                unseated += 1;
                events.push(GameEvent::for_district(
                    EventKind::Election,
                    Severity::Warning,
                    format!(
                        "{district_name} unseated its {incumbent:?} incumbent for a {winner:?}"
                    ),
                    id,
                ));
                seats.push(SeatOutcome {
                    district: id,
                    incumbent,
                    winner,
                    unseated: true,
                    approval: 0.5,
                    draw,
                });
            } else {
                seats.push(SeatOutcome {
                    district: id,
                    incumbent,
                    winner: incumbent,
                    unseated: false,
                    approval: rep.approval,
                    draw,
                });
            }
        }
        info!(turn, unseated, "election round complete");
        events.push(GameEvent::new(
            EventKind::Election,
            Severity::Info,
            format!("elections held: {unseated} seat(s) changed hands"),
        ));
        ElectionResult {
            turn,
            seats,
            unseated,
        }
    }
}

impl Default for PoliticsSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Pass rule per vote-requirement kind, split out so the thresholds are
/// testable in isolation.
pub fn passes(
    requirement: VoteRequirement,
    votes_for: u32,
    total: u32,
    yes_population: u64,
    voting_population: u64,
) -> bool {
    match requirement {
        VoteRequirement::ExecutiveOrder => true,
        VoteRequirement::SimpleMajority => votes_for * 2 > total,
        VoteRequirement::SuperMajority => votes_for >= (2 * total + 2) / 3,
        VoteRequirement::Referendum => yes_population * 2 > voting_population,
    }
}

/// Fixed ideology-to-category affinity table.
fn alignment(leaning: Leaning, category: PolicyCategory) -> f64 {
    use Leaning::*;
    use PolicyCategory::*;
    match (leaning, category) {
        (Progressive, Housing) => 0.5,
        (Progressive, Transit) => 0.5,
        (Progressive, Roads) => -0.1,
        (Progressive, CongestionPricing) => 0.3,
        (Progressive, Taxation) => 0.2,
        (Progressive, Zoning) => 0.3,
        (Progressive, Environment) => 0.5,
        (Progressive, PublicSafety) => 0.0,

        (Moderate, Taxation) => -0.05,
        (Moderate, _) => 0.1,

        (Conservative, Housing) => -0.1,
        (Conservative, Transit) => -0.2,
        (Conservative, Roads) => 0.4,
        (Conservative, CongestionPricing) => -0.3,
        (Conservative, Taxation) => -0.2,
        (Conservative, Zoning) => -0.2,
        (Conservative, Environment) => -0.1,
        (Conservative, PublicSafety) => 0.4,

        (Populist, Housing) => 0.3,
        (Populist, Transit) => 0.2,
        (Populist, Roads) => 0.2,
        (Populist, CongestionPricing) => -0.4,
        (Populist, Taxation) => -0.3,
        (Populist, Zoning) => 0.0,
        (Populist, Environment) => 0.1,
        (Populist, PublicSafety) => 0.3,

        (Yimby, Housing) => 0.6,
        (Yimby, Transit) => 0.5,
        (Yimby, Roads) => -0.2,
        (Yimby, CongestionPricing) => 0.2,
        (Yimby, Taxation) => 0.0,
        (Yimby, Zoning) => 0.6,
        (Yimby, Environment) => 0.2,
        (Yimby, PublicSafety) => 0.0,

        (Nimby, Housing) => -0.4,
        (Nimby, Transit) => -0.1,
        (Nimby, Roads) => 0.2,
        (Nimby, CongestionPricing) => -0.2,
        (Nimby, Taxation) => -0.1,
        (Nimby, Zoning) => -0.6,
        (Nimby, Environment) => 0.3,
        (Nimby, PublicSafety) => 0.2,
    }
}

/// Cost-resistance multiplier; fiscally conservative leanings resist
/// spending harder.
fn fiscal_resistance(leaning: Leaning) -> f64 {
    match leaning {
        Leaning::Conservative => 1.6,
        Leaning::Populist => 1.2,
        Leaning::Nimby => 1.1,
        Leaning::Moderate => 1.0,
        Leaning::Yimby => 0.8,
        Leaning::Progressive => 0.7,
    }
}

/// How acute the district's need in a category is, in [0, 1].
pub fn category_urgency(district: &District, category: PolicyCategory) -> f64 {
    let m = &district.metrics;
    match category {
        PolicyCategory::Housing => m.rent_burden,
        PolicyCategory::Transit => (m.commute_minutes / 60.0).clamp(0.0, 1.0),
        PolicyCategory::Roads => m.congestion,
        PolicyCategory::CongestionPricing => m.congestion,
        PolicyCategory::Taxation => 1.0 - m.services,
        PolicyCategory::Zoning => district.density_ratio(),
        PolicyCategory::Environment => 1.0 - m.green_space,
        PolicyCategory::PublicSafety => m.crime_rate,
    }
}

/// Top-3 policy categories by district urgency, ties broken by enum order.
pub fn district_priorities(district: &District) -> Vec<PolicyCategory> {
    let mut ranked: Vec<(PolicyCategory, f64)> = PolicyCategory::ALL
        .iter()
        .map(|&category| (category, category_urgency(district, category)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(3).map(|(category, _)| category).collect()
}

fn risk_band(approval: f64) -> f64 {
    if approval >= 0.6 {
        0.15
    } else if approval >= 0.45 {
        0.45
    } else {
        0.8
    }
}

/// Who a disaffected district elects, from its current pressures.
fn successor_leaning(rent_burden: f64, density_ratio: f64, congestion: f64) -> Leaning {
    if rent_burden > 0.5 {
        if congestion > 0.6 {
            Leaning::Progressive
        } else {
            Leaning::Yimby
        }
    } else if density_ratio < 0.4 {
        Leaning::Nimby
    } else if congestion > 0.7 {
        Leaning::Populist
    } else {
        Leaning::Moderate
    }
}
