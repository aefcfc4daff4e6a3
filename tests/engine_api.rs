use std::collections::BTreeMap;

use civica::config::{CityConfig, GoalComparison, GoalMetric, ScenarioGoal};
use civica::policy::{PolicyProposal, ProposalScope, VoteRequirement};
use civica::world::ZoneKind;
use civica::{DistrictId, Engine, EventKind, GameMode, SandboxControls};

fn sandboxless_demo() -> CityConfig {
    let mut config = CityConfig::demo_city();
    config.goals.clear();
    config
}

fn executive_spend(name: &str, cost: f64) -> PolicyProposal {
    PolicyProposal {
        name: name.into(),
        category: civica::world::PolicyCategory::Taxation,
        requirement: VoteRequirement::ExecutiveOrder,
        cost,
        political_cost: 0.0,
        scope: ProposalScope::AllDistricts,
        effects: Vec::new(),
    }
}

#[test]
fn zoning_changes_merge_when_the_mix_still_sums_to_100() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let mut changes = BTreeMap::new();
    changes.insert(ZoneKind::Residential, 40.0);
    changes.insert(ZoneKind::GreenSpace, 15.0);
    engine
        .apply_zoning_change(DistrictId(1), &changes)
        .unwrap();
    let district = engine.state().district(DistrictId(1)).unwrap();
    assert_eq!(district.zone_share(ZoneKind::Residential), 0.40);
    assert_eq!(district.zone_share(ZoneKind::GreenSpace), 0.15);
}

#[test]
fn zoning_changes_breaking_the_sum_are_rejected() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let before = engine
        .state()
        .district(DistrictId(1))
        .unwrap()
        .zone_allocation
        .clone();
    let mut changes = BTreeMap::new();
    changes.insert(ZoneKind::Residential, 80.0);
    let err = engine
        .apply_zoning_change(DistrictId(1), &changes)
        .unwrap_err();
    assert!(err.to_string().contains("100%"));
    // A rejected change leaves the allocation untouched.
    let after = &engine.state().district(DistrictId(1)).unwrap().zone_allocation;
    assert_eq!(&before, after);
}

#[test]
fn zoning_changes_to_unknown_districts_are_rejected() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let changes = BTreeMap::new();
    assert!(engine.apply_zoning_change(DistrictId(77), &changes).is_err());
}

#[test]
fn transit_lines_open_once_after_construction() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let property_before = engine
        .state()
        .district(DistrictId(3))
        .unwrap()
        .metrics
        .property_value;

    let mut milestones = 0;
    for turn in 1..=15 {
        let result = engine.tick();
        let metro = engine
            .state()
            .transit_lines
            .iter()
            .find(|l| l.name == "Millbrook Metro")
            .unwrap();
        if turn < 8 {
            assert!(!metro.is_operational(), "still under construction");
            assert_eq!(metro.ridership, 0.0);
        }
        milestones += result
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Milestone)
            .count();
    }

    let metro = engine
        .state()
        .transit_lines
        .iter()
        .find(|l| l.name == "Millbrook Metro")
        .unwrap();
    assert!(metro.is_operational());
    assert!(metro.ridership > 0.0, "an open metro line attracts riders");
    assert_eq!(milestones, 1, "the opening announcement fires exactly once");

    // The one-shot property boost landed on the connected district.
    let property_after = engine
        .state()
        .district(DistrictId(3))
        .unwrap()
        .metrics
        .property_value;
    assert!(property_after >= property_before * 1.12 - 1e-9);
    assert!(engine.state().district(DistrictId(3)).unwrap().has_transit);
}

#[test]
fn bankruptcy_ends_the_run() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let vote = engine
        .propose_policy(&executive_spend("grand stadium", 10_000_000.0))
        .unwrap();
    assert!(vote.passed);
    let result = engine.tick();
    let over = result.game_over.expect("spending far past the threshold is terminal");
    assert!(!over.won);
    assert!(engine.is_game_over());
    assert!(result
        .events
        .iter()
        .any(|e| e.kind == EventKind::Crisis));
}

#[test]
fn ticks_after_termination_are_frozen_sentinels() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    engine.propose_policy(&executive_spend("grand stadium", 10_000_000.0));
    engine.tick();
    assert!(engine.is_game_over());
    let ended_turn = engine.turn();

    let sentinel = engine.tick();
    assert_eq!(engine.turn(), ended_turn, "the turn counter stays frozen");
    assert_eq!(sentinel.turn, ended_turn);
    assert_eq!(sentinel.before, sentinel.after, "no metrics move after the end");
    assert_eq!(sentinel.events.len(), 1);
    assert_eq!(sentinel.events[0].kind, EventKind::Crisis);
    assert!(sentinel.districts.is_empty());
    assert!(sentinel.moves.is_empty());

    // No further proposals are accepted.
    assert!(engine
        .propose_policy(&executive_spend("too late", 1.0))
        .is_none());
}

#[test]
fn meeting_every_goal_wins() {
    let mut config = sandboxless_demo();
    config.goals.push(ScenarioGoal {
        metric: GoalMetric::Population,
        comparison: GoalComparison::AtLeast,
        target: 1.0,
    });
    let mut engine = Engine::new(config, GameMode::Political).unwrap();
    let result = engine.tick();
    let over = result.game_over.expect("a trivially met goal ends turn one");
    assert!(over.won);
    assert!(engine.outcome().unwrap().won);
}

#[test]
fn sandbox_controls_are_ignored_in_political_mode() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    let tax_before = engine.state().budget.tax_rate;
    engine.apply_sandbox_controls(&SandboxControls {
        tax_rate: Some(0.5),
        ..Default::default()
    });
    assert_eq!(engine.state().budget.tax_rate, tax_before);
}

#[test]
fn sandbox_controls_apply_in_sandbox_mode() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Sandbox).unwrap();
    let density_before = engine
        .state()
        .district(DistrictId(1))
        .unwrap()
        .max_density;
    engine.apply_sandbox_controls(&SandboxControls {
        tax_rate: Some(0.12),
        density_cap_scale: Some(2.0),
        road_capacity_scale: Some(0.5),
        parking_minimums: Some(false),
        transit_subsidy: Some(0.9),
    });
    let state = engine.state();
    assert_eq!(state.budget.tax_rate, 0.12);
    assert_eq!(state.budget.transit_subsidy, 0.9);
    assert_eq!(
        state.district(DistrictId(1)).unwrap().max_density,
        density_before * 2.0
    );
    assert!(state.districts.values().all(|d| !d.parking_minimums));
}

#[test]
fn sandbox_proposals_skip_the_vote() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Sandbox).unwrap();
    let balance_before = engine.state().budget.balance;
    let vote = engine
        .propose_policy(&executive_spend("road repaving", 20_000.0))
        .unwrap();
    assert!(vote.passed);
    assert!(vote.ballots.is_empty(), "sandbox mode holds no council vote");
    assert_eq!(engine.state().budget.balance, balance_before - 20_000.0);
}

#[test]
fn votes_are_reported_on_the_following_tick() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    engine.propose_policy(&executive_spend("community grants", 5_000.0));
    engine.propose_policy(&executive_spend("library hours", 2_000.0));

    let result = engine.tick();
    assert_eq!(result.votes.len(), 2);
    assert_eq!(result.votes[0].proposal, "community grants");
    assert_eq!(result.votes[1].proposal, "library hours");

    // Drained: the next tick starts with a clean slate.
    let next = engine.tick();
    assert!(next.votes.is_empty());
}

#[test]
fn political_votes_are_recorded_in_representative_history() {
    let mut engine = Engine::new(sandboxless_demo(), GameMode::Political).unwrap();
    engine.propose_policy(&executive_spend("community grants", 5_000.0));
    for rep in engine.state().representatives.values() {
        assert_eq!(rep.vote_history.len(), 1);
        assert_eq!(rep.vote_history[0].proposal, "community grants");
    }
}
