pub mod config;
pub mod engine;
pub mod events;
pub mod policy;
pub mod rng;
pub mod systems;
pub mod world;

pub use config::{CityConfig, ConfigError, GoalComparison, GoalMetric, ScenarioGoal};
pub use engine::{Engine, GameMode, GameOutcome, SandboxControls, TurnResult};
pub use events::{EventKind, GameEvent, Severity};
pub use policy::{
    EffectScope, PolicyEffect, PolicyProposal, ProposalScope, VoteRequirement,
};
pub use systems::{ElectionResult, PopulationMove, VoteResult};
pub use world::{CityMetrics, CityState, DistrictId, Leaning, Metric, PolicyCategory};
