mod economy;
mod politics;
mod traffic;
mod transit;
mod zoning;

pub use economy::{EconomySystem, PopulationMove};
pub use politics::{
    district_priorities, passes, Ballot, ElectionResult, PoliticsSystem, SeatOutcome,
    VoteResult, ELECTION_INTERVAL,
};
pub use traffic::TrafficSystem;
pub use transit::TransitSystem;
pub use zoning::{ZoningError, ZoningSystem};
