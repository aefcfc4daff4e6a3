use tracing::warn;

use crate::world::{damp, CityState, DistrictId, ZoneKind};

/// Segment loads converge fast enough to track population shifts but slow
/// enough that commute and congestion never snap between ticks.
const LOAD_ALPHA: f64 = 0.2;
const COMMUTE_ALPHA: f64 = 0.15;
/// Fraction of the two endpoint populations that wants to cross the segment
/// each turn.
const TRIP_RATE: f64 = 0.12;
/// Induced demand: wider roads attract more trips in proportion to capacity.
const INDUCED_DEMAND: f64 = 0.10;
/// Parking minimums at both endpoints amplify induced car trips.
const PARKING_INDUCED: f64 = 1.1;
/// Share of an operational line's ridership that comes off this segment.
const TRANSIT_ABSORPTION: f64 = 0.5;
/// Peak trip reduction when both endpoints are fully mixed-use.
const MIXED_USE_CONTAINMENT: f64 = 0.35;

const BASE_COMMUTE_MINUTES: f64 = 18.0;
const CONGESTION_PENALTY_MINUTES: f64 = 30.0;
const TRANSIT_BENEFIT_CAP_MINUTES: f64 = 9.0;
/// Commute inside a self-contained mixed-use district.
const SELF_CONTAINED_MINUTES: f64 = 11.0;
/// Density at which the proximity discount bottoms out.
const PROXIMITY_DENSITY: f64 = 10_000.0;
const PROXIMITY_DISCOUNT: f64 = 0.25;

pub struct TrafficSystem;

impl TrafficSystem {
    pub fn new() -> Self {
        Self
    }

    /// One-time initialiser: derives each segment's starting load from the
    /// endpoint districts' configured congestion so the first tick does not
    /// jump discontinuously from zero.
    pub fn seed_loads(&self, state: &mut CityState) {
        for key in state.roads.keys() {
            let (a, b) = key.endpoints();
            let congestion_a = match state.district(a) {
                Some(d) => d.metrics.congestion,
                None => continue,
            };
            let congestion_b = match state.district(b) {
                Some(d) => d.metrics.congestion,
                None => continue,
            };
            if let Some(segment) = state.roads.get_mut(key) {
                segment.load = segment.capacity * 0.5 * (congestion_a + congestion_b);
            }
        }
    }

    pub fn run(&self, state: &mut CityState) {
        self.converge_segment_loads(state);
        self.update_district_commutes(state);
    }

    fn converge_segment_loads(&self, state: &mut CityState) {
        for key in state.roads.keys() {
            let (a, b) = key.endpoints();
            let (pop_a, mixed_a, parking_a) = match state.district(a) {
                Some(d) => (
                    d.population as f64,
                    d.zone_share(ZoneKind::MixedUse),
                    d.parking_minimums,
                ),
                None => {
                    warn!(district = %a, "road segment references an unknown district");
                    continue;
                }
            };
            let (pop_b, mixed_b, parking_b) = match state.district(b) {
                Some(d) => (
                    d.population as f64,
                    d.zone_share(ZoneKind::MixedUse),
                    d.parking_minimums,
                ),
                None => {
                    warn!(district = %b, "road segment references an unknown district");
                    continue;
                }
            };
            let absorbed: f64 = state
                .transit_lines
                .iter()
                .filter(|line| line.is_operational() && line.serves_both(a, b))
                .map(|line| line.ridership * TRANSIT_ABSORPTION)
                .sum();
            if let Some(segment) = state.roads.get_mut(key) {
                let demand = (pop_a + pop_b) * TRIP_RATE;
                let parking_factor = if parking_a && parking_b {
                    PARKING_INDUCED
                } else {
                    1.0
                };
                let induced = segment.capacity * INDUCED_DEMAND * parking_factor;
                let containment =
                    demand * MIXED_USE_CONTAINMENT * 0.5 * (mixed_a + mixed_b);
                let target = (demand + induced - absorbed - containment).max(0.0);
                segment.load = damp(segment.load, target, LOAD_ALPHA).max(0.0);
            }
        }
    }

    fn update_district_commutes(&self, state: &mut CityState) {
        let ids = state.district_ids();
        let mut updates: Vec<(DistrictId, f64, f64)> = Vec::with_capacity(ids.len());
        for id in ids {
            let district = match state.district(id) {
                Some(d) => d,
                None => continue,
            };
            let own_density = district.current_density();
            let mixed_share = district.zone_share(ZoneKind::MixedUse);

            let mut external_total = 0.0;
            let mut congestion_total = 0.0;
            let mut neighbours = 0usize;
            for &other in &district.adjacent {
                let other_density = match state.district(other) {
                    Some(d) => d.current_density(),
                    None => {
                        warn!(district = %other, "adjacency references an unknown district");
                        continue;
                    }
                };
                let congestion = state.roads.congestion_between(id, other);
                let transit_benefit: f64 = state
                    .transit_lines
                    .iter()
                    .filter(|line| line.is_operational() && line.serves_both(id, other))
                    .map(|line| {
                        let utilisation = if line.capacity > 0.0 {
                            (line.ridership / line.capacity).min(1.0)
                        } else {
                            0.0
                        };
                        utilisation * TRANSIT_BENEFIT_CAP_MINUTES
                    })
                    .sum::<f64>()
                    .min(TRANSIT_BENEFIT_CAP_MINUTES);
                let avg_density = 0.5 * (own_density + other_density);
                let proximity =
                    1.0 - PROXIMITY_DISCOUNT * (avg_density / PROXIMITY_DENSITY).min(1.0);
                let leg = (BASE_COMMUTE_MINUTES + congestion * CONGESTION_PENALTY_MINUTES
                    - transit_benefit)
                    .max(4.0)
                    * proximity;
                external_total += leg;
                congestion_total += congestion;
                neighbours += 1;
            }

            let external = if neighbours > 0 {
                external_total / neighbours as f64
            } else {
                BASE_COMMUTE_MINUTES
            };
            let congestion_target = if neighbours > 0 {
                congestion_total / neighbours as f64
            } else {
                district.metrics.congestion
            };
            // Mixed-use keeps a share of trips inside the district.
            let self_weight = (mixed_share * 0.6).min(0.6);
            let commute_target =
                self_weight * SELF_CONTAINED_MINUTES + (1.0 - self_weight) * external;
            updates.push((id, commute_target, congestion_target));
        }

        for (id, commute_target, congestion_target) in updates {
            if let Some(district) = state.district_mut(id) {
                let commute = damp(
                    district.metrics.commute_minutes,
                    commute_target,
                    COMMUTE_ALPHA,
                );
                district.metrics.commute_minutes = commute.max(0.0);
                let congestion = damp(
                    district.metrics.congestion,
                    congestion_target,
                    COMMUTE_ALPHA,
                );
                district.metrics.congestion = congestion.clamp(0.0, 1.0);
            }
        }
    }
}

impl Default for TrafficSystem {
    fn default() -> Self {
        Self::new()
    }
}
