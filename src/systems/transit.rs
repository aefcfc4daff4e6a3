use tracing::warn;

use crate::events::{EventKind, GameEvent, Severity};
use crate::world::{damp, CityState};

const RIDERSHIP_ALPHA: f64 = 0.1;
/// Crush load: ridership may exceed nominal capacity by this factor.
const RIDERSHIP_CAP: f64 = 1.2;

pub struct TransitSystem;

impl TransitSystem {
    pub fn new() -> Self {
        Self
    }

    /// Advances construction countdowns and ridership, and returns the total
    /// operating cost of operational lines. The cost is handed to the caller
    /// for budget accounting rather than applied here, which keeps this
    /// system and the economy decoupled.
    pub fn run(&self, state: &mut CityState, events: &mut Vec<GameEvent>) -> f64 {
        // Average connected-district density per line, computed up front so
        // the line loop can hold a mutable borrow.
        let avg_densities: Vec<f64> = state
            .transit_lines
            .iter()
            .map(|line| {
                let mut total = 0.0;
                let mut count = 0usize;
                for &id in &line.districts {
                    match state.district(id) {
                        Some(district) => {
                            total += district.current_density();
                            count += 1;
                        }
                        None => {
                            warn!(district = %id, line = %line.name, "transit line references an unknown district");
                        }
                    }
                }
                if count > 0 {
                    total / count as f64
                } else {
                    0.0
                }
            })
            .collect();

        let mut operating_cost = 0.0;
        let mut opened: Vec<usize> = Vec::new();
        for (index, line) in state.transit_lines.iter_mut().enumerate() {
            if line.construction_turns_remaining > 0 {
                line.construction_turns_remaining -= 1;
                line.ridership = 0.0;
                if line.construction_turns_remaining == 0 {
                    opened.push(index);
                }
                continue;
            }
            let threshold = line.kind.density_threshold();
            let target =
                line.capacity * (avg_densities[index] / threshold).clamp(0.0, RIDERSHIP_CAP);
            line.ridership = damp(line.ridership, target, RIDERSHIP_ALPHA)
                .clamp(0.0, line.capacity * RIDERSHIP_CAP);
            operating_cost += line.operating_cost;
        }

        // One-shot opening: milestone event plus the property-value boost on
        // connected districts, exactly on the tick the countdown reached zero.
        for index in opened {
            let (name, districts, boost) = {
                let line = &state.transit_lines[index];
                (line.name.clone(), line.districts.clone(), line.property_value_boost)
            };
            events.push(GameEvent::new(
                EventKind::Milestone,
                Severity::Info,
                format!("transit line '{name}' is now operational"),
            ));
            for id in districts {
                match state.district_mut(id) {
                    Some(district) => {
                        district.metrics.property_value *= boost;
                        district.has_transit = true;
                    }
                    None => {
                        warn!(district = %id, line = %name, "opened line serves an unknown district");
                    }
                }
            }
        }

        operating_cost
    }
}

impl Default for TransitSystem {
    fn default() -> Self {
        Self::new()
    }
}
