use std::collections::BTreeMap;

use thiserror::Error;

use crate::world::{
    damp, zone_sum, CityState, District, DistrictId, ZoneKind, ZONE_SUM_TOLERANCE,
};

/// Damping factor for rent; deliberately slow so rent, migration and density
/// cannot resonate.
const RENT_ALPHA: f64 = 0.08;
/// Monthly rent at a neutral zone mix with balanced supply and demand.
const BASE_RENT: f64 = 1_200.0;
/// Bounds on the supply/demand pressure ratio to rule out runaway spirals.
const PRESSURE_MIN: f64 = 0.5;
const PRESSURE_MAX: f64 = 2.0;
/// Latent demand on top of the current population.
const DEMAND_FACTOR: f64 = 1.1;
const TRANSIT_RENT_DISCOUNT: f64 = 0.96;
/// Maximum rent reduction from building at full density.
const DENSITY_DISCOUNT: f64 = 0.12;

#[derive(Debug, Error)]
pub enum ZoningError {
    #[error("zone allocation for {district} sums to {total:.1}%, must sum to 100% (within 0.1)")]
    BadTotal { district: String, total: f64 },
    #[error("unknown district id {0}")]
    UnknownDistrict(DistrictId),
}

pub struct ZoningSystem;

impl ZoningSystem {
    pub fn new() -> Self {
        Self
    }

    /// Updates rent and rent burden for every district from its zone mix,
    /// capacity pressure and transit access.
    pub fn run(&self, state: &mut CityState) {
        let median_income = state.median_income;
        for district in state.districts.values_mut() {
            let capacity = district.housing_capacity().max(1.0);
            let demand = district.population as f64 * DEMAND_FACTOR;
            let pressure = (demand / capacity).clamp(PRESSURE_MIN, PRESSURE_MAX);

            let mix_multiplier: f64 = ZoneKind::ALL
                .iter()
                .map(|kind| district.zone_share(*kind) * kind.rent_multiplier())
                .sum();
            let transit_factor = if district.has_transit {
                TRANSIT_RENT_DISCOUNT
            } else {
                1.0
            };
            let density_factor = 1.0 - DENSITY_DISCOUNT * district.density_ratio();

            let target_rent =
                BASE_RENT * mix_multiplier.max(0.1) * pressure * transit_factor * density_factor;
            let rent = damp(district.metrics.rent, target_rent, RENT_ALPHA).max(0.0);
            district.metrics.rent = rent;

            let burden = if median_income > 0.0 {
                (rent * 12.0 / median_income).min(1.0)
            } else {
                1.0
            };
            district.metrics.rent_burden = burden.max(0.0);
        }
    }

    /// Merges a partial allocation into the district's zone mix. The merged
    /// mix must still sum to 100% within tolerance; on failure the district
    /// is left untouched and the error is returned as a value.
    pub fn apply_zoning_change(
        &self,
        district: &mut District,
        changes: &BTreeMap<ZoneKind, f64>,
    ) -> Result<(), ZoningError> {
        let mut merged = district.zone_allocation.clone();
        for (kind, pct) in changes {
            merged.insert(*kind, *pct);
        }
        let total = zone_sum(&merged);
        if (total - 100.0).abs() > ZONE_SUM_TOLERANCE {
            return Err(ZoningError::BadTotal {
                district: district.name.clone(),
                total,
            });
        }
        district.zone_allocation = merged;
        Ok(())
    }
}

impl Default for ZoningSystem {
    fn default() -> Self {
        Self::new()
    }
}
