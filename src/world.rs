use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance for zone allocation totals, in percentage points.
pub const ZONE_SUM_TOLERANCE: f64 = 0.1;

/// Exponential damping step shared by every feedback loop in the kernel.
///
/// Quantities that feed back into themselves across ticks (rent, road load,
/// ridership, commute, happiness) move toward their target by a fixed
/// fraction per tick instead of snapping, which keeps the coupled loops from
/// oscillating.
pub fn damp(current: f64, target: f64, alpha: f64) -> f64 {
    current * (1.0 - alpha) + target * alpha
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DistrictId(pub u32);

impl DistrictId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Residential,
    Commercial,
    Industrial,
    MixedUse,
    GreenSpace,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 5] = [
        ZoneKind::Residential,
        ZoneKind::Commercial,
        ZoneKind::Industrial,
        ZoneKind::MixedUse,
        ZoneKind::GreenSpace,
    ];

    /// Residents per square kilometre at full allocation.
    pub fn density_yield(self) -> f64 {
        match self {
            ZoneKind::Residential => 12_000.0,
            ZoneKind::MixedUse => 9_000.0,
            ZoneKind::Commercial => 1_500.0,
            ZoneKind::Industrial => 400.0,
            ZoneKind::GreenSpace => 0.0,
        }
    }

    /// Jobs per square kilometre at full allocation.
    pub fn job_yield(self) -> f64 {
        match self {
            ZoneKind::Residential => 400.0,
            ZoneKind::MixedUse => 4_500.0,
            ZoneKind::Commercial => 9_000.0,
            ZoneKind::Industrial => 5_500.0,
            ZoneKind::GreenSpace => 50.0,
        }
    }

    /// Relative rent pull of the zone kind in the zone-mix blend.
    pub fn rent_multiplier(self) -> f64 {
        match self {
            ZoneKind::Residential => 1.0,
            ZoneKind::MixedUse => 1.15,
            ZoneKind::Commercial => 1.25,
            ZoneKind::Industrial => 0.8,
            ZoneKind::GreenSpace => 1.1,
        }
    }
}

/// Closed set of per-district metric identifiers.
///
/// Policy effects address metrics through this enum, so an unknown metric
/// name can only arise while deserializing a config, where it is a hard
/// parse error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CommuteMinutes,
    Rent,
    RentBurden,
    JobAccess,
    Congestion,
    Services,
    Happiness,
    PropertyValue,
    CrimeRate,
    GreenSpace,
}

impl Metric {
    /// Ratio metrics are clamped to [0, 1] after every write.
    pub fn is_ratio(self) -> bool {
        !matches!(
            self,
            Metric::CommuteMinutes | Metric::Rent | Metric::PropertyValue
        )
    }

    pub const RATIOS: [Metric; 7] = [
        Metric::RentBurden,
        Metric::JobAccess,
        Metric::Congestion,
        Metric::Services,
        Metric::Happiness,
        Metric::CrimeRate,
        Metric::GreenSpace,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictMetrics {
    pub commute_minutes: f64,
    pub rent: f64,
    pub rent_burden: f64,
    pub job_access: f64,
    pub congestion: f64,
    pub services: f64,
    pub happiness: f64,
    pub property_value: f64,
    pub crime_rate: f64,
    pub green_space: f64,
}

impl Default for DistrictMetrics {
    fn default() -> Self {
        Self {
            commute_minutes: 30.0,
            rent: 1_400.0,
            rent_burden: 0.3,
            job_access: 0.5,
            congestion: 0.3,
            services: 0.6,
            happiness: 0.6,
            property_value: 1.0,
            crime_rate: 0.2,
            green_space: 0.4,
        }
    }
}

impl DistrictMetrics {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::CommuteMinutes => self.commute_minutes,
            Metric::Rent => self.rent,
            Metric::RentBurden => self.rent_burden,
            Metric::JobAccess => self.job_access,
            Metric::Congestion => self.congestion,
            Metric::Services => self.services,
            Metric::Happiness => self.happiness,
            Metric::PropertyValue => self.property_value,
            Metric::CrimeRate => self.crime_rate,
            Metric::GreenSpace => self.green_space,
        }
    }

    /// Writes a metric, clamping ratio metrics to [0, 1] and flooring the
    /// open-range metrics at zero.
    pub fn set(&mut self, metric: Metric, value: f64) {
        let value = if metric.is_ratio() {
            value.clamp(0.0, 1.0)
        } else {
            value.max(0.0)
        };
        match metric {
            Metric::CommuteMinutes => self.commute_minutes = value,
            Metric::Rent => self.rent = value,
            Metric::RentBurden => self.rent_burden = value,
            Metric::JobAccess => self.job_access = value,
            Metric::Congestion => self.congestion = value,
            Metric::Services => self.services = value,
            Metric::Happiness => self.happiness = value,
            Metric::PropertyValue => self.property_value = value,
            Metric::CrimeRate => self.crime_rate = value,
            Metric::GreenSpace => self.green_space = value,
        }
    }

    pub fn apply(&mut self, metric: Metric, delta: f64) {
        self.set(metric, self.get(metric) + delta);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub population: u64,
    pub area_km2: f64,
    /// Percentages per zone kind; must sum to 100 within tolerance.
    pub zone_allocation: BTreeMap<ZoneKind, f64>,
    /// Cap on residents per square kilometre.
    pub max_density: f64,
    pub adjacent: Vec<DistrictId>,
    pub metrics: DistrictMetrics,
    pub has_transit: bool,
    pub parking_minimums: bool,
}

impl District {
    pub fn current_density(&self) -> f64 {
        if self.area_km2 > 0.0 {
            self.population as f64 / self.area_km2
        } else {
            0.0
        }
    }

    pub fn density_ratio(&self) -> f64 {
        if self.max_density > 0.0 {
            (self.current_density() / self.max_density).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn max_population(&self) -> f64 {
        self.max_density * self.area_km2
    }

    /// Fraction of the district allocated to a zone kind, in [0, 1].
    pub fn zone_share(&self, kind: ZoneKind) -> f64 {
        self.zone_allocation.get(&kind).copied().unwrap_or(0.0) / 100.0
    }

    /// Residents the current zone mix can house, capped by the density cap.
    pub fn housing_capacity(&self) -> f64 {
        let zoned: f64 = ZoneKind::ALL
            .iter()
            .map(|kind| self.zone_share(*kind) * self.area_km2 * kind.density_yield())
            .sum();
        zoned.min(self.max_population())
    }

    /// Jobs the current zone mix supports.
    pub fn job_capacity(&self) -> f64 {
        ZoneKind::ALL
            .iter()
            .map(|kind| self.zone_share(*kind) * self.area_km2 * kind.job_yield())
            .sum()
    }

    pub fn remaining_capacity(&self) -> f64 {
        (self.max_population() - self.population as f64).max(0.0)
    }
}

pub fn zone_sum(allocation: &BTreeMap<ZoneKind, f64>) -> f64 {
    allocation.values().sum()
}

/// Order-normalised district pair used as the road-segment key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RoadKey(DistrictId, DistrictId);

impl RoadKey {
    pub fn new(a: DistrictId, b: DistrictId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn endpoints(self) -> (DistrictId, DistrictId) {
        (self.0, self.1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadSegment {
    pub capacity: f64,
    /// Persistent across ticks; the damped traffic loop converges it, it is
    /// never reset to zero.
    pub load: f64,
}

impl RoadSegment {
    pub fn congestion(&self) -> f64 {
        if self.capacity > 0.0 {
            (self.load / self.capacity).min(1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadNetwork {
    segments: BTreeMap<RoadKey, RoadSegment>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: DistrictId, b: DistrictId, capacity: f64) {
        self.segments
            .insert(RoadKey::new(a, b), RoadSegment { capacity, load: 0.0 });
    }

    pub fn segment(&self, a: DistrictId, b: DistrictId) -> Option<&RoadSegment> {
        self.segments.get(&RoadKey::new(a, b))
    }

    pub fn segment_mut(&mut self, a: DistrictId, b: DistrictId) -> Option<&mut RoadSegment> {
        self.segments.get_mut(&RoadKey::new(a, b))
    }

    pub fn keys(&self) -> Vec<RoadKey> {
        self.segments.keys().copied().collect()
    }

    pub fn get_mut(&mut self, key: RoadKey) -> Option<&mut RoadSegment> {
        self.segments.get_mut(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoadKey, &RoadSegment)> {
        self.segments.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&RoadKey, &mut RoadSegment)> {
        self.segments.iter_mut()
    }

    pub fn congestion_between(&self, a: DistrictId, b: DistrictId) -> f64 {
        self.segment(a, b).map(|s| s.congestion()).unwrap_or(0.0)
    }

    /// Unweighted mean of all segment congestion values.
    pub fn congestion_index(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let total: f64 = self.segments.values().map(|s| s.congestion()).sum();
        total / self.segments.len() as f64
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransitKind {
    Bus,
    LightRail,
    Metro,
}

impl TransitKind {
    /// Average connected-district density at which the line reaches its
    /// nominal ridership. Rail only pays off at much higher densities.
    pub fn density_threshold(self) -> f64 {
        match self {
            TransitKind::Bus => 2_000.0,
            TransitKind::LightRail => 6_000.0,
            TransitKind::Metro => 12_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitLine {
    pub id: u32,
    pub name: String,
    pub kind: TransitKind,
    pub districts: Vec<DistrictId>,
    pub capacity: f64,
    pub ridership: f64,
    /// Strictly decreasing; 0 means operational. The transition to 0 is a
    /// one-time event.
    pub construction_turns_remaining: u32,
    pub operating_cost: f64,
    /// Property-value multiplier applied to connected districts exactly once,
    /// on the tick the line opens.
    pub property_value_boost: f64,
}

impl TransitLine {
    pub fn is_operational(&self) -> bool {
        self.construction_turns_remaining == 0
    }

    pub fn serves(&self, district: DistrictId) -> bool {
        self.districts.contains(&district)
    }

    pub fn serves_both(&self, a: DistrictId, b: DistrictId) -> bool {
        self.serves(a) && self.serves(b)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Leaning {
    Progressive,
    Moderate,
    Conservative,
    Populist,
    Yimby,
    Nimby,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCategory {
    Housing,
    Transit,
    Roads,
    CongestionPricing,
    Taxation,
    Zoning,
    Environment,
    PublicSafety,
}

impl PolicyCategory {
    pub const ALL: [PolicyCategory; 8] = [
        PolicyCategory::Housing,
        PolicyCategory::Transit,
        PolicyCategory::Roads,
        PolicyCategory::CongestionPricing,
        PolicyCategory::Taxation,
        PolicyCategory::Zoning,
        PolicyCategory::Environment,
        PolicyCategory::PublicSafety,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub turn: u64,
    pub proposal: String,
    pub supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    pub district: DistrictId,
    pub name: String,
    pub leaning: Leaning,
    pub approval: f64,
    pub reelection_risk: f64,
    /// Top-3 policy categories by district urgency.
    pub priorities: Vec<PolicyCategory>,
    pub vote_history: Vec<VoteRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub balance: f64,
    pub income: f64,
    pub expenses: f64,
    pub tax_rate: f64,
    /// Fraction of the net transit operating cost the city covers.
    pub transit_subsidy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMetrics {
    pub population: u64,
    pub average_commute: f64,
    pub average_rent: f64,
    pub overall_happiness: f64,
    pub congestion_index: f64,
    pub transit_ridership: f64,
    pub housing_supply: f64,
    pub housing_demand: f64,
    pub jobs: f64,
    pub economic_output: f64,
}

/// Anticipated household growth used when comparing demand against supply.
const DEMAND_GROWTH_FACTOR: f64 = 1.05;
/// Per-job contribution to economic output, in budget currency per turn.
const OUTPUT_PER_JOB: f64 = 90.0;

/// The single owned aggregate of all mutable simulation state. Every system
/// takes it explicitly; there are no globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityState {
    pub name: String,
    pub districts: BTreeMap<DistrictId, District>,
    pub roads: RoadNetwork,
    pub transit_lines: Vec<TransitLine>,
    /// One representative per district, keyed by the district it holds.
    pub representatives: BTreeMap<DistrictId, Representative>,
    pub budget: Budget,
    pub median_income: f64,
}

impl CityState {
    pub fn district(&self, id: DistrictId) -> Option<&District> {
        self.districts.get(&id)
    }

    pub fn district_mut(&mut self, id: DistrictId) -> Option<&mut District> {
        self.districts.get_mut(&id)
    }

    pub fn district_ids(&self) -> Vec<DistrictId> {
        self.districts.keys().copied().collect()
    }

    pub fn total_population(&self) -> u64 {
        self.districts.values().map(|d| d.population).sum()
    }

    /// City-wide aggregates; commute, rent and happiness are
    /// population-weighted.
    pub fn city_metrics(&self) -> CityMetrics {
        let population = self.total_population();
        let weight_total = population.max(1) as f64;
        let mut commute = 0.0;
        let mut rent = 0.0;
        let mut happiness = 0.0;
        let mut supply = 0.0;
        let mut jobs = 0.0;
        for district in self.districts.values() {
            let w = district.population as f64;
            commute += district.metrics.commute_minutes * w;
            rent += district.metrics.rent * w;
            happiness += district.metrics.happiness * w;
            supply += district.housing_capacity();
            jobs += district.job_capacity();
        }
        let ridership: f64 = self
            .transit_lines
            .iter()
            .filter(|line| line.is_operational())
            .map(|line| line.ridership)
            .sum();
        CityMetrics {
            population,
            average_commute: commute / weight_total,
            average_rent: rent / weight_total,
            overall_happiness: happiness / weight_total,
            congestion_index: self.roads.congestion_index(),
            transit_ridership: ridership,
            housing_supply: supply,
            housing_demand: population as f64 * DEMAND_GROWTH_FACTOR,
            jobs,
            economic_output: jobs * OUTPUT_PER_JOB,
        }
    }
}
