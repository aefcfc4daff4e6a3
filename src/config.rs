//! City configuration: the external city-builder's product, loaded from YAML
//! or built programmatically, validated once, then deep-built into the
//! engine-owned [`CityState`].

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::{
    zone_sum, Budget, CityState, District, DistrictId, DistrictMetrics, Leaning,
    PolicyCategory, Representative, RoadNetwork, TransitKind, TransitLine, ZoneKind,
    ZONE_SUM_TOLERANCE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("city must define at least one district")]
    NoDistricts,
    #[error("district id {0} defined more than once")]
    DuplicateDistrict(u32),
    #[error("district '{0}' has non-positive area")]
    BadArea(String),
    #[error("district '{district}' zone allocation sums to {total:.1}%, must sum to 100%")]
    ZoneSum { district: String, total: f64 },
    #[error("district '{district}' lists unknown adjacent district id {id}")]
    UnknownAdjacent { district: String, id: u32 },
    #[error("road references unknown district id {0}")]
    UnknownRoadDistrict(u32),
    #[error("transit line '{line}' references unknown district id {id}")]
    UnknownTransitDistrict { line: String, id: u32 },
    #[error("representative assigned to unknown district id {0}")]
    UnknownRepresentativeDistrict(u32),
    #[error("district id {0} has more than one representative")]
    DuplicateRepresentative(u32),
}

fn default_seed() -> u64 {
    42
}

fn default_median_income() -> f64 {
    54_000.0
}

fn default_boost() -> f64 {
    1.08
}

fn default_approval() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_median_income")]
    pub median_income: f64,
    pub districts: Vec<DistrictConfig>,
    #[serde(default)]
    pub roads: Vec<RoadConfig>,
    #[serde(default)]
    pub transit_lines: Vec<TransitLineConfig>,
    /// One entry per district; districts without one get a Moderate default.
    #[serde(default)]
    pub representatives: Vec<RepresentativeConfig>,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub goals: Vec<ScenarioGoal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictConfig {
    pub id: u32,
    pub name: String,
    pub population: u64,
    pub area_km2: f64,
    pub zones: BTreeMap<ZoneKind, f64>,
    pub max_density: f64,
    #[serde(default)]
    pub adjacent: Vec<u32>,
    #[serde(default)]
    pub has_transit: bool,
    #[serde(default)]
    pub parking_minimums: bool,
    /// Starting metric overrides; anything omitted takes the default.
    #[serde(default)]
    pub metrics: Option<DistrictMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadConfig {
    pub from: u32,
    pub to: u32,
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitLineConfig {
    pub id: u32,
    pub name: String,
    pub kind: TransitKind,
    pub districts: Vec<u32>,
    pub capacity: f64,
    #[serde(default)]
    pub construction_turns: u32,
    pub operating_cost: f64,
    #[serde(default = "default_boost")]
    pub property_value_boost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeConfig {
    pub district: u32,
    pub name: String,
    pub leaning: Leaning,
    #[serde(default = "default_approval")]
    pub approval: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub balance: f64,
    pub tax_rate: f64,
    pub transit_subsidy: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            balance: 100_000.0,
            tax_rate: 0.08,
            transit_subsidy: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalComparison {
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    Population,
    AverageCommute,
    AverageRent,
    OverallHappiness,
    CongestionIndex,
    TransitRidership,
    EconomicOutput,
    BudgetBalance,
}

/// A target city-metric threshold; all goals met at once ends the run in a
/// win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGoal {
    pub metric: GoalMetric,
    pub comparison: GoalComparison,
    pub target: f64,
}

impl CityConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read city file {}", path.display()))?;
        let config: CityConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("failed to serialise city config")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.districts.is_empty() {
            return Err(ConfigError::NoDistricts);
        }
        let mut known = Vec::new();
        for district in &self.districts {
            if known.contains(&district.id) {
                return Err(ConfigError::DuplicateDistrict(district.id));
            }
            known.push(district.id);
            if district.area_km2 <= 0.0 {
                return Err(ConfigError::BadArea(district.name.clone()));
            }
            let total = zone_sum(&district.zones);
            if (total - 100.0).abs() > ZONE_SUM_TOLERANCE {
                return Err(ConfigError::ZoneSum {
                    district: district.name.clone(),
                    total,
                });
            }
        }
        for district in &self.districts {
            for &id in &district.adjacent {
                if !known.contains(&id) {
                    return Err(ConfigError::UnknownAdjacent {
                        district: district.name.clone(),
                        id,
                    });
                }
            }
        }
        for road in &self.roads {
            if !known.contains(&road.from) {
                return Err(ConfigError::UnknownRoadDistrict(road.from));
            }
            if !known.contains(&road.to) {
                return Err(ConfigError::UnknownRoadDistrict(road.to));
            }
        }
        for line in &self.transit_lines {
            for &id in &line.districts {
                if !known.contains(&id) {
                    return Err(ConfigError::UnknownTransitDistrict {
                        line: line.name.clone(),
                        id,
                    });
                }
            }
        }
        let mut seated = Vec::new();
        for rep in &self.representatives {
            if !known.contains(&rep.district) {
                return Err(ConfigError::UnknownRepresentativeDistrict(rep.district));
            }
            if seated.contains(&rep.district) {
                return Err(ConfigError::DuplicateRepresentative(rep.district));
            }
            seated.push(rep.district);
        }
        Ok(())
    }

    /// Builds the engine-owned state. Assumes `validate` has passed.
    pub fn build_state(&self) -> CityState {
        let mut districts = BTreeMap::new();
        for config in &self.districts {
            let id = DistrictId(config.id);
            districts.insert(
                id,
                District {
                    id,
                    name: config.name.clone(),
                    population: config.population,
                    area_km2: config.area_km2,
                    zone_allocation: config.zones.clone(),
                    max_density: config.max_density,
                    adjacent: config.adjacent.iter().map(|&i| DistrictId(i)).collect(),
                    metrics: config.metrics.clone().unwrap_or_default(),
                    has_transit: config.has_transit,
                    parking_minimums: config.parking_minimums,
                },
            );
        }

        let mut roads = RoadNetwork::new();
        for road in &self.roads {
            roads.insert(DistrictId(road.from), DistrictId(road.to), road.capacity);
        }

        let transit_lines = self
            .transit_lines
            .iter()
            .map(|line| TransitLine {
                id: line.id,
                name: line.name.clone(),
                kind: line.kind,
                districts: line.districts.iter().map(|&i| DistrictId(i)).collect(),
                capacity: line.capacity,
                ridership: 0.0,
                construction_turns_remaining: line.construction_turns,
                operating_cost: line.operating_cost,
                property_value_boost: line.property_value_boost,
            })
            .collect();

        let mut representatives = BTreeMap::new();
        for rep in &self.representatives {
            let district = DistrictId(rep.district);
            representatives.insert(
                district,
                Representative {
                    district,
                    name: rep.name.clone(),
                    leaning: rep.leaning,
                    approval: rep.approval.clamp(0.0, 1.0),
                    reelection_risk: 0.45,
                    priorities: default_priorities(),
                    vote_history: Vec::new(),
                },
            );
        }
        // Every district holds exactly one seat; unconfigured seats default
        // to a Moderate.
        for (&id, district) in &districts {
            representatives.entry(id).or_insert_with(|| Representative {
                district: id,
                name: format!("{} delegate", district.name),
                leaning: Leaning::Moderate,
                approval: 0.5,
                reelection_risk: 0.45,
                priorities: default_priorities(),
                vote_history: Vec::new(),
            });
        }

        CityState {
            name: self.name.clone(),
            districts,
            roads,
            transit_lines,
            representatives,
            budget: Budget {
                balance: self.budget.balance,
                income: 0.0,
                expenses: 0.0,
                tax_rate: self.budget.tax_rate,
                transit_subsidy: self.budget.transit_subsidy,
            },
            median_income: self.median_income,
        }
    }

    /// Small four-district city used by the CLI default and the test suite.
    pub fn demo_city() -> Self {
        fn zones(entries: &[(ZoneKind, f64)]) -> BTreeMap<ZoneKind, f64> {
            entries.iter().copied().collect()
        }
        Self {
            name: "riverbend".into(),
            seed: 42,
            median_income: 54_000.0,
            districts: vec![
                DistrictConfig {
                    id: 1,
                    name: "Old Town".into(),
                    population: 48_000,
                    area_km2: 6.0,
                    zones: zones(&[
                        (ZoneKind::Residential, 45.0),
                        (ZoneKind::Commercial, 25.0),
                        (ZoneKind::MixedUse, 20.0),
                        (ZoneKind::GreenSpace, 10.0),
                    ]),
                    max_density: 14_000.0,
                    adjacent: vec![2, 3],
                    has_transit: true,
                    parking_minimums: false,
                    metrics: None,
                },
                DistrictConfig {
                    id: 2,
                    name: "Harborfront".into(),
                    population: 31_000,
                    area_km2: 8.0,
                    zones: zones(&[
                        (ZoneKind::Residential, 30.0),
                        (ZoneKind::Commercial, 20.0),
                        (ZoneKind::Industrial, 35.0),
                        (ZoneKind::MixedUse, 10.0),
                        (ZoneKind::GreenSpace, 5.0),
                    ]),
                    max_density: 8_000.0,
                    adjacent: vec![1, 4],
                    has_transit: true,
                    parking_minimums: true,
                    metrics: None,
                },
                DistrictConfig {
                    id: 3,
                    name: "Millbrook".into(),
                    population: 22_000,
                    area_km2: 11.0,
                    zones: zones(&[
                        (ZoneKind::Residential, 70.0),
                        (ZoneKind::Commercial, 10.0),
                        (ZoneKind::MixedUse, 5.0),
                        (ZoneKind::GreenSpace, 15.0),
                    ]),
                    max_density: 5_000.0,
                    adjacent: vec![1, 4],
                    has_transit: false,
                    parking_minimums: true,
                    metrics: None,
                },
                DistrictConfig {
                    id: 4,
                    name: "Riverside".into(),
                    population: 12_000,
                    area_km2: 9.0,
                    zones: zones(&[
                        (ZoneKind::Residential, 55.0),
                        (ZoneKind::Commercial, 15.0),
                        (ZoneKind::Industrial, 10.0),
                        (ZoneKind::MixedUse, 10.0),
                        (ZoneKind::GreenSpace, 10.0),
                    ]),
                    max_density: 6_000.0,
                    adjacent: vec![2, 3],
                    has_transit: false,
                    parking_minimums: false,
                    metrics: None,
                },
            ],
            roads: vec![
                RoadConfig {
                    from: 1,
                    to: 2,
                    capacity: 9_000.0,
                },
                RoadConfig {
                    from: 1,
                    to: 3,
                    capacity: 7_000.0,
                },
                RoadConfig {
                    from: 2,
                    to: 4,
                    capacity: 5_000.0,
                },
                RoadConfig {
                    from: 3,
                    to: 4,
                    capacity: 4_000.0,
                },
            ],
            transit_lines: vec![
                TransitLineConfig {
                    id: 1,
                    name: "Harbor Bus".into(),
                    kind: TransitKind::Bus,
                    districts: vec![1, 2],
                    capacity: 4_000.0,
                    construction_turns: 0,
                    operating_cost: 6_000.0,
                    property_value_boost: 1.05,
                },
                TransitLineConfig {
                    id: 2,
                    name: "Millbrook Metro".into(),
                    kind: TransitKind::Metro,
                    districts: vec![1, 3],
                    capacity: 12_000.0,
                    construction_turns: 8,
                    operating_cost: 20_000.0,
                    property_value_boost: 1.12,
                },
            ],
            representatives: vec![
                RepresentativeConfig {
                    district: 1,
                    name: "A. Okafor".into(),
                    leaning: Leaning::Progressive,
                    approval: 0.55,
                },
                RepresentativeConfig {
                    district: 2,
                    name: "R. Castellanos".into(),
                    leaning: Leaning::Populist,
                    approval: 0.5,
                },
                RepresentativeConfig {
                    district: 3,
                    name: "J. Whitfield".into(),
                    leaning: Leaning::Nimby,
                    approval: 0.6,
                },
                RepresentativeConfig {
                    district: 4,
                    name: "M. Tran".into(),
                    leaning: Leaning::Moderate,
                    approval: 0.5,
                },
            ],
            budget: BudgetConfig::default(),
            goals: vec![
                ScenarioGoal {
                    metric: GoalMetric::OverallHappiness,
                    comparison: GoalComparison::AtLeast,
                    target: 0.75,
                },
                ScenarioGoal {
                    metric: GoalMetric::CongestionIndex,
                    comparison: GoalComparison::AtMost,
                    target: 0.35,
                },
            ],
        }
    }
}

fn default_priorities() -> Vec<PolicyCategory> {
    vec![
        PolicyCategory::Housing,
        PolicyCategory::Transit,
        PolicyCategory::Taxation,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_city_validates() {
        let config = CityConfig::demo_city();
        config.validate().unwrap();
        let state = config.build_state();
        assert_eq!(state.districts.len(), 4);
        assert_eq!(state.representatives.len(), 4);
        assert_eq!(state.roads.len(), 4);
    }

    #[test]
    fn bad_zone_sum_is_rejected() {
        let mut config = CityConfig::demo_city();
        config.districts[0]
            .zones
            .insert(ZoneKind::Industrial, 30.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("100%"));
    }

    #[test]
    fn unknown_adjacency_is_rejected() {
        let mut config = CityConfig::demo_city();
        config.districts[0].adjacent.push(99);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownAdjacent { id: 99, .. })
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let config = CityConfig::demo_city();
        let yaml = config.to_yaml().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("city.yaml");
        std::fs::write(&path, yaml).unwrap();
        let loaded = CityConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.name, config.name);
        assert_eq!(loaded.districts.len(), config.districts.len());
        loaded.validate().unwrap();
    }

    #[test]
    fn unseated_districts_get_default_representatives() {
        let mut config = CityConfig::demo_city();
        config.representatives.truncate(2);
        config.validate().unwrap();
        let state = config.build_state();
        assert_eq!(state.representatives.len(), 4);
        assert_eq!(
            state.representatives[&DistrictId(4)].leaning,
            Leaning::Moderate
        );
    }
}
