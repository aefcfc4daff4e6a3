use civica::world::Metric;
use civica::{CityConfig, Engine, GameMode};

fn engine() -> Engine {
    let mut config = CityConfig::demo_city();
    // No win condition: these tests want the full run.
    config.goals.clear();
    Engine::new(config, GameMode::Political).unwrap()
}

#[test]
fn ratio_metrics_stay_bounded_over_many_ticks() {
    let mut engine = engine();
    for _ in 0..60 {
        engine.tick();
        for district in engine.districts() {
            for metric in Metric::RATIOS {
                let value = district.metrics.get(metric);
                assert!(
                    (0.0..=1.0).contains(&value),
                    "{:?} out of range in {}: {}",
                    metric,
                    district.name,
                    value
                );
            }
        }
    }
}

#[test]
fn long_runs_never_produce_nan() {
    let mut engine = engine();
    for _ in 0..80 {
        let result = engine.tick();
        assert!(result.after.average_commute.is_finite());
        assert!(result.after.average_rent.is_finite());
        assert!(result.after.overall_happiness.is_finite());
        assert!(result.after.congestion_index.is_finite());
        for district in engine.districts() {
            assert!(district.metrics.commute_minutes.is_finite());
            assert!(district.metrics.rent.is_finite());
            assert!(district.metrics.happiness.is_finite());
            assert!(district.metrics.congestion.is_finite());
        }
        assert!(engine.metrics().population > 0);
    }
}

#[test]
fn road_loads_are_seeded_before_the_first_tick() {
    let engine = engine();
    for (_, segment) in engine.state().roads.iter() {
        assert!(
            segment.load > 0.0,
            "persistent load should be seeded from initial congestion"
        );
    }
}

#[test]
fn damping_keeps_rent_changes_gradual() {
    let mut engine = engine();
    let mut previous: Vec<f64> = engine
        .districts()
        .map(|d| d.metrics.rent)
        .collect();
    for _ in 0..40 {
        engine.tick();
        let current: Vec<f64> = engine.districts().map(|d| d.metrics.rent).collect();
        for (before, after) in previous.iter().zip(&current) {
            let change = (after - before).abs() / before.max(1.0);
            assert!(
                change < 0.25,
                "rent moved {:.1}% in one tick; damping should prevent snaps",
                change * 100.0
            );
        }
        previous = current;
    }
}

#[test]
fn segment_congestion_is_capped_at_one() {
    let mut engine = engine();
    for _ in 0..30 {
        engine.tick();
        for (_, segment) in engine.state().roads.iter() {
            let congestion = segment.congestion();
            assert!((0.0..=1.0).contains(&congestion));
        }
        let index = engine.metrics().congestion_index;
        assert!((0.0..=1.0).contains(&index));
    }
}
