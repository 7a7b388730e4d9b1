use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use reticle::director::{SwitchDirector, TargetDirector};
use reticle::drill::Drill;
use reticle::geometry::Arena;
use reticle::mode::{Difficulty, DrillSettings, TestMode};
use reticle::util::{consistency_pct, percentage};

fn any_mode() -> impl Strategy<Value = TestMode> {
    prop_oneof![
        Just(TestMode::Gridshot),
        Just(TestMode::Flick),
        Just(TestMode::Track),
        Just(TestMode::Switch),
    ]
}

fn any_difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
        Just(Difficulty::Expert),
    ]
}

proptest! {
    #[test]
    fn shots_always_equal_hits_plus_misses(
        mode in any_mode(),
        difficulty in any_difficulty(),
        seed in any::<u64>(),
        clicks in prop::collection::vec((0.0f64..800.0, 0.0f64..600.0, 1.0f64..200.0), 0..60),
    ) {
        let mut d = Drill::with_seed(
            DrillSettings::new(mode, difficulty, 5.0),
            Arena::default(),
            seed,
        );
        d.start(0.0);
        let mut now = 0.0;
        for (x, y, gap) in clicks {
            now += gap;
            d.tick(now);
            d.on_click(x, y, now);
            let m = d.running_metrics();
            prop_assert_eq!(m.total_shots, m.total_hits + m.total_misses);
        }
        d.tick(10_000.0);
        let results = d.results().unwrap();
        prop_assert_eq!(results.total_shots, results.total_hits + results.total_misses);
        prop_assert!((0.0..=100.0).contains(&results.accuracy_pct));
        prop_assert!((0.0..=100.0).contains(&results.consistency_pct));
    }

    #[test]
    fn consistency_stays_in_range(samples in prop::collection::vec(0.0f64..5000.0, 0..50)) {
        let c = consistency_pct(&samples);
        prop_assert!((0.0..=100.0).contains(&c));
    }

    #[test]
    fn accuracy_stays_in_range(total in 0u32..500, hits_frac in 0.0f64..=1.0) {
        let hits = (total as f64 * hits_frac).floor();
        let acc = percentage(hits, total as f64);
        prop_assert!((0.0..=100.0).contains(&acc));
    }

    #[test]
    fn switch_keeps_exactly_one_active_target(
        difficulty in any_difficulty(),
        seed in any::<u64>(),
        switches in 0usize..20,
    ) {
        let settings = DrillSettings::new(TestMode::Switch, difficulty, 30.0);
        let mut director = SwitchDirector::new(&settings, Arena::default());
        let mut rng = StdRng::seed_from_u64(seed);
        director.spawn_initial(0.0, &mut rng);

        let active = |d: &SwitchDirector| d.targets().iter().filter(|t| t.is_active()).count();
        prop_assert_eq!(active(&director), 1);
        for i in 0..switches {
            director.switch_to_next((i as f64 + 1.0) * 100.0);
            prop_assert_eq!(active(&director), 1);
            prop_assert_eq!(director.targets().len(), settings.total_targets);
        }
    }
}
