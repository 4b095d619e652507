use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pc_core::window::ScoreVector;
use pc_vote::{VotingConfig, VotingEngine};

fn traffic(len: usize) -> Vec<ScoreVector> {
    (0..len)
        .map(|i| {
            // 20 fenêtres de fond, 10 de véhicule, en boucle
            if i % 30 < 20 {
                ScoreVector::from(vec![0.85, 0.05, 0.05, 0.05])
            } else {
                ScoreVector::from(vec![0.05, 0.85, 0.05, 0.05])
            }
        })
        .collect()
}

fn bench_observe(c: &mut Criterion) {
    let seq = traffic(3000);
    let Ok(mut engine) = VotingEngine::new(VotingConfig::default()) else {
        return;
    };

    c.bench_function("voting_observe_3000", |b| {
        b.iter(|| {
            engine.reset();
            for (i, s) in seq.iter().enumerate() {
                black_box(engine.observe(i as u64, black_box(s)));
            }
        });
    });
}

fn bench_long_history(c: &mut Criterion) {
    let seq = traffic(3000);
    let config = VotingConfig {
        history_len: 32,
        ..VotingConfig::default()
    };
    let Ok(mut engine) = VotingEngine::new(config) else {
        return;
    };

    c.bench_function("voting_observe_3000_k32", |b| {
        b.iter(|| {
            engine.reset();
            for (i, s) in seq.iter().enumerate() {
                black_box(engine.observe(i as u64, black_box(s)));
            }
        });
    });
}

criterion_group!(benches, bench_observe, bench_long_history);
criterion_main!(benches);
