use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pc_audio::mfcc::{MfccExtractor, MfccParams};
use pc_audio::preprocess::PreprocessingChain;
use pc_core::config::PassConfig;
use pc_core::traits::FeatureExtractor;
use pc_core::window::{AudioWindow, FeatureMatrix};

fn engine_hum(len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * 120.0 * t).sin()
                + 0.1 * (2.0 * std::f32::consts::PI * 1800.0 * t).sin()
        })
        .collect()
}

fn bench_preprocess(c: &mut Criterion) {
    let config = PassConfig::default();
    let chain = PreprocessingChain::from_config(&config);
    let samples = engine_hum(config.window_samples, config.sample_rate);
    let mut window = AudioWindow::new(config.window_samples);

    c.bench_function("preprocess_window_8000", |b| {
        b.iter(|| {
            window.samples_mut().copy_from_slice(&samples);
            black_box(chain.apply(black_box(&mut window)));
        });
    });
}

fn bench_mfcc(c: &mut Criterion) {
    let config = PassConfig::default();
    let mut extractor = MfccExtractor::new(MfccParams::from_config(&config));
    let (rows, cols) = extractor.output_shape();
    let mut out = FeatureMatrix::new(rows, cols);
    let window = AudioWindow::from(engine_hum(config.window_samples, config.sample_rate));

    c.bench_function("mfcc_40x16", |b| {
        b.iter(|| {
            let _ = black_box(extractor.extract(black_box(&window), &mut out));
        });
    });
}

criterion_group!(benches, bench_preprocess, bench_mfcc);
criterion_main!(benches);
