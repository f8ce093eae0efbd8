use std::f32::consts::PI;

use levelscope::audio::spectrum::{channel, CycleOutcome, FrequencyTable};
use levelscope::config::AnalyzerConfig;

fn sine(freq_hz: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate).sin())
        .collect()
}

fn argmax(levels: &[f32]) -> usize {
    levels
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap()
}

#[test]
fn full_scale_tone_peaks_at_its_display_point() {
    let config = AnalyzerConfig {
        block_size: 1024,
        num_points: 200,
        ..AnalyzerConfig::default()
    };
    let (mut producer, mut estimator) = channel(&config).unwrap();
    let handle = producer.handle();
    handle.configure(44_100.0);

    producer.push(&sine(1_000.0, 1.0, 44_100.0, 1024));
    assert_eq!(estimator.run_cycle(), CycleOutcome::Analyzed);

    let levels = handle.get_levels();
    assert_eq!(levels.len(), 200);

    let nearest = FrequencyTable::new(200, 20.0, 20_000.0).nearest_index(1_000.0);
    let peak = argmax(&levels);
    assert!(peak.abs_diff(nearest) <= 1, "peak at {peak}, expected {nearest}");
    assert!((-4.0..=0.0).contains(&levels[peak]), "peak level {}", levels[peak]);

    for offset in 5..40 {
        assert!(levels[nearest - offset] < levels[peak]);
        assert!(levels[nearest + offset] < levels[peak]);
    }
    assert!(levels.iter().all(|db| (-90.0..=0.0).contains(db)));
}

#[test]
fn untilted_tones_land_on_nearest_point() {
    let config = AnalyzerConfig {
        block_size: 4096,
        num_points: 200,
        tilt_db_per_octave: 0.0,
        default_sample_rate: 48_000.0,
        ..AnalyzerConfig::default()
    };
    let table = FrequencyTable::new(200, 20.0, 20_000.0);

    for freq in [250.0, 440.0, 1_000.0, 3_000.0, 6_000.0] {
        let (mut producer, mut estimator) = channel(&config).unwrap();
        producer.push(&sine(freq, 0.25, 48_000.0, 4096));
        assert_eq!(estimator.run_cycle(), CycleOutcome::Analyzed);

        let levels = producer.handle().get_levels();
        let nearest = table.nearest_index(freq);
        assert_eq!(argmax(&levels), nearest, "{freq} Hz");
        assert!(levels[nearest - 2] < levels[nearest - 1]);
        assert!(levels[nearest + 2] < levels[nearest + 1]);
    }
}

#[test]
fn silence_relaxes_to_floor() {
    let config = AnalyzerConfig {
        block_size: 1024,
        num_points: 64,
        ..AnalyzerConfig::default()
    };
    let (mut producer, mut estimator) = channel(&config).unwrap();
    let handle = producer.handle();

    producer.push(&sine(440.0, 0.8, 44_100.0, 1024));
    estimator.run_cycle();
    assert!(handle.get_levels().iter().any(|&db| db > -30.0));

    let silence = vec![0.0; 1024];
    for _ in 0..100 {
        producer.push(&silence);
        assert_eq!(estimator.run_cycle(), CycleOutcome::Analyzed);
    }
    assert!(handle.get_levels().iter().all(|&db| (db + 90.0).abs() < 1e-3));
}

#[test]
fn no_input_decays_to_floor() {
    let config = AnalyzerConfig {
        block_size: 1024,
        num_points: 64,
        ..AnalyzerConfig::default()
    };
    let (mut producer, mut estimator) = channel(&config).unwrap();
    producer.push(&sine(2_000.0, 1.0, 44_100.0, 1024));
    estimator.run_cycle();

    let mut previous = producer.handle().get_levels();
    for _ in 0..200 {
        assert_eq!(estimator.run_cycle(), CycleOutcome::Decayed);
        let levels = producer.handle().get_levels();
        for (now, before) in levels.iter().zip(&previous) {
            assert!(now <= before);
        }
        previous = levels;
    }
    assert!(previous.iter().all(|&db| (db + 90.0).abs() < 1e-3));
}

#[test]
fn hostile_input_stays_bounded() {
    let config = AnalyzerConfig {
        block_size: 512,
        num_points: 128,
        ..AnalyzerConfig::default()
    };
    let (mut producer, mut estimator) = channel(&config).unwrap();
    let handle = producer.handle();

    let mut hostile = sine(1_000.0, 1e30, 44_100.0, 512);
    hostile[7] = f32::NAN;
    hostile[100] = f32::INFINITY;
    hostile[200] = f32::NEG_INFINITY;

    for block in [hostile, vec![f32::NAN; 512], vec![1e-30; 512]] {
        producer.push(&block);
        estimator.run_cycle();
        let levels = handle.get_levels();
        assert!(levels.iter().all(|db| !db.is_nan() && (-90.0..=0.0).contains(db)));
    }
}

#[test]
fn sample_rate_swap_retunes_the_mapping() {
    let config = AnalyzerConfig {
        block_size: 4096,
        num_points: 200,
        tilt_db_per_octave: 0.0,
        ..AnalyzerConfig::default()
    };
    let table = FrequencyTable::new(200, 20.0, 20_000.0);
    let (mut producer, mut estimator) = channel(&config).unwrap();
    let handle = producer.handle();

    // 1 kHz rendered at 48 kHz but analyzed as 44.1 kHz reads low.
    let tone = sine(1_000.0, 0.25, 48_000.0, 4096);
    producer.push(&tone);
    estimator.run_cycle();
    let mistuned = argmax(&handle.get_levels());
    assert!(mistuned < table.nearest_index(1_000.0));

    handle.configure(48_000.0);
    for _ in 0..20 {
        producer.push(&tone);
        estimator.run_cycle();
    }
    assert_eq!(estimator.sample_rate_in_use(), 48_000.0);
    assert_eq!(argmax(&handle.get_levels()), table.nearest_index(1_000.0));

    // Rejected values leave the rate alone.
    handle.configure(f32::NAN);
    handle.configure(0.0);
    estimator.run_cycle();
    assert_eq!(estimator.sample_rate_in_use(), 48_000.0);
}

#[test]
fn chunked_pushes_match_one_push() {
    let config = AnalyzerConfig {
        block_size: 2048,
        num_points: 96,
        ..AnalyzerConfig::default()
    };
    let signal = sine(700.0, 0.5, 44_100.0, 3000);

    let (mut whole, mut whole_estimator) = channel(&config).unwrap();
    whole.push(&signal);
    whole_estimator.run_cycle();

    let (mut chunked, mut chunked_estimator) = channel(&config).unwrap();
    for chunk in signal.chunks(128) {
        chunked.push(chunk);
    }
    chunked_estimator.run_cycle();

    assert_eq!(whole.handle().get_levels(), chunked.handle().get_levels());
}

#[test]
fn oversized_push_keeps_newest_block() {
    let config = AnalyzerConfig {
        block_size: 1024,
        num_points: 200,
        tilt_db_per_octave: 0.0,
        ..AnalyzerConfig::default()
    };
    let table = FrequencyTable::new(200, 20.0, 20_000.0);
    let (mut producer, mut estimator) = channel(&config).unwrap();

    // Ten blocks of a low tone followed by one block of a high tone.
    let mut signal = sine(200.0, 0.5, 44_100.0, 10 * 1024);
    signal.extend(sine(3_000.0, 0.5, 44_100.0, 1024));
    producer.push(&signal);
    estimator.run_cycle();

    let peak = argmax(&producer.handle().get_levels());
    assert!(peak.abs_diff(table.nearest_index(3_000.0)) <= 1);
}

#[test]
fn stalled_consumer_analyzes_the_latest_block() {
    let config = AnalyzerConfig {
        block_size: 1024,
        num_points: 200,
        tilt_db_per_octave: 0.0,
        ..AnalyzerConfig::default()
    };
    let table = FrequencyTable::new(200, 20.0, 20_000.0);
    let (mut producer, mut estimator) = channel(&config).unwrap();

    // The consumer sleeps through enough low tone to fill the FIFO.
    let low = sine(200.0, 0.5, 44_100.0, 1024);
    for _ in 0..4 {
        producer.push(&low);
    }
    producer.push(&sine(3_000.0, 0.5, 44_100.0, 1024));
    assert_eq!(producer.handle().overruns(), 1024);

    assert_eq!(estimator.run_cycle(), CycleOutcome::Analyzed);
    let peak = argmax(&producer.handle().get_levels());
    assert!(peak.abs_diff(table.nearest_index(3_000.0)) <= 1, "peak at {peak}");
}
