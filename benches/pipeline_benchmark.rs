//! Criterion benchmarks for BeatBrains
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use beatbrains::assembler::assemble;
use beatbrains::audio::{AudioClip, SampleBuffer, Waveform};
use beatbrains::chunker::chunk;
use beatbrains::mixer::mix_tracks;
use beatbrains::normalization::clean_text;
use beatbrains::resample::resample;

fn tone(len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / sample_rate as f32).sin() * 0.5)
        .collect()
}

/// Benchmark text cleaning
fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");

    let texts = vec![
        ("short", "Hello world!".to_string()),
        (
            "symbols",
            "Dr. Smith has 5 patients @ 3:00 PM; price is $100.50 & rising #blessed".to_string(),
        ),
        ("max_length", "La la la, sing along! ".repeat(30)),
    ];

    for (name, text) in &texts {
        group.bench_with_input(BenchmarkId::new("clean_text", name), text, |b, text| {
            b.iter(|| clean_text(black_box(text), 500));
        });
    }

    group.finish();
}

/// Benchmark chunking
fn bench_chunker(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunker");

    let long = "The quick brown fox jumps over the lazy dog. \
                This is a longer paragraph with multiple sentences. \
                Each sentence should be processed correctly. \
                The chunker should handle this well. \
                We want to test performance with various lengths."
        .repeat(2);
    let run_on = "and then we kept walking ".repeat(20);

    for &max_segment in &[60usize, 120] {
        group.bench_function(format!("sentences/max_{}", max_segment), |b| {
            b.iter(|| chunk(black_box(&long), 500, max_segment));
        });
        group.bench_function(format!("run_on/max_{}", max_segment), |b| {
            b.iter(|| chunk(black_box(&run_on), 500, max_segment));
        });
    }

    group.finish();
}

/// Benchmark audio assembly, resampling and mixing
fn bench_audio(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio");

    let buffers: Vec<SampleBuffer> = (0..5)
        .map(|_| SampleBuffer::new(tone(24000 * 4, 24000), 24000))
        .collect();
    group.throughput(Throughput::Elements(24000 * 20));
    group.bench_function("assemble_20s", |b| {
        b.iter(|| assemble(black_box(&buffers)).unwrap());
    });

    let clip = AudioClip::new(tone(24000 * 5, 24000), 24000, 1);
    group.throughput(Throughput::Elements(24000 * 5));
    group.bench_function("resample_24k_to_44k_5s", |b| {
        b.iter(|| resample(black_box(&clip), 44100).unwrap());
    });

    let vocal = Waveform::new(
        tone(44100 * 10, 44100)
            .iter()
            .map(|&s| (s * 32767.0) as i16)
            .collect(),
        44100,
    );
    let stereo: Vec<f32> = tone(44100 * 4, 44100)
        .iter()
        .flat_map(|&s| [s, s])
        .collect();
    let backing = AudioClip::new(stereo, 44100, 2);
    group.throughput(Throughput::Elements(44100 * 10));
    group.bench_function("mix_10s_over_4s_loop", |b| {
        b.iter(|| mix_tracks(black_box(&vocal), Some(black_box(&backing))).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_normalization, bench_chunker, bench_audio);

criterion_main!(benches);
