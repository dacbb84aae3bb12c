use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use deltapack::codec::{DeltaCodec, GDelta};
use deltapack::envelope::{self, EnvelopeOptions};
use deltapack::pipeline::{self, PipelineOptions};
use std::fs;
use std::path::Path;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn opts(level: i32) -> PipelineOptions {
    PipelineOptions {
        envelope: EnvelopeOptions {
            level,
            checksum: true,
        },
        ..Default::default()
    }
}

fn write_ratio_snapshot() {
    let old = gen_data(2 * 1024 * 1024, 123);
    let new = mutate(&old, 4096);
    let mut csv = String::from("level,delta_bytes,artifact_bytes,new_bytes,ratio\n");
    for level in [1, 3, 9, 15, 19, 22] {
        let (_, stats) = pipeline::diff_bytes(&old, &new, &opts(level)).unwrap();
        csv.push_str(&format!(
            "{level},{},{},{},{}\n",
            stats.delta_size,
            stats.artifact_size,
            stats.new_size,
            stats.savings()
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_codec_encode(c: &mut Criterion) {
    let mut g = c.benchmark_group("codec_encode_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let old = gen_data(size, 1);
        let new = mutate(&old, 1024);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let delta = GDelta.encode(black_box(&new), black_box(&old)).unwrap();
                black_box(delta);
            });
        });
    }
    g.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut g = c.benchmark_group("envelope_roundtrip");
    let old = gen_data(1024 * 1024, 2);
    let delta = GDelta.encode(&mutate(&old, 512), &old).unwrap();
    g.throughput(Throughput::Bytes(delta.len() as u64));
    for level in [3, 19, 22] {
        let env = EnvelopeOptions {
            level,
            checksum: true,
        };
        g.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| {
                let frame = envelope::compress(black_box(&delta), &env).unwrap();
                let raw = envelope::decompress(&frame).unwrap();
                black_box(raw);
            });
        });
    }
    g.finish();
}

fn bench_patch_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("patch_speed_vs_size");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let old = gen_data(size, 3);
        let new = mutate(&old, 2048);
        let (artifact, _) = pipeline::diff_bytes(&old, &new, &opts(22)).unwrap();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let (out, _) =
                    pipeline::patch_bytes(black_box(&old), black_box(&artifact), &opts(22))
                        .unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_diff_vs_level(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("diff_vs_level");
    let old = gen_data(1024 * 1024, 4);
    let new = mutate(&old, 4096);
    for level in [1, 9, 19, 22] {
        let o = opts(level);
        g.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| {
                let (artifact, _) = pipeline::diff_bytes(&old, &new, &o).unwrap();
                black_box(artifact);
            });
        });
    }
    g.finish();
}

fn bench_real_world_scenarios(c: &mut Criterion) {
    let mut g = c.benchmark_group("real_world_scenarios");
    let scenarios = [
        ("software_update", 4 * 1024 * 1024usize, 1024usize),
        ("document_versioning", 512 * 1024usize, 256usize),
        ("database_snapshot", 8 * 1024 * 1024usize, 4096usize),
    ];

    let o = opts(19);
    for (name, size, stride) in scenarios {
        let old = gen_data(size, size as u64);
        let new = mutate(&old, stride);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_function(name, |b| {
            b.iter(|| {
                let (artifact, _) = pipeline::diff_bytes(&old, &new, &o).unwrap();
                let (out, _) = pipeline::patch_bytes(&old, &artifact, &o).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_codec_encode,
    bench_envelope,
    bench_patch_speed,
    bench_diff_vs_level,
    bench_real_world_scenarios
);
criterion_main!(benches);
