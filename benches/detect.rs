use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use vdedup::{
    DetectRequest, Detector, DuplicateDetector, Fingerprint, MatchConfig, RawFingerprint,
    RawReferenceRecord, ReferenceIndex,
};

fn synthetic_records(n: usize) -> Vec<RawReferenceRecord> {
    (0..n)
        .map(|i| {
            // Spread items across buckets with a cheap deterministic mix.
            let word = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            let row = serde_json::json!({
                "video_id": format!("video-{i}"),
                "phash_bits": Fingerprint::from_u64(word).as_bits(),
            });
            serde_json::from_value(row).expect("record deserializes")
        })
        .collect()
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    for &n in &[1_000usize, 10_000] {
        let index = Arc::new(ReferenceIndex::load(synthetic_records(n)).expect("index loads"));
        let detector = DuplicateDetector::with_index_arc(index);
        let query = RawFingerprint::Bits(Fingerprint::from_u64(0xDEAD_BEEF).as_bits().to_string());

        group.bench_with_input(BenchmarkId::new("prefiltered", n), &n, |b, _| {
            let req = DetectRequest {
                query_id: None,
                fingerprint: Some(query.clone()),
                config: MatchConfig::default(),
            };
            b.iter(|| detector.detect(&req).expect("detect succeeds"));
        });

        group.bench_with_input(BenchmarkId::new("full_scan", n), &n, |b, _| {
            let req = DetectRequest {
                query_id: None,
                fingerprint: Some(query.clone()),
                config: MatchConfig {
                    prefix_length: 0,
                    ..MatchConfig::default()
                },
            };
            b.iter(|| detector.detect(&req).expect("detect succeeds"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
