//! End-to-end demo: build an index from inline records and run three
//! detections (exact hit, near duplicate, novel content).
//!
//! Run with `cargo run --example detect_demo`.

use std::error::Error;
use std::sync::Arc;

use vdedup::{build_index, detect, MatchConfig, RawFingerprint, RawReferenceRecord};

fn main() -> Result<(), Box<dyn Error>> {
    let store = serde_json::json!([
        {
            "aweme_id": "7324491091954037038",
            "video_url": "https://www.tiktok.com/@creator/video/7324491091954037038",
            "phash_bits": "0".repeat(64),
            "region": "VN",
            "views": 1_250_000,
        },
        {
            "aweme_id": "7324491091954037100",
            "phash_bits": format!("{}1111", "0".repeat(60)),
            "region": "US",
        },
    ]);
    let records: Vec<RawReferenceRecord> = serde_json::from_value(store)?;
    let index = Arc::new(build_index(records)?);
    let cfg = MatchConfig::default();

    let exact = detect(
        index.clone(),
        Some("https://www.tiktok.com/@creator/video/7324491091954037038"),
        RawFingerprint::Bits("1".repeat(64)),
        cfg,
    )?;
    println!("exact hit      -> duplicate={} distance={}", exact.is_duplicate, exact.hamming_distance);

    let near = detect(
        index.clone(),
        None,
        RawFingerprint::Bits(format!("{}1", "0".repeat(63))),
        cfg,
    )?;
    println!("near duplicate -> duplicate={} distance={}", near.is_duplicate, near.hamming_distance);

    let novel = detect(
        index,
        None,
        RawFingerprint::Bits(format!("1{}", "0".repeat(63))),
        cfg,
    )?;
    println!("novel content  -> duplicate={} distance={}", novel.is_duplicate, novel.hamming_distance);

    Ok(())
}
