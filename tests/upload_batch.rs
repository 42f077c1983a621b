//! Batch uploads: progress, partial failure and image downscaling.

mod common;

use common::{FailOn, FlakyStore, TestEnv};
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use object_gallery::{
    Blob, BatchStatus, HierarchyConfig, HierarchyError, ProgressEvent,
    models::report::UploadOutcome, services::image_resize::ResizeOptions,
};
use std::{collections::BTreeMap, io::Cursor};

fn png(width: u32, height: u32) -> Vec<u8> {
    let pixel = image::Rgb([10, 120, 200]);
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, pixel));
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let env = TestEnv::new().await;
    let manager = env.manager();

    let blobs = vec![
        Blob::new("large.bin", "application/octet-stream", vec![3u8; 300 * 1024]),
        Blob::new("small.txt", "text/plain", "tiny"),
        Blob::new("empty.txt", "text/plain", Vec::<u8>::new()),
    ];

    let mut events: Vec<ProgressEvent> = Vec::new();
    let refreshed = manager
        .upload(blobs, "inbox/", |event| events.push(event))
        .await
        .unwrap();
    assert_eq!(refreshed.outcome.status(), BatchStatus::Complete);
    assert_eq!(refreshed.listing.files.len(), 3);

    let mut per_file: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
    for event in &events {
        per_file.entry(event.index).or_default().push(event.percent);
    }
    assert_eq!(per_file.len(), 3);
    for percents in per_file.values() {
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
        assert_eq!(percents.last(), Some(&100));
    }
    // the 300 KiB file is written in several chunks
    assert!(per_file[&0].len() > 2);
}

#[tokio::test]
async fn test_single_upload_progress() {
    let env = TestEnv::new().await;
    let manager = env.manager();

    let mut seen = Vec::new();
    let refreshed = manager
        .upload_file(Blob::guessed("song.mp3", vec![0u8; 200 * 1024]), "music", |p| seen.push(p))
        .await
        .unwrap();
    assert_eq!(refreshed.outcome.key, "music/song.mp3");
    assert_eq!(refreshed.outcome.content_type, "audio/mp3");
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_batch_with_rejected_file_keeps_the_rest() {
    let env = TestEnv::new().await;
    let flaky = FlakyStore::new(env.store(1000), FailOn::Put, "reject.txt");
    let manager = env.manager_with(flaky, HierarchyConfig::default());

    let blobs = vec![
        Blob::new("one.txt", "text/plain", "1"),
        Blob::new("reject.txt", "text/plain", "2"),
        Blob::new("three.txt", "text/plain", "3"),
    ];
    let refreshed = manager.upload(blobs, "mixed/", |_| {}).await.unwrap();
    let report = refreshed.outcome;

    assert_eq!(report.status(), BatchStatus::Partial);
    assert_eq!(report.stored().count(), 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "reject.txt");
    assert!(!failures[0].reason.is_empty());

    // outcomes come back in submission order
    let names: Vec<_> = report.outcomes.iter().map(UploadOutcome::name).collect();
    assert_eq!(names, ["one.txt", "reject.txt", "three.txt"]);

    let mut keys = env.keys_under("mixed/").await;
    keys.sort();
    assert_eq!(keys, ["mixed/one.txt", "mixed/three.txt"]);
    assert_eq!(refreshed.listing.files.len(), 2);

    assert!(matches!(
        report.into_result(),
        Err(HierarchyError::PartialFailure { .. })
    ));
}

#[tokio::test]
async fn test_invalid_file_name_fails_only_that_file() {
    let env = TestEnv::new().await;
    let manager = env.manager();

    let blobs = vec![
        Blob::new("..", "text/plain", "x"),
        Blob::new("fine.txt", "text/plain", "y"),
    ];
    let report = manager.upload(blobs, "", |_| {}).await.unwrap().outcome;
    assert_eq!(report.status(), BatchStatus::Partial);
    assert!(!report.outcomes[0].is_stored());
    assert!(report.outcomes[1].is_stored());
}

#[tokio::test]
async fn test_large_image_is_downscaled() {
    let env = TestEnv::new().await;
    let config = HierarchyConfig {
        resize: Some(ResizeOptions {
            max_width: 100,
            max_height: 100,
            quality: 85,
        }),
        ..HierarchyConfig::default()
    };
    let manager = env.manager_with(env.store(1000), config);

    let blobs = vec![
        Blob::guessed("wide.png", png(400, 200)),
        Blob::guessed("small.png", png(40, 30)),
    ];
    let report = manager.upload(blobs, "pics/", |_| {}).await.unwrap().outcome;
    let receipts: Vec<_> = report.stored().collect();
    assert_eq!(receipts.len(), 2);

    assert!(receipts[0].resized);
    let stored = image::load_from_memory(&env.read("pics/wide.png").await).unwrap();
    assert_eq!(stored.dimensions(), (100, 50));

    assert!(!receipts[1].resized);
    assert_eq!(env.read("pics/small.png").await, png(40, 30));
}

#[tokio::test]
async fn test_unreadable_image_is_uploaded_unchanged() {
    let env = TestEnv::new().await;
    let manager = env.manager();

    let garbage = b"definitely not a png".to_vec();
    let refreshed = manager
        .upload_file(Blob::new("broken.png", "image/png", garbage.clone()), "pics/", |_| {})
        .await
        .unwrap();
    assert!(!refreshed.outcome.resized);
    assert_eq!(refreshed.outcome.size, garbage.len() as u64);
    assert_eq!(env.read("pics/broken.png").await, garbage);
}
