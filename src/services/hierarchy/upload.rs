//! Upload pipeline: best-effort image downscale, then a put with progress.
//!
//! Batches fan out concurrently. Every file owns its progress channel; the
//! batch coordinator is the only place that merges them, so no progress state
//! is shared between upload tasks.

use super::{HierarchyConfig, paths};
use crate::{
    errors::HierarchyResult,
    models::{
        blob::{Blob, UploadReceipt},
        report::{BatchReport, UploadFailure, UploadOutcome},
    },
    services::{image_resize, object_store::ObjectStore},
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Progress of one file inside a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Position of the file in the submitted batch.
    pub index: usize,
    pub name: String,
    pub percent: u8,
}

/// Turns acknowledged byte counts into non-decreasing percentages.
///
/// In-flight values stop at 99; 100 is only reported once the store has
/// accepted the whole object.
#[derive(Debug)]
struct ProgressMeter {
    total: u64,
    last: Option<u8>,
}

impl ProgressMeter {
    fn new(total: u64) -> Self {
        Self { total, last: None }
    }

    fn observe(&mut self, written: u64) -> Option<u8> {
        let percent = if self.total == 0 {
            0
        } else {
            (written.min(self.total) * 100 / self.total) as u8
        };
        self.report(percent.min(99))
    }

    fn finish(&mut self) -> Option<u8> {
        self.report(100)
    }

    fn report(&mut self, percent: u8) -> Option<u8> {
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }
}

/// Downscale image blobs that exceed the configured box. Any failure keeps
/// the original bytes; the upload proceeds either way.
async fn prepare(blob: Blob, config: &HierarchyConfig) -> (Blob, bool) {
    let Some(options) = config.resize else {
        return (blob, false);
    };
    if !blob.is_image() {
        return (blob, false);
    }

    let bytes = blob.bytes.clone();
    let media_type = blob.content_type.clone();
    let resized =
        tokio::task::spawn_blocking(move || image_resize::resize(&bytes, &media_type, options))
            .await;

    match resized {
        Ok(Ok(Some(out))) => {
            debug!("resized {} from {} to {} bytes", blob.name, blob.len(), out.len());
            (
                Blob {
                    bytes: Bytes::from(out),
                    ..blob
                },
                true,
            )
        }
        Ok(Ok(None)) => (blob, false),
        Ok(Err(err)) => {
            warn!("resize of {} failed, uploading original: {}", blob.name, err);
            (blob, false)
        }
        Err(err) => {
            warn!("resize task for {} aborted, uploading original: {}", blob.name, err);
            (blob, false)
        }
    }
}

/// Upload one blob into `destination`, reporting percentages to `on_progress`.
pub async fn upload_one<F>(
    store: &dyn ObjectStore,
    config: &HierarchyConfig,
    blob: Blob,
    destination: &str,
    mut on_progress: F,
) -> HierarchyResult<UploadReceipt>
where
    F: FnMut(u8) + Send,
{
    paths::validate_name(&blob.name)?;
    let name = blob.name.clone();
    let (blob, resized) = prepare(blob, config).await;
    let key = paths::child_key(destination, &blob.name);

    let mut meter = ProgressMeter::new(blob.len() as u64);
    if let Some(percent) = meter.observe(0) {
        on_progress(percent);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let put = store.put(&key, blob.bytes.clone(), &blob.content_type, Some(tx));
    let drain = async {
        while let Some(written) = rx.recv().await {
            if let Some(percent) = meter.observe(written) {
                on_progress(percent);
            }
        }
    };
    let (ack, ()) = tokio::join!(put, drain);
    let ack = ack?;

    if let Some(percent) = meter.finish() {
        on_progress(percent);
    }
    let location = store.signed_url(&ack.key, config.url_ttl)?;
    debug!("stored {} ({} bytes)", ack.key, ack.size);

    Ok(UploadReceipt {
        name,
        key: ack.key,
        size: ack.size,
        content_type: blob.content_type,
        resized,
        location,
    })
}

/// Upload every blob concurrently and wait for all of them.
///
/// Failures never stop the other uploads and successes are never rolled
/// back. Outcomes are returned in submission order.
pub async fn upload_batch<F>(
    store: &dyn ObjectStore,
    config: &HierarchyConfig,
    blobs: Vec<Blob>,
    destination: &str,
    mut on_progress: F,
) -> BatchReport
where
    F: FnMut(ProgressEvent) + Send,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();

    let uploads = async move {
        stream::iter(blobs.into_iter().enumerate())
            .map(move |(index, blob)| {
                let tx = tx.clone();
                async move {
                    let name = blob.name.clone();
                    let label = name.clone();
                    let result = upload_one(store, config, blob, destination, move |percent| {
                        let _ = tx.send(ProgressEvent {
                            index,
                            name: label.clone(),
                            percent,
                        });
                    })
                    .await;
                    (index, name, result)
                }
            })
            .buffer_unordered(config.upload_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
    };
    let drain = async {
        while let Some(event) = rx.recv().await {
            on_progress(event);
        }
    };
    let (mut results, ()) = tokio::join!(uploads, drain);

    results.sort_by_key(|(index, _, _)| *index);
    let outcomes = results
        .into_iter()
        .map(|(_, name, result)| match result {
            Ok(receipt) => UploadOutcome::Stored(receipt),
            Err(err) => {
                warn!("upload of {} failed: {}", name, err);
                UploadOutcome::Failed(UploadFailure {
                    name,
                    reason: err.to_string(),
                })
            }
        })
        .collect();

    BatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_is_monotonic_and_capped() {
        let mut meter = ProgressMeter::new(200);
        assert_eq!(meter.observe(0), Some(0));
        assert_eq!(meter.observe(0), None);
        assert_eq!(meter.observe(100), Some(50));
        assert_eq!(meter.observe(50), None);
        assert_eq!(meter.observe(200), Some(99));
        assert_eq!(meter.finish(), Some(100));
        assert_eq!(meter.finish(), None);
    }

    #[test]
    fn test_meter_empty_payload() {
        let mut meter = ProgressMeter::new(0);
        assert_eq!(meter.observe(0), Some(0));
        assert_eq!(meter.finish(), Some(100));
    }
}
