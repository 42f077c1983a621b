//! Folder create, recursive rename, recursive delete and single-key delete.
//!
//! The store has no multi-key transactions. Rename and delete are sequences
//! of independent calls; when one fails the remaining steps for that subtree
//! are skipped and whatever already happened stays in place. The returned
//! reports say exactly which keys moved or were deleted.

use super::{HierarchyConfig, listing, paths};
use crate::{
    errors::{HierarchyError, HierarchyResult},
    models::{
        records::FolderRecord,
        report::{DeleteReport, KeyFailure, MoveReport, MovedKey, PartialReport},
    },
    services::object_store::ObjectStore,
};
use bytes::Bytes;
use futures::{StreamExt, future::BoxFuture, stream};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Content type written on zero-byte folder markers.
pub const MARKER_CONTENT_TYPE: &str = "application/x-directory";

/// Write the zero-byte marker for `parent/name/`. Re-creating an existing
/// folder succeeds.
pub async fn create_folder(
    store: &dyn ObjectStore,
    parent: &str,
    name: &str,
) -> HierarchyResult<FolderRecord> {
    let path = paths::child_folder(parent, name);
    store
        .put(&path, Bytes::new(), MARKER_CONTENT_TYPE, None)
        .await?;
    info!("created folder marker {}", path);
    Ok(FolderRecord::from_path(path))
}

/// Rename the folder at `old_path` to `new_name` under the same parent.
///
/// On success the report lists every moved file. On failure after the store
/// was touched, the error is `PartialFailure` carrying the same report; if
/// nothing had been written yet the original error is returned as is.
pub async fn rename_folder(
    store: &dyn ObjectStore,
    config: &HierarchyConfig,
    old_path: &str,
    new_name: &str,
) -> HierarchyResult<MoveReport> {
    if old_path.is_empty() {
        return Err(HierarchyError::invalid_path(old_path, "the root folder cannot be renamed"));
    }
    let new_path = paths::sibling_folder(old_path, new_name);
    let mut report = MoveReport::new(old_path, new_path.as_str());
    if new_path == old_path {
        return Ok(report);
    }

    info!("renaming folder {} -> {}", old_path, new_path);
    match move_tree(store, config, old_path.to_string(), new_path, &mut report).await {
        Ok(()) => {
            info!("renamed {}: {} files moved", old_path, report.moved.len());
            Ok(report)
        }
        Err(err) if report.moved.is_empty() && report.created.is_empty() => Err(err),
        Err(err) => {
            warn!(
                "rename of {} stopped after {} moves: {}",
                old_path,
                report.moved.len(),
                err
            );
            Err(HierarchyError::partial("rename folder", PartialReport::Move(report)))
        }
    }
}

/// Move one folder level, then recurse into its subfolders.
///
/// Every failure is recorded in `report` before the error is returned.
fn move_tree<'a>(
    store: &'a dyn ObjectStore,
    config: &'a HierarchyConfig,
    old_path: String,
    new_path: String,
    report: &'a mut MoveReport,
) -> BoxFuture<'a, HierarchyResult<()>> {
    Box::pin(async move {
        let record = |report: &mut MoveReport, key: &str, err: &HierarchyError| {
            report.failed.push(KeyFailure::new(key, err));
        };

        let children = match listing::list(store, &old_path, config.url_ttl).await {
            Ok(children) => children,
            Err(err) => {
                record(report, &old_path, &err);
                return Err(err);
            }
        };

        if let Err(err) = store
            .put(&new_path, Bytes::new(), MARKER_CONTENT_TYPE, None)
            .await
        {
            let err = HierarchyError::from(err);
            record(report, &new_path, &err);
            return Err(err);
        }
        report.created.push(new_path.clone());

        // copy must succeed before the source is deleted. After the first
        // failure no further copy is issued; moves already running finish.
        let target = new_path.as_str();
        let halted = AtomicBool::new(false);
        let halted = &halted;
        let moves = stream::iter(children.files.into_iter().map(|file| file.key))
            .map(|from| async move {
                if halted.load(Ordering::Acquire) {
                    return (from, String::new(), None);
                }
                let to = paths::child_key(target, paths::name_of(&from));
                let result = match store.copy(&from, &to).await {
                    Ok(()) => store.delete(&from).await,
                    Err(err) => Err(err),
                };
                if result.is_err() {
                    halted.store(true, Ordering::Release);
                }
                (from, to, Some(result))
            })
            .buffer_unordered(config.move_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut first_error = None;
        let mut skipped = 0usize;
        for (from, to, result) in moves {
            match result {
                None => skipped += 1,
                Some(Ok(())) => {
                    debug!("moved {} -> {}", from, to);
                    report.moved.push(MovedKey { from, to });
                }
                Some(Err(err)) => {
                    let err = HierarchyError::from(err);
                    record(report, &from, &err);
                    first_error.get_or_insert(err);
                }
            }
        }
        if skipped > 0 {
            warn!("{} files left in {} after a failed move", skipped, old_path);
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        for folder in children.folders {
            let child_target = paths::child_folder(&new_path, &folder.name);
            move_tree(store, config, folder.path, child_target, report).await?;
        }

        if let Err(err) = store.delete(&old_path).await {
            let err = HierarchyError::from(err);
            record(report, &old_path, &err);
            return Err(err);
        }
        Ok(())
    })
}

/// Delete every key under `prefix`, at any depth.
///
/// The prefix is scanned without a delimiter and walked with continuation
/// tokens; each page is bulk-deleted before the next is fetched. An empty
/// prefix is a no-op.
pub async fn delete_folder(store: &dyn ObjectStore, prefix: &str) -> HierarchyResult<DeleteReport> {
    if prefix.is_empty() {
        return Err(HierarchyError::invalid_path(prefix, "the root folder cannot be deleted"));
    }

    let mut report = DeleteReport::new(prefix);
    let mut token: Option<String> = None;

    loop {
        let page = match store.list_page(prefix, None, token.as_deref()).await {
            Ok(page) => page,
            Err(err) => return Err(abort_delete(report, err.into())),
        };
        report.pages += 1;

        let keys: Vec<String> = page.entries.into_iter().map(|entry| entry.key).collect();
        if !keys.is_empty() {
            let acks = match store.bulk_delete(&keys).await {
                Ok(acks) => acks,
                Err(err) => return Err(abort_delete(report, err.into())),
            };
            for ack in acks {
                match ack.error {
                    None => report.deleted.push(ack.key),
                    Some(reason) => report.failed.push(KeyFailure { key: ack.key, reason }),
                }
            }
            if !report.failed.is_empty() {
                warn!(
                    "delete of {} stopped: {} keys failed",
                    prefix,
                    report.failed.len()
                );
                return Err(HierarchyError::partial("delete folder", PartialReport::Delete(report)));
            }
        }

        let next = listing::advance_token(
            prefix,
            token.as_deref(),
            page.is_truncated,
            page.next_continuation_token,
        );
        match next {
            Ok(Some(next)) => token = Some(next),
            Ok(None) => break,
            Err(err) => return Err(abort_delete(report, err)),
        }
    }

    info!("deleted folder {}: {} keys in {} pages", prefix, report.deleted.len(), report.pages);
    Ok(report)
}

fn abort_delete(mut report: DeleteReport, err: HierarchyError) -> HierarchyError {
    if report.deleted.is_empty() {
        return err;
    }
    warn!("delete of {} aborted after {} keys: {}", report.prefix, report.deleted.len(), err);
    let prefix = report.prefix.clone();
    report.failed.push(KeyFailure::new(prefix, &err));
    HierarchyError::partial("delete folder", PartialReport::Delete(report))
}

/// Delete one key; a missing key is not an error.
pub async fn delete_object(store: &dyn ObjectStore, key: &str) -> HierarchyResult<()> {
    store.delete(key).await?;
    info!("deleted object {}", key);
    Ok(())
}
