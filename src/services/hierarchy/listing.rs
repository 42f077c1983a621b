//! Folder listings built from paged, `/`-delimited store queries.

use super::paths::{self, DELIMITER};
use crate::{
    errors::HierarchyResult,
    models::records::{FolderRecord, Listing, ObjectRecord, media_type_for},
    services::object_store::{ListPage, ObjectStore, StoreEntry, StoreError},
};
use futures::future::try_join_all;
use std::{collections::BTreeSet, time::Duration};

/// Next continuation token, or `None` once the store reports the last page.
///
/// A truncated page that repeats the previous token (or omits one) would
/// loop forever, so it is reported as a store failure instead.
pub(super) fn advance_token(
    prefix: &str,
    previous: Option<&str>,
    page_truncated: bool,
    next: Option<String>,
) -> HierarchyResult<Option<String>> {
    if !page_truncated {
        return Ok(None);
    }
    match next {
        Some(next) if previous != Some(next.as_str()) => Ok(Some(next)),
        _ => Err(StoreError::backend("list", prefix, "continuation token did not advance").into()),
    }
}

/// Fetch every page of a delimited listing, handing each to `visit`.
async fn walk_pages<F>(store: &dyn ObjectStore, prefix: &str, mut visit: F) -> HierarchyResult<()>
where
    F: FnMut(ListPage) -> HierarchyResult<()> + Send,
{
    let mut token: Option<String> = None;
    loop {
        let page = store
            .list_page(prefix, Some(DELIMITER), token.as_deref())
            .await?;
        let (truncated, next) = (page.is_truncated, page.next_continuation_token.clone());
        visit(page)?;

        match advance_token(prefix, token.as_deref(), truncated, next)? {
            Some(next) => token = Some(next),
            None => return Ok(()),
        }
    }
}

fn object_record(
    store: &dyn ObjectStore,
    entry: StoreEntry,
    url_ttl: Duration,
) -> HierarchyResult<ObjectRecord> {
    let url = store.signed_url(&entry.key, url_ttl)?;
    let name = paths::name_of(&entry.key).to_string();
    let media_type = media_type_for(&name);
    Ok(ObjectRecord {
        key: entry.key,
        name,
        last_modified: entry.last_modified,
        size: entry.size,
        url,
        media_type,
    })
}

/// Immediate files and folders under `prefix`.
///
/// The folder's own marker is never reported as a child. File URLs are minted
/// fresh on every call. Any store error discards the pages already fetched.
pub async fn list(
    store: &dyn ObjectStore,
    prefix: &str,
    url_ttl: Duration,
) -> HierarchyResult<Listing> {
    let mut files = Vec::new();
    let mut folders = BTreeSet::new();

    walk_pages(store, prefix, |page| {
        for entry in page.entries {
            if entry.key == prefix || entry.key.ends_with('/') {
                continue;
            }
            files.push(object_record(store, entry, url_ttl)?);
        }
        folders.extend(page.common_prefixes.into_iter().filter(|p| p != prefix));
        Ok(())
    })
    .await?;

    Ok(Listing {
        prefix: prefix.to_string(),
        files,
        folders: folders.into_iter().map(FolderRecord::from_path).collect(),
    })
}

/// Immediate subfolders of `prefix`, without minting any URLs.
pub async fn list_folders(
    store: &dyn ObjectStore,
    prefix: &str,
) -> HierarchyResult<Vec<FolderRecord>> {
    let mut folders = BTreeSet::new();
    walk_pages(store, prefix, |page| {
        folders.extend(page.common_prefixes.into_iter().filter(|p| p != prefix));
        Ok(())
    })
    .await?;
    Ok(folders.into_iter().map(FolderRecord::from_path).collect())
}

/// Every folder up to `depth` levels below `root`, breadth first.
///
/// Each level's folders are listed concurrently. The result is a snapshot
/// and goes stale with the next mutation.
pub async fn folder_tree(
    store: &dyn ObjectStore,
    root: &str,
    depth: usize,
) -> HierarchyResult<Vec<FolderRecord>> {
    let mut tree = Vec::new();
    let mut frontier = vec![root.to_string()];

    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }
        let levels = try_join_all(frontier.iter().map(|path| list_folders(store, path))).await?;
        frontier = levels
            .iter()
            .flatten()
            .map(|folder| folder.path.clone())
            .collect();
        tree.extend(levels.into_iter().flatten());
    }

    Ok(tree)
}
