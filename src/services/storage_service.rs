//! src/services/storage_service.rs
//!
//! StorageService: the flat, S3-like key store the gallery hierarchy is laid
//! over. Metadata lives in SQLite; payloads live on local disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`. There are no directories at
//! this level: folders exist only as zero-byte marker keys or as shared
//! prefixes, and are interpreted by the hierarchy layer.

use crate::{models::{bucket::Bucket, object::Object}, services::object_store::ProgressSender};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ListObjectsParams {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: usize,
}

#[derive(Debug)]
pub struct ListObjectsResult {
    pub objects: Vec<Object>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("region `{0}` is not supported")]
    UnsupportedRegion(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of one key inside a bulk delete.
pub type KeyDeletion = (String, StorageResult<bool>);

/// StorageService provides the raw key operations:
/// - streaming put with byte-level progress
/// - store-side copy
/// - prefix/delimiter listing with continuation tokens
/// - single and bulk soft delete
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const MAX_KEYS_PER_PAGE: usize = 1000;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const SUPPORTED_REGIONS: [&str; 16] = [
    "local",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-northeast-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-2",
    "ap-northeast-3",
    "me-south-1",
];

impl StorageService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Reject empty, oversized, absolute or traversal-looking keys.
    ///
    /// Folder markers (`photos/`) are valid keys.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") || key.contains("//") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    fn ensure_region_valid(&self, region: &str) -> StorageResult<()> {
        if SUPPORTED_REGIONS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(region))
        {
            Ok(())
        } else {
            Err(StorageError::UnsupportedRegion(region.to_string()))
        }
    }

    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(bucket_name);
        path
    }

    /// Two-level shard from MD5(bucket/key), keeping directory fan-out small.
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Payload path for a key. Marker keys end with `/`, so the payload file
    /// gets a fixed leaf name instead of being a directory.
    fn object_path(&self, bucket_name: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.bucket_root(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        match key.strip_suffix('/') {
            Some(folder) => {
                path.push(folder);
                path.push(".marker");
            }
            None => path.push(key),
        }
        path
    }

    async fn fetch_bucket(&self, bucket: &str) -> StorageResult<Bucket> {
        validate_bucket_name(bucket)?;
        sqlx::query_as::<sqlx::sqlite::Sqlite, Bucket>(
            "SELECT id, name, owner_id, region, created_at, versioning_enabled
             FROM buckets WHERE name = ?",
        )
        .bind(bucket)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::BucketNotFound(bucket.to_string()),
            other => StorageError::Sqlx(other),
        })
    }

    async fn find_object(&self, bucket: &Bucket, key: &str) -> StorageResult<Option<Object>> {
        let row = sqlx::query_as::<_, Object>(
            "SELECT id, bucket_id, key, filename, content_type, size_bytes, etag,
                    storage_class, last_modified, version_id, is_deleted
             FROM objects
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn fetch_object(&self, bucket: &Bucket, key: &str) -> StorageResult<Object> {
        self.find_object(bucket, key)
            .await?
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            })
    }

    /// Stream-upload an object to disk and upsert its metadata row.
    ///
    /// Bytes go to a temp file which is fsynced and renamed into place; the
    /// temp file is removed on any error. When `progress` is set, the running
    /// byte count is sent after each chunk is written.
    pub async fn upload_object_stream<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        stream: S,
        progress: Option<ProgressSender>,
    ) -> StorageResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
            if let Some(tx) = &progress {
                // receiver gone just means nobody is watching
                let _ = tx.send(size_bytes as u64);
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        let filename = key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(key)
            .to_string();
        let last_modified = Utc::now();
        let etag = format!("{:x}", digest.compute());

        let insert_result = sqlx::query_as::<_, Object>(
            r#"
            INSERT INTO objects (
                id, bucket_id, key, filename, content_type, size_bytes,
                etag, storage_class, last_modified, version_id, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(bucket_id, key) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                storage_class = excluded.storage_class,
                last_modified = excluded.last_modified,
                version_id = excluded.version_id,
                is_deleted = 0
            RETURNING id, bucket_id, key, filename, content_type, size_bytes,
                      etag, storage_class, last_modified, version_id, is_deleted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bucket_rec.id)
        .bind(key)
        .bind(&filename)
        .bind(content_type.clone())
        .bind(size_bytes)
        .bind(&etag)
        .bind("STANDARD")
        .bind(last_modified)
        .bind::<Option<String>>(None)
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(obj) => Ok(obj),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StorageError::Sqlx(err))
            }
        }
    }

    /// Copy `source_key` to `dest_key` inside one bucket.
    ///
    /// The payload is streamed disk-to-disk through the normal upload path,
    /// so the destination gets its own atomic write and metadata row.
    pub async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> StorageResult<Object> {
        self.ensure_key_safe(source_key)?;
        self.ensure_key_safe(dest_key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let source = self.fetch_object(&bucket_rec, source_key).await?;

        let source_path = self.object_path(&bucket_rec.name, source_key);
        let file = File::open(&source_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: source_key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        debug!("copying {} -> {} in bucket {}", source_key, dest_key, bucket);
        self.upload_object_stream(
            bucket,
            dest_key,
            source.content_type.clone(),
            ReaderStream::new(file),
            None,
        )
        .await
    }

    /// Metadata plus an open payload handle, for streaming downloads.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(Object, File)> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    /// List objects following S3 ListObjectsV2 rules.
    ///
    /// Keys are returned in ascending order and `max_keys` bounds keys plus
    /// common prefixes. With a delimiter, keys with a further delimiter after
    /// the prefix are folded into `common_prefixes`; each prefix counts once
    /// and the scan resumes after the last key it covers. The continuation
    /// token is the last key or common prefix returned.
    pub async fn list_objects_v2(
        &self,
        bucket: &str,
        params: ListObjectsParams,
    ) -> StorageResult<ListObjectsResult> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let max_keys = params.max_keys.clamp(1, MAX_KEYS_PER_PAGE);
        let prefix = params.prefix.as_deref().filter(|p| !p.is_empty());
        let delimiter = params.delimiter.as_deref().filter(|d| !d.is_empty());

        let mut after = params.continuation_token.clone();
        // a token naming a common prefix resumes past that whole subtree
        let mut skip = match (delimiter, after.as_deref()) {
            (Some(delim), Some(token))
                if compute_common_prefix(token, prefix, delim).as_deref() == Some(token) =>
            {
                Some(token.to_string())
            }
            _ => None,
        };

        let mut contents = Vec::new();
        let mut common_prefixes = Vec::new();
        let mut is_truncated = false;

        'scan: loop {
            let wanted = max_keys + 1 - (contents.len() + common_prefixes.len());
            let rows = self
                .fetch_listing_rows(&bucket_rec, prefix, after.as_deref(), skip.as_deref(), wanted)
                .await?;
            let exhausted = rows.len() < wanted;

            for obj in rows {
                if contents.len() + common_prefixes.len() == max_keys {
                    is_truncated = true;
                    break 'scan;
                }
                if let Some(delim) = delimiter {
                    if let Some(grouped) = compute_common_prefix(&obj.key, prefix, delim) {
                        common_prefixes.push(grouped.clone());
                        after = Some(grouped.clone());
                        skip = Some(grouped);
                        continue 'scan;
                    }
                }
                after = Some(obj.key.clone());
                contents.push(obj);
            }

            if exhausted {
                break;
            }
        }

        Ok(ListObjectsResult {
            objects: contents,
            common_prefixes,
            is_truncated,
            next_continuation_token: if is_truncated { after } else { None },
        })
    }

    /// Live rows under `prefix`, strictly after `after`, excluding keys that
    /// start with `skip`.
    async fn fetch_listing_rows(
        &self,
        bucket_rec: &Bucket,
        prefix: Option<&str>,
        after: Option<&str>,
        skip: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Object>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, bucket_id, key, filename, content_type, size_bytes, etag, \
             storage_class, last_modified, version_id, is_deleted \
             FROM objects WHERE bucket_id = ",
        );
        builder.push_bind(bucket_rec.id);
        builder.push(" AND is_deleted = 0");

        // LIKE is case-insensitive in SQLite and treats `%`/`_` as wildcards,
        // so prefixes are matched exactly with substr.
        if let Some(prefix) = prefix {
            builder.push(" AND substr(key, 1, length(");
            builder.push_bind(prefix.to_string());
            builder.push(")) = ");
            builder.push_bind(prefix.to_string());
        }

        if let Some(after) = after {
            builder.push(" AND key > ");
            builder.push_bind(after.to_string());
        }

        if let Some(skip) = skip {
            builder.push(" AND substr(key, 1, length(");
            builder.push_bind(skip.to_string());
            builder.push(")) <> ");
            builder.push_bind(skip.to_string());
        }

        builder.push(" ORDER BY key ASC LIMIT ");
        builder.push_bind(limit as i64);

        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    /// Soft-delete one object and remove its payload.
    ///
    /// Returns `None` when the key did not exist; deleting a missing key is
    /// not an error.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<Option<Object>> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.delete_in_bucket(&bucket_rec, key).await
    }

    /// Delete many keys. The bucket lookup failing fails the whole call;
    /// everything else is reported per key.
    pub async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> StorageResult<Vec<KeyDeletion>> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let outcome = match self.ensure_key_safe(key) {
                Ok(()) => self
                    .delete_in_bucket(&bucket_rec, key)
                    .await
                    .map(|deleted| deleted.is_some()),
                Err(err) => Err(err),
            };
            results.push((key.clone(), outcome));
        }
        Ok(results)
    }

    async fn delete_in_bucket(
        &self,
        bucket_rec: &Bucket,
        key: &str,
    ) -> StorageResult<Option<Object>> {
        let Some(object) = self.find_object(bucket_rec, key).await? else {
            debug!("delete of missing key {} in bucket {}", key, bucket_rec.name);
            return Ok(None);
        };

        let result = sqlx::query(
            "UPDATE objects SET is_deleted = 1 \
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0",
        )
        .bind(key)
        .bind(bucket_rec.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let file_path = self.object_path(&bucket_rec.name, key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(&bucket_rec.name);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        Ok(Some(object))
    }

    /// Create a bucket and its payload directory.
    pub async fn create_bucket(&self, name: &str, region: String) -> StorageResult<Bucket> {
        validate_bucket_name(name)?;
        let normalized_region = region.to_lowercase();
        self.ensure_region_valid(&normalized_region)?;
        let bucket_root = self.bucket_root(name);
        fs::create_dir_all(&bucket_root).await?;

        let bucket = Bucket::new(name, normalized_region);

        match sqlx::query(
            "INSERT INTO buckets (id, name, owner_id, region, created_at, versioning_enabled)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(bucket.id)
        .bind(&bucket.name)
        .bind(bucket.owner_id)
        .bind(&bucket.region)
        .bind(bucket.created_at)
        .bind(bucket.versioning_enabled)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(bucket),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::BucketAlreadyExists(name.to_string()))
            }
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    /// Return the named bucket, creating it when absent.
    pub async fn ensure_bucket(&self, name: &str, region: &str) -> StorageResult<Bucket> {
        match self.fetch_bucket(name).await {
            Ok(bucket) => Ok(bucket),
            Err(StorageError::BucketNotFound(_)) => {
                match self.create_bucket(name, region.to_string()).await {
                    Ok(bucket) => {
                        tracing::info!("Created bucket {} ({})", bucket.name, bucket.region);
                        Ok(bucket)
                    }
                    Err(StorageError::BucketAlreadyExists(_)) => self.fetch_bucket(name).await,
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Readiness: `SELECT 1` against the pool.
    pub async fn check_database(&self) -> Result<(), String> {
        match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
        {
            Ok(1) => Ok(()),
            Ok(v) => Err(format!("unexpected result: {}", v)),
            Err(e) => Err(format!("error: {}", e)),
        }
    }

    /// Readiness: write, read back and remove a scratch file under `base_path`.
    pub async fn check_disk(&self) -> Result<(), String> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;

        let read = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match read {
            Ok(bytes) if bytes == b"readyz" => Ok(()),
            Ok(_) => Err("file content mismatch".to_string()),
            Err(e) => Err(format!("could not read tmp file: {}", e)),
        }
    }

    /// Remove empty directories from `start` up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

/// Validate a bucket name against S3-like rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - starts and ends with a letter or digit
/// - no consecutive dots or dot-hyphen pairs
/// - not shaped like an IPv4 address
pub fn validate_bucket_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim() != name {
        return Err(invalid("cannot begin or end with whitespace"));
    }

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Compute the grouped "common prefix" a key folds into, if any.
///
/// Returns `Some(prefix + segment + delimiter)` when the key has another
/// delimiter after `requested_prefix`, otherwise `None`.
fn compute_common_prefix(
    key: &str,
    requested_prefix: Option<&str>,
    delimiter: &str,
) -> Option<String> {
    let prefix = requested_prefix.unwrap_or("");
    let after_prefix = key.strip_prefix(prefix)?;

    after_prefix.find(delimiter).map(|pos| {
        let mut combined = String::with_capacity(prefix.len() + pos + delimiter.len());
        combined.push_str(prefix);
        combined.push_str(&after_prefix[..pos + delimiter.len()]);
        combined
    })
}

fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_common_prefix() {
        assert_eq!(
            compute_common_prefix("a/b/c.txt", Some("a/"), "/"),
            Some("a/b/".to_string())
        );
        assert_eq!(compute_common_prefix("a/c.txt", Some("a/"), "/"), None);
        assert_eq!(compute_common_prefix("a/", Some("a/"), "/"), None);
        assert_eq!(
            compute_common_prefix("docs/", None, "/"),
            Some("docs/".to_string())
        );
        assert_eq!(compute_common_prefix("b/x", Some("a/"), "/"), None);
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("gallery").is_ok());
        assert!(validate_bucket_name("my.photos-2025").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Gallery").is_err());
        assert!(validate_bucket_name("-gallery").is_err());
        assert!(validate_bucket_name("a..b").is_err());
        assert!(validate_bucket_name("192.168.1.1").is_err());
        assert!(validate_bucket_name(" gallery").is_err());
    }

    #[tokio::test]
    async fn test_object_path_for_marker_and_file() {
        let db = Arc::new(SqlitePool::connect_lazy("sqlite::memory:").unwrap());
        let service = StorageService::new(db, "/data");
        let marker = service.object_path("gallery", "docs/");
        assert!(marker.ends_with("docs/.marker"));
        let file = service.object_path("gallery", "docs/a.txt");
        assert!(file.ends_with("docs/a.txt"));
    }
}
