//! High-level pipeline: diff local file-maps against a bucket and reconcile.
//!
//! This module implements the bucket synchronisation engine:
//!   - Builds file-maps (storage key to local file) from a directory walk
//!   - Diffs local content hashes against the remote listing into a [`SyncPlan`]
//!   - Applies the plan through [`ObjectStore`]: uploads first, then deletes
//!   - Aggregates and returns a [`SyncReport`] of what changed for downstream audit
//!
//! # Diff rules
//! - A key absent remotely is uploaded.
//! - A key whose remote hash differs from the local hash (or is missing) is
//!   uploaded, overwriting the remote object.
//! - A key with an equal remote hash is left untouched.
//! - A remote key with no local counterpart is deleted only when pruning was
//!   requested; otherwise it is retained and counted.
//!
//! # Dry runs
//! With `dry_run` set, the plan is computed and returned in the report but no
//! store mutation happens.
//!
//! # Error Handling
//! Fail-fast: the first failing read, upload or delete aborts the run with a
//! [`SyncError`]; callers should log and surface these to users/test logs.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::contract::{NewObject, ObjectStore};

/// A mapping from a storage key to the local file that backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMap {
    /// Bucket-relative key, `/`-separated.
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("duplicate file-map key {0:?}")]
    DuplicateKey(String),
    #[error("file-map path is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("object store request failed: {0}")]
    Store(String),
}

/// Caller-facing switches for one synchronisation run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Delete remote keys with no local counterpart.
    pub prune: bool,
    /// Plan only; mutate nothing.
    pub dry_run: bool,
}

/// One upload the plan calls for.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUpload {
    pub key: String,
    pub path: PathBuf,
    pub content_hash: String,
    pub size: u64,
}

/// The reconciliation a run would perform, before any mutation.
#[derive(Debug, Serialize)]
pub struct SyncPlan {
    pub uploads: Vec<PlannedUpload>,
    pub deletes: Vec<String>,
    pub unchanged: usize,
    /// Remote-only keys kept because pruning was not requested.
    pub retained: usize,
}

/// What a completed run did (or, for a dry run, would have done).
#[derive(Debug)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
    pub retained: usize,
    pub dry_run: bool,
}

/// Lowercase hex SHA-256 of `bytes`; the content identity used for diffing.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Walks `dir` recursively and produces one file-map per regular file, sorted
/// by key. Keys are `/`-separated paths relative to `dir`. The `.git`
/// directory is skipped.
pub fn dir_to_file_maps(dir: &Path) -> Result<Vec<FileMap>, SyncError> {
    fn visit_dir(dir: &Path, base: &Path, results: &mut Vec<FileMap>) -> Result<(), SyncError> {
        for entry_res in fs::read_dir(dir)? {
            let entry = entry_res?;
            let path = entry.path();
            if path.is_dir() {
                let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if file_name == ".git" {
                    debug!(path = %path.display(), "skipping directory");
                    continue;
                }
                visit_dir(&path, base, results)?;
            } else if path.is_file() {
                let rel_path = path.strip_prefix(base).unwrap_or(&path);
                let key = rel_path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.is_empty() {
                    continue;
                }
                results.push(FileMap { key, path });
            }
        }
        Ok(())
    }

    let mut maps = Vec::new();
    visit_dir(dir, dir, &mut maps)?;
    maps.sort_by(|a, b| a.key.cmp(&b.key));
    info!(dir = %dir.display(), files = maps.len(), "built file-maps from directory");
    Ok(maps)
}

/// Content type for a key, guessed from its extension. `None` for unknown
/// extensions, letting the store fall back to its default.
pub fn content_type_for(key: &str) -> Option<&'static str> {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext)?;
    match extension {
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "json" => Some("application/json"),
        "xml" => Some("application/xml"),
        "txt" => Some("text/plain"),
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "ico" => Some("image/x-icon"),
        "webp" => Some("image/webp"),
        "woff" => Some("font/woff"),
        "woff2" => Some("font/woff2"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Diffs `maps` against the remote listing and returns the plan for `options`.
pub async fn plan<S>(
    store: &S,
    maps: &[FileMap],
    options: &SyncOptions,
) -> Result<SyncPlan, SyncError>
where
    S: ObjectStore,
{
    let mut keys: HashSet<&str> = HashSet::new();
    for map in maps {
        if !keys.insert(map.key.as_str()) {
            return Err(SyncError::DuplicateKey(map.key.clone()));
        }
    }

    let remote: BTreeMap<String, Option<String>> = store
        .list_objects()
        .await
        .map_err(|e| SyncError::Store(format!("list_objects: {e}")))?
        .into_iter()
        .map(|object| (object.key, object.content_hash))
        .collect();
    debug!(remote = remote.len(), local = maps.len(), "listed bucket for diff");

    let mut uploads = Vec::new();
    let mut unchanged = 0;
    for map in maps {
        if !map.path.is_file() {
            return Err(SyncError::NotAFile(map.path.clone()));
        }
        let body = fs::read(&map.path)?;
        let local_hash = content_hash(&body);
        match remote.get(&map.key) {
            Some(Some(remote_hash)) if *remote_hash == local_hash => {
                unchanged += 1;
            }
            _ => uploads.push(PlannedUpload {
                key: map.key.clone(),
                path: map.path.clone(),
                content_hash: local_hash,
                size: body.len() as u64,
            }),
        }
    }

    let stale: Vec<String> = remote
        .keys()
        .filter(|key| !keys.contains(key.as_str()))
        .cloned()
        .collect();
    let (deletes, retained) = if options.prune {
        (stale, 0)
    } else {
        (Vec::new(), stale.len())
    };

    Ok(SyncPlan {
        uploads,
        deletes,
        unchanged,
        retained,
    })
}

/// Plans and (unless `dry_run`) applies a synchronisation of `maps` into the
/// store's bucket.
pub async fn sync<S>(
    store: &S,
    maps: &[FileMap],
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    S: ObjectStore,
{
    info!(
        files = maps.len(),
        prune = options.prune,
        dry_run = options.dry_run,
        "starting bucket synchronisation"
    );
    let plan = plan(store, maps, options).await?;
    match serde_json::to_string_pretty(&plan) {
        Ok(json) => debug!(json = %json, "computed sync plan"),
        Err(e) => error!(error = ?e, "failed to serialize sync plan for tracing"),
    }

    if options.dry_run {
        info!(
            uploads = plan.uploads.len(),
            deletes = plan.deletes.len(),
            "dry run, not touching the bucket"
        );
        return Ok(SyncReport {
            uploaded: plan.uploads.into_iter().map(|u| u.key).collect(),
            deleted: plan.deletes,
            unchanged: plan.unchanged,
            retained: plan.retained,
            dry_run: true,
        });
    }

    let mut uploaded = Vec::with_capacity(plan.uploads.len());
    for upload in &plan.uploads {
        let body = fs::read(&upload.path)?;
        info!(key = %upload.key, size = body.len(), "uploading object");
        store
            .put_object(NewObject {
                key: &upload.key,
                body: &body,
                content_hash: &upload.content_hash,
                content_type: content_type_for(&upload.key),
            })
            .await
            .map_err(|e| SyncError::Store(format!("put_object {}: {e}", upload.key)))?;
        uploaded.push(upload.key.clone());
    }

    if !plan.deletes.is_empty() {
        info!(count = plan.deletes.len(), "pruning remote-only objects");
        let deletions = plan.deletes.iter().map(|key| store.delete_object(key));
        try_join_all(deletions)
            .await
            .map_err(|e| SyncError::Store(format!("delete_object: {e}")))?;
    }

    info!(
        uploaded = uploaded.len(),
        deleted = plan.deletes.len(),
        unchanged = plan.unchanged,
        "bucket synchronisation complete"
    );
    Ok(SyncReport {
        uploaded,
        deleted: plan.deletes,
        unchanged: plan.unchanged,
        retained: plan.retained,
        dry_run: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn dir_to_file_maps_walks_recursively_with_sorted_slash_keys() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        File::create(dir.path().join("index.html"))
            .unwrap()
            .write_all(b"<html></html>")
            .unwrap();
        File::create(dir.path().join("css/site.css"))
            .unwrap()
            .write_all(b"body {}")
            .unwrap();
        File::create(dir.path().join(".git/config")).unwrap();

        let maps = dir_to_file_maps(dir.path()).unwrap();
        let keys: Vec<&str> = maps.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["css/site.css", "index.html"]);
    }

    #[test]
    fn content_hash_is_lowercase_hex_sha256() {
        let hash = content_hash(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn content_type_covers_common_site_files() {
        assert_eq!(content_type_for("index.html"), Some("text/html"));
        assert_eq!(content_type_for("css/site.css"), Some("text/css"));
        assert_eq!(content_type_for("img/logo.png"), Some("image/png"));
        assert_eq!(content_type_for("Makefile"), None);
        assert_eq!(content_type_for("archive.tar.zst"), None);
    }
}
