/// `load_config` module: resolves credentials and region from flags and
/// environment, and parses user-supplied YAML file-maps files into the
/// strongly-typed [`FileMap`] list the core sync engine works with.
///
/// This is the only place where untrusted YAML is parsed and where secrets are
/// read from the environment; the core crate never touches either.
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics
/// and are surfaced at the CLI boundary.
use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use cloudsite_core::sync::FileMap;
use serde::Deserialize;
use tracing::{error, info};

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const REGION_ENV: &str = "AWS_REGION";
const DEFAULT_REGION: &str = "us-east-1";

/// Static credentials for the cloud backends.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Resolves credentials: flags first, environment second. A missing piece is
/// an error naming both the flag and the environment variable.
pub fn resolve_credentials(
    access_key: Option<String>,
    secret_key: Option<String>,
) -> Result<Credentials> {
    let access_key = match access_key.or_else(|| env::var(ACCESS_KEY_ENV).ok()) {
        Some(key) if !key.is_empty() => key,
        _ => {
            error!("no access key provided");
            return Err(anyhow::anyhow!(
                "credentials missing: pass --access-key or set {ACCESS_KEY_ENV}"
            ));
        }
    };
    let secret_key = match secret_key.or_else(|| env::var(SECRET_KEY_ENV).ok()) {
        Some(key) if !key.is_empty() => key,
        _ => {
            error!("no secret key provided");
            return Err(anyhow::anyhow!(
                "credentials missing: pass --secret-key or set {SECRET_KEY_ENV}"
            ));
        }
    };
    Ok(Credentials {
        access_key,
        secret_key,
    })
}

/// Region precedence: flag, `AWS_REGION`, then the service default.
pub fn resolve_region(flag: Option<String>) -> String {
    flag.or_else(|| env::var(REGION_ENV).ok())
        .filter(|region| !region.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

#[derive(Debug, Deserialize)]
struct FileMapEntry {
    key: String,
    path: std::path::PathBuf,
}

/// Loads a YAML file-maps file: a list of `{key, path}` entries. Relative
/// paths are resolved against the file's own directory.
pub fn load_file_maps(path: &Path) -> Result<Vec<FileMap>> {
    info!(file_maps = ?path, "loading file-maps from file");
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            error!(error = ?e, file_maps = ?path, "failed to read file-maps file");
            return Err(anyhow::anyhow!(
                "failed to read file-maps file {:?}: {e}",
                path
            ));
        }
    };
    let entries: Vec<FileMapEntry> = match serde_yaml::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = ?e, file_maps = ?path, "failed to parse file-maps YAML");
            return Err(anyhow::anyhow!("failed to parse file-maps YAML: {e}"));
        }
    };

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let maps = entries
        .into_iter()
        .map(|entry| {
            let resolved = if entry.path.is_absolute() {
                entry.path
            } else {
                base.join(entry.path)
            };
            FileMap {
                key: entry.key,
                path: resolved,
            }
        })
        .collect::<Vec<_>>();
    info!(count = maps.len(), "parsed file-maps");
    Ok(maps)
}
