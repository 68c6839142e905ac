//! Flat key/value persistence for stack outputs.
//!
//! After a stack is created its outputs plus the stack id are written to a
//! plain text file, one `key=value` per line, so later tooling (and the user)
//! can pick up bucket name, distribution id and deploy credentials without
//! talking to the provisioning service again.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::contract::StackOutput;

/// Key under which the stack id is stored alongside the outputs.
pub const STACK_ID_KEY: &str = "stack-id";

#[derive(Debug, Error)]
pub enum OutputsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed line {line_number} in {path:?}: {line:?}")]
    Malformed {
        path: String,
        line_number: usize,
        line: String,
    },
}

/// Writes `stack-id` plus every output to `path`, one `key=value` per line.
/// The stack id comes first; outputs follow in sorted key order.
pub fn save_outputs(
    path: &Path,
    stack_id: &str,
    outputs: &[StackOutput],
) -> Result<(), OutputsError> {
    let sorted: BTreeMap<&str, &str> = outputs
        .iter()
        .map(|output| (output.key.as_str(), output.value.as_str()))
        .collect();
    let mut contents = format!("{STACK_ID_KEY}={stack_id}\n");
    for (key, value) in sorted {
        contents.push_str(key);
        contents.push('=');
        contents.push_str(value);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), outputs = outputs.len(), "saved stack outputs");
    Ok(())
}

/// Reads a file written by [`save_outputs`] back into a map. Blank lines and
/// `#` comments are ignored; the first `=` on a line is the separator.
pub fn load_outputs(path: &Path) -> Result<BTreeMap<String, String>, OutputsError> {
    let contents = fs::read_to_string(path)?;
    let mut map = BTreeMap::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(OutputsError::Malformed {
                path: path.display().to_string(),
                line_number: index + 1,
                line: line.to_string(),
            });
        };
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn output(key: &str, value: &str) -> StackOutput {
        StackOutput {
            key: key.to_string(),
            value: value.to_string(),
            description: None,
        }
    }

    #[test]
    fn saved_keys_are_outputs_plus_stack_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("example-com-static-site.outputs");
        let outputs = vec![
            output("WebsiteUrl", "http://d111.cloudfront.net"),
            output("BucketName", "example.com"),
        ];
        save_outputs(&path, "stack-123", &outputs).unwrap();

        let loaded = load_outputs(&path).unwrap();
        let keys: Vec<&str> = loaded.keys().map(String::as_str).collect();
        assert_eq!(keys, ["BucketName", "WebsiteUrl", STACK_ID_KEY]);
        assert_eq!(loaded[STACK_ID_KEY], "stack-123");
        assert_eq!(loaded["BucketName"], "example.com");
    }

    #[test]
    fn stack_id_line_comes_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.outputs");
        save_outputs(&path, "stack-9", &[output("BucketName", "b")]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("stack-id=stack-9\n"));
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.outputs");
        save_outputs(&path, "stack-1", &[output("SecretAccessKey", "abc=def==")]).unwrap();
        let loaded = load_outputs(&path).unwrap();
        assert_eq!(loaded["SecretAccessKey"], "abc=def==");
    }

    #[test]
    fn load_rejects_lines_without_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.outputs");
        std::fs::write(&path, "stack-id=s\nnot a pair\n").unwrap();
        assert!(matches!(
            load_outputs(&path),
            Err(OutputsError::Malformed { line_number: 2, .. })
        ));
    }

    #[test]
    fn load_skips_blanks_and_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sparse.outputs");
        std::fs::write(&path, "# created by cloudsite\n\nstack-id=s\n").unwrap();
        let loaded = load_outputs(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
