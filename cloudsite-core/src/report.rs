//! Console formatting for stack events, outputs and sync results.
//!
//! Pure string builders so the CLI decides where the text goes and tests can
//! assert on the exact output.

use crate::contract::{StackEvent, StackOutput};
use crate::sync::SyncReport;

/// One console line for a stack event: timestamp, status, logical id and
/// reason (when the service attached one).
pub fn format_event(event: &StackEvent) -> String {
    let mut line = format!(
        "{}  {:<20}  {}",
        event.timestamp, event.status, event.logical_id
    );
    if let Some(reason) = &event.reason {
        line.push_str("  (");
        line.push_str(reason);
        line.push(')');
    }
    line
}

/// Aligned `key: value` lines for the outputs of a completed stack.
pub fn format_outputs(outputs: &[StackOutput]) -> String {
    let width = outputs.iter().map(|o| o.key.len()).max().unwrap_or(0);
    outputs
        .iter()
        .map(|output| format!("  {:<width$}  {}", output.key, output.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line summary of a sync run: per-key lines, then the tallies.
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut lines = Vec::new();
    let prefix = if report.dry_run { "would " } else { "" };
    for key in &report.uploaded {
        lines.push(format!("{prefix}upload {key}"));
    }
    for key in &report.deleted {
        lines.push(format!("{prefix}delete {key}"));
    }
    let mut summary = format!(
        "{}{} uploaded, {} deleted, {} unchanged",
        if report.dry_run { "dry run: " } else { "" },
        report.uploaded.len(),
        report.deleted.len(),
        report.unchanged
    );
    if report.retained > 0 {
        summary.push_str(&format!(", {} remote-only retained", report.retained));
    }
    lines.push(summary);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_event_includes_status_logical_id_and_reason() {
        let event = StackEvent {
            event_id: "e1".to_string(),
            timestamp: "2024-05-01T12:00:00Z".to_string(),
            logical_id: "SiteBucket".to_string(),
            resource_type: "AWS::S3::Bucket".to_string(),
            status: "CREATE_FAILED".to_string(),
            reason: Some("bucket name taken".to_string()),
        };
        let line = format_event(&event);
        assert!(line.contains("CREATE_FAILED"));
        assert!(line.contains("SiteBucket"));
        assert!(line.contains("(bucket name taken)"));
    }

    #[test]
    fn format_outputs_aligns_keys() {
        let outputs = vec![
            StackOutput {
                key: "BucketName".to_string(),
                value: "example.com".to_string(),
                description: None,
            },
            StackOutput {
                key: "WebsiteUrl".to_string(),
                value: "http://d111.cloudfront.net".to_string(),
                description: None,
            },
        ];
        let text = format_outputs(&outputs);
        assert!(text.contains("BucketName"));
        assert!(text.contains("http://d111.cloudfront.net"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn format_sync_report_marks_dry_runs() {
        let report = SyncReport {
            uploaded: vec!["index.html".to_string()],
            deleted: vec!["stale.txt".to_string()],
            unchanged: 3,
            retained: 0,
            dry_run: true,
        };
        let text = format_sync_report(&report);
        assert!(text.contains("would upload index.html"));
        assert!(text.contains("would delete stale.txt"));
        assert!(text.contains("dry run: 1 uploaded, 1 deleted, 3 unchanged"));
    }

    #[test]
    fn format_sync_report_counts_retained_keys() {
        let report = SyncReport {
            uploaded: vec![],
            deleted: vec![],
            unchanged: 0,
            retained: 2,
            dry_run: false,
        };
        assert!(format_sync_report(&report).contains("2 remote-only retained"));
    }
}
