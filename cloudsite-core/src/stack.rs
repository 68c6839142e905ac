//! High-level pipeline: submit a template and watch the stack to completion.
//!
//! This module drives the provisioning service through the [`Provisioner`]
//! trait. [`run_template`] submits the template and hands over to [`watch`],
//! which polls status and events until the stack reaches a terminal state:
//!   - New events are reported exactly once, oldest first, through a
//!     caller-supplied callback (the CLI prints them; tests collect them).
//!   - A rollback in progress is not terminal; the loop keeps reporting
//!     events until the rollback settles, then fails with the last reason.
//!   - On success the stack outputs are fetched and returned in the report.
//!
//! # Error Handling
//! Each failed provisioning call returns immediately with a formatted error;
//! callers should log and surface these to users/test logs.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::contract::{NewStack, Provisioner, StackEvent, StackHandle, StackOutput};

/// Stack status that means creation succeeded.
pub const STATUS_CREATE_COMPLETE: &str = "CREATE_COMPLETE";

/// Stack statuses that terminate the watch as a failure.
const FAILURE_STATUSES: [&str; 4] = [
    "CREATE_FAILED",
    "ROLLBACK_COMPLETE",
    "ROLLBACK_FAILED",
    "DELETE_COMPLETE",
];

/// Polling cadence and overall deadline for a watch.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Everything observed about a successfully created stack.
#[derive(Debug)]
pub struct StackReport {
    pub stack_id: String,
    pub final_status: String,
    pub events: Vec<StackEvent>,
    pub outputs: Vec<StackOutput>,
}

#[derive(Debug, Error)]
pub enum StackError {
    #[error("provisioning request failed: {0}")]
    Provision(String),
    #[error("stack creation ended in {status}: {}", .reason.as_deref().unwrap_or("no reason reported"))]
    Failed {
        status: String,
        reason: Option<String>,
    },
    #[error("timed out after {0:?} waiting for stack completion")]
    TimedOut(Duration),
}

/// Submit `template_body` as a new stack named `name` and watch it to completion.
pub async fn run_template<P, F>(
    provisioner: &P,
    name: &str,
    template_body: &str,
    config: &WatchConfig,
    on_event: F,
) -> Result<StackReport, StackError>
where
    P: Provisioner,
    F: FnMut(&StackEvent),
{
    let handle = provisioner
        .create_stack(NewStack {
            name,
            template_body,
        })
        .await
        .map_err(|e| StackError::Provision(format!("create_stack: {e}")))?;
    info!(stack_id = %handle.stack_id, stack_name = %handle.stack_name, "stack creation submitted");
    watch(provisioner, &handle, config, on_event).await
}

/// Poll `handle` until its stack reaches a terminal state, reporting each new
/// event once through `on_event`.
pub async fn watch<P, F>(
    provisioner: &P,
    handle: &StackHandle,
    config: &WatchConfig,
    mut on_event: F,
) -> Result<StackReport, StackError>
where
    P: Provisioner,
    F: FnMut(&StackEvent),
{
    let started = Instant::now();
    let mut seen: HashSet<String> = HashSet::new();
    let mut events: Vec<StackEvent> = Vec::new();

    loop {
        let mut fresh: Vec<StackEvent> = provisioner
            .stack_events(&handle.stack_id)
            .await
            .map_err(|e| StackError::Provision(format!("stack_events: {e}")))?
            .into_iter()
            .filter(|event| seen.insert(event.event_id.clone()))
            .collect();
        // The service reports newest first; replay fresh events oldest first.
        fresh.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        for event in &fresh {
            debug!(
                event_id = %event.event_id,
                status = %event.status,
                logical_id = %event.logical_id,
                "stack event"
            );
            on_event(event);
        }
        events.extend(fresh);

        let status = provisioner
            .stack_status(&handle.stack_id)
            .await
            .map_err(|e| StackError::Provision(format!("stack_status: {e}")))?;

        if status == STATUS_CREATE_COMPLETE {
            let outputs = provisioner
                .stack_outputs(&handle.stack_id)
                .await
                .map_err(|e| StackError::Provision(format!("stack_outputs: {e}")))?;
            info!(stack_id = %handle.stack_id, outputs = outputs.len(), "stack creation complete");
            return Ok(StackReport {
                stack_id: handle.stack_id.clone(),
                final_status: status,
                events,
                outputs,
            });
        }

        if FAILURE_STATUSES.contains(&status.as_str()) {
            let reason = failure_reason(&events);
            warn!(stack_id = %handle.stack_id, status = %status, "stack creation failed");
            return Err(StackError::Failed { status, reason });
        }

        if started.elapsed() >= config.timeout {
            warn!(stack_id = %handle.stack_id, "gave up waiting for stack completion");
            return Err(StackError::TimedOut(config.timeout));
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Most recent reason attached to a failure event, falling back to the most
/// recent reason of any event.
fn failure_reason(events: &[StackEvent]) -> Option<String> {
    events
        .iter()
        .rev()
        .find(|event| event.status.contains("FAILED") && event.reason.is_some())
        .or_else(|| events.iter().rev().find(|event| event.reason.is_some()))
        .and_then(|event| event.reason.clone())
}
