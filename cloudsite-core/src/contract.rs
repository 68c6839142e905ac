//! # contract: interfaces to the provisioning service and the object store
//!
//! This module defines the two traits through which every remote effect in
//! cloudsite happens: [`Provisioner`] for submitting an infrastructure template
//! and observing the resulting stack, and [`ObjectStore`] for listing, writing
//! and deleting objects in a storage bucket.
//!
//! ## Interface & Extensibility
//! - Implement [`Provisioner`] to target a provisioning service (or a test double).
//! - Implement [`ObjectStore`] to target a storage backend (or a test double).
//! - All methods are async, returning results and using boxed error types.
//! - Error handling is uniform: all API/caller errors return boxed trait objects.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.
//!
//! ## Adding New Backends
//! - Implement the trait for your backend.
//! - Convert all meaningful upstream errors to a boxed error with context.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type for provisioning calls (boxed, carries context from the backend).
pub type ProvisionError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for object store calls.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// The bare minimum data needed to submit a new stack.
pub struct NewStack<'a> {
    /// Stack name, unique within the provisioning account.
    pub name: &'a str,
    /// The full template document, serialized as JSON.
    pub template_body: &'a str,
}

/// Handle to a stack that the provisioning service accepted.
#[derive(Debug, Clone)]
pub struct StackHandle {
    pub stack_id: String,
    pub stack_name: String,
}

/// One event in a stack's lifecycle, as reported by the provisioning service.
#[derive(Debug, Clone)]
pub struct StackEvent {
    /// Service-assigned id; identical events are re-reported under the same id.
    pub event_id: String,
    /// RFC 3339 timestamp of the event.
    pub timestamp: String,
    /// Logical id of the resource the event concerns.
    pub logical_id: String,
    pub resource_type: String,
    /// Resource status string, e.g. `CREATE_IN_PROGRESS`.
    pub status: String,
    pub reason: Option<String>,
}

/// One key/value output of a completed stack.
#[derive(Debug, Clone)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// An object as reported by a bucket listing.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    pub key: String,
    /// Content hash recorded at upload time; `None` when the object carries none.
    pub content_hash: Option<String>,
    pub size: u64,
}

/// The data needed to write one object to the bucket.
pub struct NewObject<'a> {
    pub key: &'a str,
    pub body: &'a [u8],
    /// Lowercase hex SHA-256 of `body`, recorded with the object.
    pub content_hash: &'a str,
    pub content_type: Option<&'a str>,
}

/// Trait for submitting a template and observing the stack it creates.
/// The implementor is responsible for connecting to the provisioning service.
///
/// The trait is implemented by real clients and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Submit a new stack. Returns as soon as the service accepts the request;
    /// use [`Provisioner::stack_status`] to observe progress.
    async fn create_stack<'a>(&self, req: NewStack<'a>) -> Result<StackHandle, ProvisionError>;

    /// Current status string of the stack, e.g. `CREATE_IN_PROGRESS`.
    async fn stack_status(&self, stack_id: &str) -> Result<String, ProvisionError>;

    /// All lifecycle events reported so far, newest first.
    async fn stack_events(&self, stack_id: &str) -> Result<Vec<StackEvent>, ProvisionError>;

    /// Outputs of the stack. Only meaningful once creation completed.
    async fn stack_outputs(&self, stack_id: &str) -> Result<Vec<StackOutput>, ProvisionError>;
}

/// Trait for listing and mutating the contents of one storage bucket.
/// The implementor is bound to a concrete bucket; keys are bucket-relative.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object in the bucket, including its recorded content hash.
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, StoreError>;

    /// Write one object, overwriting any existing object under the same key.
    async fn put_object<'a>(&self, req: NewObject<'a>) -> Result<(), StoreError>;

    /// Delete one object by key.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}
