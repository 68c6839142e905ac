#![doc = "AWS integration for the CLI: bridges the core contract traits to the CloudFormation and S3 SDK clients."]
//
//! # AWS Adapters (CLI <-> Core)
//!
//! This module wires the core traits to real AWS services: [`CloudFormation`]
//! implements `Provisioner` on top of aws-sdk-cloudformation, and [`S3Store`]
//! implements `ObjectStore` on top of aws-sdk-s3.
//!
//! - Both clients are built from one SDK config: static credentials plus an
//!   explicit region (see [`Credentials`] resolution in `load_config`).
//! - Object content hashes are carried in user metadata under
//!   [`CONTENT_HASH_KEY`]; listings recover them with a head request per key.
//! - All transport and serialization errors are surfaced as boxed errors with
//!   context, as the contract traits specify.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::SecondsFormat;

use cloudsite_core::contract::{
    NewObject, NewStack, ObjectStore, Provisioner, ProvisionError, RemoteObject, StackEvent,
    StackHandle, StackOutput, StoreError,
};

use crate::load_config::Credentials;

/// Metadata key under which an object's content hash is recorded.
pub const CONTENT_HASH_KEY: &str = "content-sha256";

fn boxed_err(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    message.into()
}

async fn sdk_config(credentials: &Credentials, region: &str) -> SdkConfig {
    let provider = aws_sdk_s3::config::Credentials::new(
        credentials.access_key.clone(),
        credentials.secret_key.clone(),
        None,
        None,
        "cloudsite-cli",
    );
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(provider)
        .load()
        .await
}

/// `Provisioner` backed by the CloudFormation API.
pub struct CloudFormation {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormation {
    pub async fn new(credentials: &Credentials, region: &str) -> Self {
        let config = sdk_config(credentials, region).await;
        tracing::info!(region, "initialized provisioning client");
        Self {
            client: aws_sdk_cloudformation::Client::new(&config),
        }
    }
}

fn format_timestamp(timestamp: &aws_sdk_cloudformation::primitives::DateTime) -> String {
    chrono::DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[async_trait]
impl Provisioner for CloudFormation {
    async fn create_stack<'a>(&self, req: NewStack<'a>) -> Result<StackHandle, ProvisionError> {
        tracing::info!(stack_name = req.name, "submitting stack creation");
        let result = self
            .client
            .create_stack()
            .stack_name(req.name)
            .template_body(req.template_body)
            .capabilities(aws_sdk_cloudformation::types::Capability::CapabilityIam)
            .send()
            .await;
        match result {
            Ok(resp) => {
                let stack_id = resp.stack_id().unwrap_or(req.name).to_string();
                tracing::info!(stack_id = %stack_id, "stack creation accepted");
                Ok(StackHandle {
                    stack_id,
                    stack_name: req.name.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(error = %DisplayErrorContext(&e), "API error creating stack");
                Err(boxed_err(format!(
                    "create_stack: {}",
                    DisplayErrorContext(e)
                )))
            }
        }
    }

    async fn stack_status(&self, stack_id: &str) -> Result<String, ProvisionError> {
        let resp = self
            .client
            .describe_stacks()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|e| boxed_err(format!("describe_stacks: {}", DisplayErrorContext(e))))?;
        let stack = resp
            .stacks()
            .first()
            .ok_or_else(|| boxed_err(format!("stack {stack_id} not found")))?;
        let status = stack
            .stack_status()
            .ok_or_else(|| boxed_err(format!("stack {stack_id} reported no status")))?;
        Ok(status.as_str().to_string())
    }

    async fn stack_events(&self, stack_id: &str) -> Result<Vec<StackEvent>, ProvisionError> {
        let resp = self
            .client
            .describe_stack_events()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|e| {
                boxed_err(format!("describe_stack_events: {}", DisplayErrorContext(e)))
            })?;
        Ok(resp
            .stack_events()
            .iter()
            .map(|event| StackEvent {
                event_id: event.event_id().unwrap_or_default().to_string(),
                timestamp: event.timestamp().map(format_timestamp).unwrap_or_default(),
                logical_id: event.logical_resource_id().unwrap_or_default().to_string(),
                resource_type: event.resource_type().unwrap_or_default().to_string(),
                status: event
                    .resource_status()
                    .map(|status| status.as_str().to_string())
                    .unwrap_or_default(),
                reason: event.resource_status_reason().map(str::to_string),
            })
            .collect())
    }

    async fn stack_outputs(&self, stack_id: &str) -> Result<Vec<StackOutput>, ProvisionError> {
        let resp = self
            .client
            .describe_stacks()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|e| boxed_err(format!("describe_stacks: {}", DisplayErrorContext(e))))?;
        let stack = resp
            .stacks()
            .first()
            .ok_or_else(|| boxed_err(format!("stack {stack_id} not found")))?;
        Ok(stack
            .outputs()
            .iter()
            .map(|output| StackOutput {
                key: output.output_key().unwrap_or_default().to_string(),
                value: output.output_value().unwrap_or_default().to_string(),
                description: output.description().map(str::to_string),
            })
            .collect())
    }
}

/// `ObjectStore` bound to one S3 bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(credentials: &Credentials, region: &str, bucket: &str) -> Self {
        let config = sdk_config(credentials, region).await;
        tracing::info!(region, bucket, "initialized object store client");
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.to_string(),
        }
    }

    async fn recorded_hash(&self, key: &str) -> Result<Option<String>, StoreError> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| boxed_err(format!("head_object {key}: {}", DisplayErrorContext(e))))?;
        Ok(head
            .metadata()
            .and_then(|metadata| metadata.get(CONTENT_HASH_KEY))
            .cloned())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, StoreError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| boxed_err(format!("list_objects: {}", DisplayErrorContext(e))))?;
            for object in resp.contents() {
                let Some(key) = object.key() else { continue };
                let content_hash = self.recorded_hash(key).await?;
                objects.push(RemoteObject {
                    key: key.to_string(),
                    content_hash,
                    size: object.size().unwrap_or(0).max(0) as u64,
                });
            }
            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }
        tracing::debug!(bucket = %self.bucket, count = objects.len(), "listed bucket");
        Ok(objects)
    }

    async fn put_object<'a>(&self, req: NewObject<'a>) -> Result<(), StoreError> {
        tracing::debug!(bucket = %self.bucket, key = req.key, size = req.body.len(), "putting object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(req.key)
            .body(ByteStream::from(req.body.to_vec()))
            .metadata(CONTENT_HASH_KEY, req.content_hash)
            .set_content_type(req.content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| boxed_err(format!("put_object {}: {}", req.key, DisplayErrorContext(e))))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        tracing::debug!(bucket = %self.bucket, key, "deleting object");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| boxed_err(format!("delete_object {key}: {}", DisplayErrorContext(e))))?;
        Ok(())
    }
}
