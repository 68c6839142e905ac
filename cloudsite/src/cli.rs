/// This module implements the full CLI interface for cloudsite: command
/// parsing, argument validation, main entrypoints and user-visible output.
///
/// All core business logic (template synthesis, stack watching, sync
/// planning) lives in the `cloudsite-core` crate. This module is strictly for
/// CLI glue, ergonomic argument exposure and orchestration.
///
/// ## Features
/// - Entry struct [`Cli`] defines all user-facing options and subcommands.
/// - Subcommand routing (`create-site`, `sync-bucket`) and argument validation.
/// - Async entrypoint ([`run`]) for programmatic invocation and integration
///   testing.
///
/// ## Extending
/// When adding subcommands, update [`Commands`] below and keep all non-trivial
/// business logic inside `cloudsite-core`.
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use cloudsite_core::outputs::save_outputs;
use cloudsite_core::report;
use cloudsite_core::stack::{run_template, WatchConfig};
use cloudsite_core::sync::{dir_to_file_maps, sync, SyncOptions};
use cloudsite_core::template::{stack_name, synthesize, SiteSpec};

use crate::aws::{CloudFormation, S3Store};
use crate::load_config::{load_file_maps, resolve_credentials, resolve_region};

/// CLI for cloudsite: provision static-site infrastructure and publish files.
#[derive(Parser)]
#[clap(
    name = "cloudsite",
    version,
    about = "Provision static-site cloud infrastructure and synchronise site files to its bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the full infrastructure for a static website on a domain
    CreateSite {
        /// Domain the site will be served under, e.g. www.example.com
        #[clap(long)]
        domain: String,
        /// Access key id; falls back to AWS_ACCESS_KEY_ID
        #[clap(long)]
        access_key: Option<String>,
        /// Secret access key; falls back to AWS_SECRET_ACCESS_KEY
        #[clap(long)]
        secret_key: Option<String>,
        /// Region to provision in; falls back to AWS_REGION, then us-east-1
        #[clap(long)]
        region: Option<String>,
        /// Also provision DNS alias records in the domain's hosted zone
        #[clap(long)]
        dns: bool,
        /// Print the synthesized template instead of creating anything
        #[clap(long)]
        dry_run: bool,
        /// Debug-level logging
        #[clap(long)]
        verbose: bool,
    },
    /// Synchronise a local directory (or file-maps file) into a bucket
    SyncBucket {
        /// Name of the bucket to synchronise into
        #[clap(long)]
        bucket: String,
        /// Directory to walk for site files
        #[clap(long)]
        dir: Option<PathBuf>,
        /// YAML file listing key/path file-maps, as an alternative to --dir
        #[clap(long)]
        file_maps: Option<PathBuf>,
        /// Delete remote keys that have no local counterpart
        #[clap(long)]
        prune: bool,
        /// Plan and report only; change nothing
        #[clap(long)]
        dry_run: bool,
        /// Access key id; falls back to AWS_ACCESS_KEY_ID
        #[clap(long)]
        access_key: Option<String>,
        /// Secret access key; falls back to AWS_SECRET_ACCESS_KEY
        #[clap(long)]
        secret_key: Option<String>,
        /// Region of the bucket; falls back to AWS_REGION, then us-east-1
        #[clap(long)]
        region: Option<String>,
        /// Debug-level logging
        #[clap(long)]
        verbose: bool,
    },
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::CreateSite { verbose, .. } | Commands::SyncBucket { verbose, .. } => *verbose,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::CreateSite {
            domain,
            access_key,
            secret_key,
            region,
            dns,
            dry_run,
            ..
        } => {
            let credentials = resolve_credentials(access_key, secret_key)?;
            let region = resolve_region(region);
            tracing::info!(command = "create-site", domain = %domain, dns, "starting site creation");

            let template = synthesize(&SiteSpec {
                domain: domain.clone(),
                dns,
            })?;
            let template_body = serde_json::to_string_pretty(&template)?;

            if dry_run {
                println!("{template_body}");
                return Ok(());
            }

            let name = stack_name(&domain);
            let provisioner = CloudFormation::new(&credentials, &region).await;
            let stack_report = run_template(
                &provisioner,
                &name,
                &template_body,
                &WatchConfig::default(),
                |event| println!("{}", report::format_event(event)),
            )
            .await?;

            let outputs_path = PathBuf::from(format!("{name}.outputs"));
            save_outputs(&outputs_path, &stack_report.stack_id, &stack_report.outputs)?;

            println!("\nStack {} created.", stack_report.stack_id);
            println!("{}", report::format_outputs(&stack_report.outputs));
            println!("\nOutputs saved to {}", outputs_path.display());
            Ok(())
        }
        Commands::SyncBucket {
            bucket,
            dir,
            file_maps,
            prune,
            dry_run,
            access_key,
            secret_key,
            region,
            ..
        } => {
            let credentials = resolve_credentials(access_key, secret_key)?;
            let region = resolve_region(region);
            if bucket.trim().is_empty() {
                bail!("--bucket must not be empty");
            }
            tracing::info!(command = "sync-bucket", bucket = %bucket, prune, dry_run, "starting bucket sync");

            let maps = match (dir, file_maps) {
                (Some(dir), None) => dir_to_file_maps(&dir)?,
                (None, Some(path)) => load_file_maps(&path)?,
                _ => bail!("exactly one of --dir and --file-maps must be given"),
            };

            let store = S3Store::new(&credentials, &region, &bucket).await;
            let sync_report = sync(&store, &maps, &SyncOptions { prune, dry_run }).await?;
            println!("{}", report::format_sync_report(&sync_report));
            Ok(())
        }
    }
}
