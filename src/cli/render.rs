//! `edgeplane render`

use super::output::{print_output, OutputFormat};
use crate::config::AssemblerSettings;
use crate::domain::{ResourceRef, UsedResourceManifest};
use crate::store::InMemoryStore;
use crate::xds::tls::CertificateIndex;
use crate::xds::ResourceAssembler;
use anyhow::Context;
use clap::Args;
use prost::Message;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// YAML object files, later objects replacing earlier ones
    #[arg(long, required = true)]
    pub objects: Vec<PathBuf>,

    /// VirtualService to render, as namespace/name
    #[arg(long)]
    pub intent: String,

    /// Write protobuf-encoded records into this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub identity: String,
    pub route_configuration: String,
    pub filter_chain_count: usize,
    pub filter_chains: Vec<String>,
    pub secrets: Vec<String>,
    pub clusters: Vec<String>,
    pub manifest: UsedResourceManifest,
}

/// Render one virtual service. `Ok(None)` when the store has no such intent.
pub async fn render(
    args: &RenderArgs,
    settings: &AssemblerSettings,
) -> anyhow::Result<Option<RenderSummary>> {
    let id = ResourceRef::parse(&args.intent)?;
    let store = InMemoryStore::from_files(&args.objects)?;

    let Some(intent) = store.service(&id) else {
        warn!(intent = %id, "VirtualService not found");
        return Ok(None);
    };

    let index = CertificateIndex::from_credentials(
        store.credentials(),
        &settings.index.label_key,
        &settings.index.label_value,
    );
    let cancel = CancellationToken::new();

    let assembler =
        ResourceAssembler::with_settings(intent, &index, &store, &cancel, settings).await?;
    let filter_chains = assembler.build_filter_chains()?;
    let used = assembler.get_used_resources(&store, &cancel).await?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_artifact(dir, "route_configuration.pb", assembler.route_configuration())?;
        for (i, chain) in filter_chains.iter().enumerate() {
            write_artifact(dir, &format!("filter_chain-{}.pb", i), chain)?;
        }
        for (i, secret) in used.secrets.iter().enumerate() {
            write_artifact(dir, &format!("secret-{}.pb", i), secret)?;
        }
        for (i, cluster) in used.clusters.iter().enumerate() {
            write_artifact(dir, &format!("cluster-{}.pb", i), cluster)?;
        }
        let manifest = serde_json::to_vec_pretty(&used.manifest)?;
        std::fs::write(dir.join("manifest.json"), manifest)
            .with_context(|| format!("Failed to write manifest into {}", dir.display()))?;
        info!(dir = %dir.display(), "Wrote encoded records");
    }

    Ok(Some(RenderSummary {
        identity: id.resource_name(),
        route_configuration: assembler.route_configuration().name.clone(),
        filter_chain_count: filter_chains.len(),
        filter_chains: filter_chains.into_iter().map(|chain| chain.name).collect(),
        secrets: used.secrets.into_iter().map(|secret| secret.name).collect(),
        clusters: used.clusters.into_iter().map(|cluster| cluster.name).collect(),
        manifest: used.manifest,
    }))
}

fn write_artifact<M: Message>(dir: &Path, file: &str, message: &M) -> anyhow::Result<()> {
    let path = dir.join(file);
    std::fs::write(&path, message.encode_to_vec())
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub async fn handle_render_command(
    args: RenderArgs,
    settings: &AssemblerSettings,
) -> anyhow::Result<()> {
    match render(&args, settings).await? {
        Some(summary) => print_output(&summary, args.output),
        None => {
            eprintln!("VirtualService '{}' not found in the given object files", args.intent);
            Ok(())
        }
    }
}
