//! `edgeplane index`

use super::output::{print_output, OutputFormat};
use crate::config::AssemblerSettings;
use crate::store::InMemoryStore;
use crate::xds::tls::CertificateIndex;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// YAML object files, later objects replacing earlier ones
    #[arg(long, required = true)]
    pub objects: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

/// Domain to credential identity, as discovery would see it.
pub fn build_index(
    args: &IndexArgs,
    settings: &AssemblerSettings,
) -> anyhow::Result<BTreeMap<String, String>> {
    let store = InMemoryStore::from_files(&args.objects)?;
    let index = CertificateIndex::from_credentials(
        store.credentials(),
        &settings.index.label_key,
        &settings.index.label_value,
    );

    Ok(index
        .iter()
        .map(|(domain, credential)| (domain.clone(), credential.identity().resource_name()))
        .collect())
}

pub fn handle_index_command(args: IndexArgs, settings: &AssemblerSettings) -> anyhow::Result<()> {
    let index = build_index(&args, settings)?;
    print_output(&index, args.output)
}
