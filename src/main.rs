//! Protocol recovery driver.
//!
//! Loads the metadata dumps of the two backend builds, runs both extractions
//! in parallel (disjoint inputs, independent resolved-type sets), merges the
//! two recovered protocols, and renders the result as Python data models.
//! Any unmet structural assumption aborts the whole run; there is no partial
//! output.

mod args;
mod emit;

use anyhow::{Context, Result};
use clap::Parser;
use netproto_extract::{
    harvest_literals, Anchors, Il2CppExtractor, MonoExtractor, NameMap, ProtocolExtractor,
};
use netproto_metadata::{read_hint_literals, read_module};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use args::Args;

/// Types resolved into the protocol even though no call site references
/// them; the client reads them out of loosely-typed payload blobs.
const DEFAULT_SEED_TYPES: [&str; 4] = [
    "Elements.ClanDefine/eClanSupportMemberType",
    "Elements.eGachaDrawType",
    "Elements.eSkillLocationCategory",
    "Elements.CampaignData/eCampaignCategory",
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mono = read_module(&args.mono)?;
    let il2cpp = read_module(&args.il2cpp)?;
    info!(
        mono_types = mono.types.len(),
        il2cpp_types = il2cpp.types.len(),
        "loaded metadata dumps"
    );

    // The name map is built once, before extraction, and shared read-only by
    // both backends so field spellings agree across the merge.
    let mut names = NameMap::new();
    names.observe_all(harvest_literals(
        &mono,
        &Anchors::default().payload_param_type,
    ));
    if let Some(hints) = &args.hints {
        names.observe_all(read_hint_literals(hints)?);
    }
    info!(entries = names.len(), "built field-name map");

    let mut seed_types: Vec<String> = DEFAULT_SEED_TYPES.iter().map(|s| s.to_string()).collect();
    seed_types.extend(args.seed_type.iter().cloned());

    let mono_extractor = MonoExtractor::new(seed_types.clone());
    let il2cpp_extractor = Il2CppExtractor::new(seed_types);
    let (mono_protocol, il2cpp_protocol) = rayon::join(
        || mono_extractor.extract(&mono, &names),
        || il2cpp_extractor.extract(&il2cpp, &names),
    );
    let mono_protocol = mono_protocol.context("extract jit backend")?;
    let il2cpp_protocol = il2cpp_protocol.context("extract aot backend")?;
    info!(
        mono_apis = mono_protocol.apis.len(),
        il2cpp_apis = il2cpp_protocol.apis.len(),
        "extracted both backends"
    );

    let protocol = netproto_merge::merge(mono_protocol, il2cpp_protocol);

    if let Some(path) = &args.emit_json {
        let json = serde_json::to_string_pretty(&protocol)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create {}", args.out_dir.display()))?;
    emit::emit_python(&protocol, &args.out_dir)?;
    info!(
        apis = protocol.apis.len(),
        common = protocol.common.len(),
        enums = protocol.enums.len(),
        out_dir = %args.out_dir.display(),
        "wrote Python models"
    );

    Ok(())
}
