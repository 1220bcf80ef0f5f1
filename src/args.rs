use clap::Parser;
use std::path::PathBuf;

/// Recovers the client API protocol from two compiled backend builds of the
/// same application and renders it as Python data models.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Metadata dump of the JIT-backend build (JSON, from the external
    /// disassembler).
    #[arg(long, value_name = "PATH")]
    pub mono: PathBuf,

    /// Metadata dump of the AOT-backend build.
    #[arg(long, value_name = "PATH")]
    pub il2cpp: PathBuf,

    /// String-literal hint file (JSON array of {"value": "..."} records),
    /// merged into the field-name observation set before extraction.
    #[arg(long, value_name = "PATH")]
    pub hints: Option<PathBuf>,

    /// Directory the Python model files are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Also write the merged protocol as JSON.
    #[arg(long, value_name = "PATH")]
    pub emit_json: Option<PathBuf>,

    /// Extra type full names to resolve into the protocol even though no
    /// call site references them. Can be provided multiple times; extends
    /// the built-in list.
    #[arg(long, value_name = "FULL_NAME")]
    pub seed_type: Vec<String>,
}
