use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use solavia::keys::{load_keypair, DEFAULT_KEY_FILE};
use solavia::runtime::write_json;
use solavia::{PipelineFile, Runtime, EXAMPLE_PIPELINE};

use crate::{output_path, DEFAULT_PROOF_FILE, DEFAULT_SIGNATURE_FILE};

/// Options of `solavia run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// `example` or a pipeline file.
    pub pipeline: String,
    /// `Some(None)` writes the proof to the default path.
    pub prove: Option<Option<PathBuf>>,
    /// `Some(None)` signs with the default key file.
    pub sign: Option<Option<PathBuf>>,
    pub signature: Option<PathBuf>,
}

pub async fn run(runtime: &Runtime, options: RunOptions) -> anyhow::Result<()> {
    if options.pipeline == EXAMPLE_PIPELINE {
        let output = runtime.run_example().await?;
        println!("Output: {output}");
    } else {
        let path = Path::new(&options.pipeline);
        if !path.is_file() {
            bail!("unknown pipeline {:?}: not {EXAMPLE_PIPELINE:?} and not a file", options.pipeline);
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let file = PipelineFile::from_json(&text)?;
        let incomplete = runtime
            .record_file(&file)?
            .iter()
            .filter(|r| !r.is_complete())
            .count();
        if incomplete > 0 {
            println!("Warning: {incomplete} stage(s) recorded without an output hash");
        }
    }

    println!();
    for (i, stage) in runtime.stages().iter().enumerate() {
        let output = stage.output_hash.map_or_else(|| "-".to_string(), |h| h.to_hex());
        println!("{i:>3}  {:<24} {output}", stage.name);
    }
    match runtime.merkle_root() {
        Some(root) => println!("\nMerkle root: {root}"),
        None => println!("\nMerkle root: (none)"),
    }

    if let Some(prove) = options.prove {
        let path = output_path(runtime.config(), prove, DEFAULT_PROOF_FILE);
        runtime.write_proof(&path)?;
        println!("Proof written to {}", path.display());
    }

    if let Some(sign) = options.sign {
        let key_path = sign.unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILE));
        let keypair = load_keypair(&key_path)?;
        let document = runtime.sign(Some(&keypair))?;
        let path = output_path(runtime.config(), options.signature, DEFAULT_SIGNATURE_FILE);
        write_json(&path, &document)?;
        println!("Signature written to {}", path.display());
    }

    runtime.persist().await?;
    Ok(())
}
