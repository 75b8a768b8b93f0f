use std::path::{Path, PathBuf};

use anyhow::anyhow;
use solavia::keys::{load_public_key, public_key_path, DEFAULT_KEY_FILE};
use solavia::{ProofDocument, SignatureDocument};

use crate::read_json;

pub fn run(proof_path: &Path, signature: Option<PathBuf>, pubkey: Option<PathBuf>) -> anyhow::Result<()> {
    let proof: ProofDocument = read_json(proof_path)?;

    if let Err(e) = proof.verify_strict() {
        println!("\nFAILED: {}\n", proof_path.display());
        return Err(e.into());
    }

    println!("\nVERIFIED: {}\n", proof_path.display());
    println!("Stages:  {}", proof.stages.len());
    match &proof.root {
        Some(root) => println!("Root:    {root}"),
        None => println!("Root:    (none)"),
    }
    println!("Seed:    {}", proof.seed);
    println!("Version: {}", proof.version);

    let Some(signature_path) = signature else {
        return Ok(());
    };

    let document: SignatureDocument = read_json(&signature_path)?;
    let pubkey_path = pubkey.unwrap_or_else(|| public_key_path(Path::new(DEFAULT_KEY_FILE)));
    let public_key = load_public_key(&pubkey_path)?;
    let root = proof
        .root
        .ok_or_else(|| anyhow!("proof has no root; nothing was signed"))?;

    if document.verify_for(&root, &public_key) {
        println!("Signature: valid ({})", pubkey_path.display());
        Ok(())
    } else {
        println!("Signature: INVALID ({})", pubkey_path.display());
        Err(anyhow!("signature in {} does not match the proof root", signature_path.display()))
    }
}
