use std::path::Path;

use anyhow::bail;
use solavia::keys::write_keypair;
use solavia::Keypair;

pub fn run(out: &Path, force: bool) -> anyhow::Result<()> {
    if out.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", out.display());
    }
    let keypair = Keypair::generate();
    let public = write_keypair(out, &keypair)?;
    println!("Secret key: {}", out.display());
    println!("Public key: {}", public.display());
    println!("Fingerprint: {}", keypair.public_key().to_hex());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solavia::keys::{load_keypair, load_public_key};

    #[test]
    fn test_keygen_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solavia.key");

        run(&path, false).unwrap();
        let first = load_keypair(&path).unwrap().public_key();
        assert_eq!(load_public_key(&dir.path().join("solavia.key.pub")).unwrap(), first);

        assert!(run(&path, false).is_err());
        run(&path, true).unwrap();
        assert_ne!(load_keypair(&path).unwrap().public_key(), first);
    }
}
