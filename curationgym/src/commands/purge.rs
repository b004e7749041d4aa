//! purge.rs - Deletes an artifact's directory tree from a content-addressed
//! store.

use anyhow::{Context, Result};

use curationgym_core::artifact_store::ArtifactStore;

use crate::cli::PurgeArgs;

pub async fn run(args: PurgeArgs) -> Result<()> {
    let store = ArtifactStore::new(&args.store);
    if !store.exists(&args.hash) {
        println!("purge: no artifact {} found under {}", args.hash, args.store.display());
        return Ok(());
    }

    store
        .delete_artifact(&args.hash)
        .with_context(|| format!("deleting artifact {} from {}", args.hash, args.store.display()))?;
    println!("purge: removed artifact {}", args.hash);
    Ok(())
}
