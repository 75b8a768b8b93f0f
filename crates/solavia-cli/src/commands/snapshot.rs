use solavia::{Address, Runtime, Snapshot};

/// Capture and persist the current state.
pub async fn create(runtime: &Runtime, name: &str) -> anyhow::Result<Snapshot> {
    let snapshot = runtime.snapshot(name).await?;
    println!("Snapshot {} ({})", snapshot.id, snapshot.name);
    if let Some(address) = &snapshot.address {
        println!("Address: {address}");
    }
    Ok(snapshot)
}

/// Restore the snapshot at `address` and persist the restored state.
pub async fn rollback(runtime: &Runtime, address: &str) -> anyhow::Result<()> {
    let snapshot = runtime.rollback(&Address::parse(address)).await?;
    runtime.persist().await?;
    println!("Rolled back to {} ({})", snapshot.id, snapshot.name);
    println!("Entries: {}", runtime.state().len());
    Ok(())
}
