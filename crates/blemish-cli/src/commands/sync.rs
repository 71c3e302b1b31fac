use blemish_core::sync::{connectivity_channel, HttpRemote, SyncEngine};
use blemish_core::InspectionService;

use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_now(
    service: &InspectionService,
    config: &CliConfig,
    offline: bool,
) -> Result<(), CliError> {
    if offline {
        let queued = service.pending_count().await?;
        println!("Offline; {queued} operation(s) remain queued");
        return Ok(());
    }

    let remote = HttpRemote::new(config.require_api_url()?)?;
    let (_handle, monitor) = connectivity_channel(true);
    let engine = SyncEngine::new(service.clone(), remote, monitor);
    engine.maybe_drain().await?;

    let counts = service.sync_counts().await?;
    if counts.queued_operations == 0 {
        println!("Sync completed");
    } else {
        println!(
            "Sync finished with {} operation(s) still queued",
            counts.queued_operations
        );
    }
    if counts.error > 0 {
        println!("{} entity(ies) flagged with sync errors", counts.error);
    }
    Ok(())
}

pub async fn run_status(
    service: &InspectionService,
    offline: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let counts = service.sync_counts().await?;

    if as_json {
        let payload = serde_json::json!({
            "online": !offline,
            "queued_operations": counts.queued_operations,
            "pending": counts.pending,
            "synced": counts.synced,
            "error": counts.error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("online:            {}", if offline { "no" } else { "yes" });
    println!("queued operations: {}", counts.queued_operations);
    println!("entities pending:  {}", counts.pending);
    println!("entities synced:   {}", counts.synced);
    println!("entities in error: {}", counts.error);
    Ok(())
}
