//! Stack Monitor: observes a Docker engine's live state and reconciles it
//! against on-disk compose stack definitions, publishing a unified snapshot
//! of every logical stack on the host: directory-registered, external, or
//! orphan.

use std::sync::Arc;

use crate::api::APIServer;
use crate::discovery::{Snapshot, StackDiscovery};
use crate::docker::{BollardClient, DockerClient};
use crate::snapshot::SnapshotStore;

pub mod aggregate;
pub mod api;
pub mod compose;
pub mod config;
pub mod container;
pub mod discovery;
pub mod docker;
pub mod error;
pub mod snapshot;
pub mod stack;

pub use config::Config;
pub use error::{Error, Result};

/// Runs the monitor: connects to the engine, serves the read-only API and
/// drives interval discovery passes into the snapshot store.
///
/// # Errors
///
/// Fails on invalid configuration or when the engine cannot be reached at
/// startup. A later unreachable pass is logged and retried on the next tick
/// instead.
pub async fn run() -> Result<()> {
    let config = Config::from_env()?;

    let client = match &config.docker_socket {
        Some(socket) => BollardClient::connect_with_socket(socket)?,
        None => BollardClient::connect_local()?,
    };
    client.ping().await?;
    log::info!("connected to container engine");

    let store = Arc::new(SnapshotStore::new());
    {
        let server = APIServer::new(Arc::clone(&store));
        let listen_addr = config.listen_addr.clone();
        tokio::spawn(async move {
            if let Err(err) = server.listen(listen_addr.as_str()).await {
                log::error!("API server terminated: {err}");
            }
        });
        log::info!("API listening on {}", config.listen_addr);
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Snapshot>(1);
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                store.replace(snapshot);
            }
        });
    }

    let discovery = StackDiscovery::new(Arc::new(client), config.stacks_root.clone());
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match discovery.discover_all(config.discovery_deadline).await {
            Ok(snapshot) => {
                log::debug!(
                    "discovered {} stacks (partial: {})",
                    snapshot.stacks.len(),
                    snapshot.partial
                );
                if tx.send(snapshot).await.is_err() {
                    log::error!("snapshot store task terminated");
                    return Ok(());
                }
            }
            Err(err) => log::error!("discovery pass unavailable: {err}"),
        }
    }
}
