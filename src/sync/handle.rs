//! SyncHandle - public API for the sync actor
//!
//! Fire-and-forget methods for client traffic, async methods with oneshot
//! channels for queries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::commands::{ClientTx, SyncCommand};
use super::protocol::ClientEvent;
use super::ClientId;
use crate::mixer::MixerState;
use crate::topology::AddressedChannel;

/// Cloneable handle to the sync actor
#[derive(Clone)]
pub struct SyncHandle {
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
    next_client: Arc<AtomicU64>,
}

impl SyncHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<SyncCommand>) -> Self {
        Self {
            cmd_tx,
            next_client: Arc::new(AtomicU64::new(1)),
        }
    }

    // =========================================================================
    // Client traffic (fire-and-forget)
    // =========================================================================

    /// Register a client; it receives the current snapshot and preset list
    /// through `tx` before any broadcast.
    pub fn connect(&self, tx: ClientTx) -> ClientId {
        let client = ClientId(self.next_client.fetch_add(1, Ordering::Relaxed));
        let _ = self.cmd_tx.send(SyncCommand::Connect { client, tx });
        client
    }

    pub fn disconnect(&self, client: ClientId) {
        let _ = self.cmd_tx.send(SyncCommand::Disconnect { client });
    }

    /// Queue an event received from `client`
    pub fn dispatch(&self, client: ClientId, event: ClientEvent) {
        let _ = self.cmd_tx.send(SyncCommand::Event { client, event });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current mixer state; `None` if the actor has stopped
    pub async fn snapshot(&self) -> Option<MixerState> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx.send(SyncCommand::Snapshot { response }).ok()?;
        rx.await.ok()
    }

    pub async fn preset_names(&self) -> Vec<String> {
        let (response, rx) = oneshot::channel();
        if self.cmd_tx.send(SyncCommand::PresetNames { response }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn layout(&self) -> Vec<AddressedChannel> {
        let (response, rx) = oneshot::channel();
        if self.cmd_tx.send(SyncCommand::Layout { response }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn client_count(&self) -> usize {
        let (response, rx) = oneshot::channel();
        if self.cmd_tx.send(SyncCommand::ClientCount { response }).is_err() {
            return 0;
        }
        rx.await.unwrap_or_default()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(SyncCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SyncHandle>();
    }

    #[tokio::test]
    async fn test_client_ids_are_unique_across_clones() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = SyncHandle::new(tx);
        let other = handle.clone();

        let (client_tx, _client_rx) = mpsc::unbounded_channel();
        let a = handle.connect(client_tx.clone());
        let b = other.connect(client_tx);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_queries_on_closed_actor() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = SyncHandle::new(tx);

        assert!(!handle.is_alive());
        assert!(handle.snapshot().await.is_none());
        assert!(handle.preset_names().await.is_empty());
        assert_eq!(handle.client_count().await, 0);
    }
}
