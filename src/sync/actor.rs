//! SyncActor - single owner of the mixer state and the client registry
//!
//! Every client event runs to completion (state read, mutation, MIDI
//! emission, broadcast) before the next command is taken off the queue.
//! That ordering is the only consistency mechanism: concurrent edits to
//! the same field resolve as last-applied-write-wins.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::commands::{ClientTx, SyncCommand};
use super::handle::SyncHandle;
use super::protocol::{ChannelDelta, ClientEvent, SavePresetRequest, ServerEvent};
use super::ClientId;
use crate::mixer::{MixerState, MixerStore};
use crate::output::{ControlTranslator, MAX_FULL_CHID};
use crate::presets::{PresetError, PresetStore};
use crate::topology::{generic_layout, AddressedChannel};

/// Channel count used by `init_setup` when the request omits one
pub const DEFAULT_CHANNEL_COUNT: usize = 8;

/// Upper bound for `init_setup` channel counts
pub const MAX_CHANNELS: usize = 128;

pub struct SyncActor {
    store: MixerStore,
    layout: Vec<AddressedChannel>,
    presets: PresetStore,
    translator: ControlTranslator,
    clients: BTreeMap<ClientId, ClientTx>,
    default_channel_count: usize,
}

impl SyncActor {
    /// Build an actor around an initialized store and its channel layout
    pub fn new(
        store: MixerStore,
        layout: Vec<AddressedChannel>,
        presets: PresetStore,
        translator: ControlTranslator,
    ) -> Self {
        warn_unaddressable(&layout);
        Self {
            store,
            layout,
            presets,
            translator,
            clients: BTreeMap::new(),
            default_channel_count: DEFAULT_CHANNEL_COUNT,
        }
    }

    pub fn with_default_channel_count(mut self, count: usize) -> Self {
        self.default_channel_count = count.clamp(1, MAX_CHANNELS);
        self
    }

    /// Spawn the run loop on the tokio runtime
    pub fn spawn(self) -> SyncHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(cmd_rx));
        info!("Sync actor spawned");
        SyncHandle::new(cmd_tx)
    }

    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<SyncCommand>) {
        debug!("Sync actor run loop started");

        while let Some(cmd) = command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                SyncCommand::Connect { client, tx } => self.handle_connect(client, tx),
                SyncCommand::Disconnect { client } => {
                    if self.clients.remove(&client).is_some() {
                        info!("Client {} disconnected ({} connected)", client, self.clients.len());
                    }
                }
                SyncCommand::Event { client, event } => self.handle_event(client, event),
                SyncCommand::Snapshot { response } => {
                    let _ = response.send(self.store.snapshot());
                }
                SyncCommand::PresetNames { response } => {
                    let _ = response.send(self.presets.list());
                }
                SyncCommand::Layout { response } => {
                    let _ = response.send(self.layout.clone());
                }
                SyncCommand::ClientCount { response } => {
                    let _ = response.send(self.clients.len());
                }
                SyncCommand::Shutdown => {
                    info!("Sync actor shutting down");
                    break;
                }
            }
        }

        self.translator.close();
        debug!("Sync actor stopped");
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    fn handle_connect(&mut self, client: ClientId, tx: ClientTx) {
        // New clients only ever see the full canonical state
        let _ = tx.send(ServerEvent::SyncState(self.store.snapshot()));
        let _ = tx.send(ServerEvent::PresetsList(self.presets.list()));
        self.clients.insert(client, tx);
        info!("Client {} connected ({} connected)", client, self.clients.len());
    }

    fn handle_event(&mut self, client: ClientId, event: ClientEvent) {
        debug!("Client {} -> {}", client, event.name());

        match event {
            ClientEvent::GetPresets => {
                self.send_to(client, ServerEvent::PresetsList(self.presets.list()));
            }
            ClientEvent::SavePreset(request) => self.handle_save_preset(request),
            ClientEvent::LoadPreset(name) => self.handle_load_preset(&name),
            ClientEvent::DeletePreset(name) => self.handle_delete_preset(&name),
            ClientEvent::UpdateChannel(delta) => self.handle_update(client, delta),
            ClientEvent::InitSetup(request) => {
                let count = request.count.unwrap_or(self.default_channel_count);
                if count == 0 || count > MAX_CHANNELS {
                    warn!("Ignoring init_setup with {} channels (1-{})", count, MAX_CHANNELS);
                    return;
                }
                self.apply_topology(generic_layout(count));
            }
            ClientEvent::MidiCc(value) => self.translator.emit_direct(&value.to_fader()),
            ClientEvent::MidiPan(value) => self.translator.emit_direct(&value.to_pan()),
            ClientEvent::MidiMute(mute) => self.translator.emit_direct(&mute.to_control()),
        }
    }

    fn handle_update(&mut self, client: ClientId, delta: ChannelDelta) {
        if delta.update.is_empty() {
            debug!("Dropping empty update from client {}", client);
            return;
        }

        if let Err(e) = self
            .store
            .apply_update(delta.bus_index, delta.channel_index, &delta.update)
        {
            warn!("Dropping update from client {}: {}", client, e);
            return;
        }

        let chid = self.chid(delta.channel_index);
        self.translator
            .emit_update(delta.bus_index, chid, &delta.update);

        // The sender already holds this state locally
        self.notify_others(client, ServerEvent::StateUpdated(delta));
    }

    fn handle_save_preset(&mut self, request: SavePresetRequest) {
        let (name, state) = request.into_parts();
        let state = state.unwrap_or_else(|| self.store.snapshot());

        match self.presets.save(&name, &state) {
            Ok(()) => {
                info!("Preset saved: {}", name);
                self.notify_all(ServerEvent::PresetsList(self.presets.list()));
            }
            Err(PresetError::EmptyName) => warn!("Ignoring save_preset without a name"),
            Err(e) => warn!("Failed to save preset '{}': {}", name, e),
        }
    }

    fn handle_load_preset(&mut self, name: &str) {
        let state = match self.presets.load(name) {
            Ok(state) => state,
            Err(PresetError::NotFound(_)) => {
                debug!("load_preset: no preset named '{}'", name);
                return;
            }
            Err(e) => {
                warn!("Failed to load preset '{}': {}", name, e);
                return;
            }
        };

        self.apply_state(state);
        info!("Preset loaded: {}", name);
    }

    fn handle_delete_preset(&mut self, name: &str) {
        match self.presets.delete(name) {
            Ok(true) => {
                info!("Preset deleted: {}", name);
                self.notify_all(ServerEvent::PresetsList(self.presets.list()));
            }
            Ok(false) => debug!("delete_preset: no preset named '{}'", name),
            Err(e) => warn!("Failed to delete preset '{}': {}", name, e),
        }
    }

    // =========================================================================
    // Full-state changes
    // =========================================================================

    /// Replace the state wholesale and resync every client
    fn apply_state(&mut self, state: MixerState) {
        if state.channel_count() != self.layout.len() {
            debug!(
                "Channel count changed {} -> {}, using generic layout",
                self.layout.len(),
                state.channel_count()
            );
            self.set_layout(generic_layout(state.channel_count()));
        }
        self.store.replace(state);
        self.notify_all(ServerEvent::SyncState(self.store.snapshot()));
    }

    /// Reset the mixer to a new layout and resync every client
    fn apply_topology(&mut self, layout: Vec<AddressedChannel>) {
        let names: Vec<&str> = layout.iter().map(|c| c.name.as_str()).collect();
        self.store.initialize(&names);
        self.set_layout(layout);
        self.notify_all(ServerEvent::SyncState(self.store.snapshot()));
    }

    fn set_layout(&mut self, layout: Vec<AddressedChannel>) {
        warn_unaddressable(&layout);
        self.layout = layout;
    }

    /// Control address of a channel; indices beyond the layout map to themselves
    fn chid(&self, channel_index: usize) -> u16 {
        self.layout
            .get(channel_index)
            .map(|c| c.chid)
            .unwrap_or_else(|| u16::try_from(channel_index).unwrap_or(u16::MAX))
    }

    // =========================================================================
    // Broadcast primitives
    // =========================================================================

    /// Deliver to every connected client except `sender`
    fn notify_others(&mut self, sender: ClientId, event: ServerEvent) {
        let dead: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(id, _)| **id != sender)
            .filter(|(_, tx)| tx.send(event.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        self.prune(dead);
    }

    /// Deliver to every connected client, originator included
    fn notify_all(&mut self, event: ServerEvent) {
        let dead: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, tx)| tx.send(event.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        self.prune(dead);
    }

    fn send_to(&mut self, client: ClientId, event: ServerEvent) {
        let failed = self
            .clients
            .get(&client)
            .is_some_and(|tx| tx.send(event).is_err());
        if failed {
            self.prune(vec![client]);
        }
    }

    fn prune(&mut self, dead: Vec<ClientId>) {
        for id in dead {
            self.clients.remove(&id);
            debug!("Pruned closed client {}", id);
        }
    }
}

/// Channels with at least one control address past 127
fn unaddressable(layout: &[AddressedChannel]) -> usize {
    layout.iter().filter(|c| c.chid > MAX_FULL_CHID).count()
}

/// The translator skips out-of-range messages quietly; the limit is
/// reported here, once per installed layout.
fn warn_unaddressable(layout: &[AddressedChannel]) {
    let beyond = unaddressable(layout);
    if beyond > 0 {
        warn!(
            "{} of {} channels sit past chid {}; some of their controls are not sent",
            beyond,
            layout.len(),
            MAX_FULL_CHID
        );
    }
}
