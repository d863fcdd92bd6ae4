//! Host-side Remote Play invite handling
//!
//! Issues invites through the remote-client manager, mints guest ids, and
//! translates the manager's callback family into host sinks. All dispatch
//! happens synchronously inside the callback pump.

use log::debug;

use crate::context::CallbackHandler;
use crate::game_id::GameId;
use crate::sdk::{
    self, RemotePlayer, SteamId, SteamSdk, CB_REMOTE_PLAY_INVITE_RESULT, CB_START_STREAM_SESSION,
    CB_STOP_STREAM_SESSION,
};

/// Spacewar, the SDK test app. Titles running under it are not real Steam
/// apps and cannot host Remote Play Together.
const SPACEWAR_APP_ID: u32 = 480;

/// Sink for successful invite results: invitee, guest id, connect URL.
/// The URL borrow is only valid for the duration of the call.
pub type InvitedSink = Box<dyn FnMut(SteamId, u64, &str) + Send>;

/// Sink for session start and stop: invitee, guest id.
pub type SessionSink = Box<dyn FnMut(SteamId, u64) + Send>;

/// Host-side state machine for Remote Play Together invites.
pub struct InviteHandler {
    next_guest_id: u64,
    on_invited: Option<InvitedSink>,
    on_started: Option<SessionSink>,
    on_stopped: Option<SessionSink>,
}

impl InviteHandler {
    pub fn new() -> Self {
        InviteHandler {
            next_guest_id: 1,
            on_invited: None,
            on_started: None,
            on_stopped: None,
        }
    }

    /// Invite a friend into a Remote Play session of `game`.
    ///
    /// Returns the guest id minted for the invitee, or 0 when the game
    /// cannot be hosted (not a Steam app, or spacewar) — in which case the
    /// client is never contacted. The invite result arrives later through
    /// the pump; delivery is not guaranteed.
    pub fn send_invite(&mut self, sdk: &mut dyn SteamSdk, invitee: SteamId, game: GameId) -> u64 {
        if !game.is_steam_app() || game.app_id() == SPACEWAR_APP_ID {
            debug!("refusing invite for {invitee}: {game:?} is not a hostable steam app");
            return 0;
        }

        let guest_id = self.next_guest_id;
        self.next_guest_id += 1;

        let player = RemotePlayer::new(invitee, guest_id);
        if !sdk.create_invite_and_session(player, game.app_id()) {
            debug!("remote-client manager did not accept the invite for guest {guest_id}");
        }
        guest_id
    }

    /// Cancel a pending invite and its session for `invitee`.
    ///
    /// The manager only holds a cancellable handle while a streaming session
    /// is active; otherwise there is nothing to cancel and the call is a
    /// no-op. Cancellation is best-effort — a later session-stopped callback
    /// is the authoritative signal.
    pub fn cancel_invite(&mut self, sdk: &mut dyn SteamSdk, invitee: SteamId, guest_id: u64) {
        if !sdk.is_streaming_session_active() {
            debug!("no streaming session active, nothing to cancel for guest {guest_id}");
            return;
        }
        sdk.cancel_invite_and_session(RemotePlayer::new(invitee, guest_id));
    }

    /// Install (or clear) the invite-result sink. Install sinks before the
    /// first pump tick; installation is not synchronized with dispatch.
    pub fn set_on_invited(&mut self, sink: Option<InvitedSink>) {
        self.on_invited = sink;
    }

    pub fn set_on_started(&mut self, sink: Option<SessionSink>) {
        self.on_started = sink;
    }

    pub fn set_on_stopped(&mut self, sink: Option<SessionSink>) {
        self.on_stopped = sink;
    }

    fn on_invite_result(&mut self, payload: &[u8]) {
        let Some(result) = sdk::decode_invite_result(payload) else {
            return;
        };
        if !result.is_ok() {
            debug!(
                "invite for guest {} failed with result {}",
                result.player.guest_id, result.result
            );
            return;
        }
        if let Some(sink) = self.on_invited.as_mut() {
            sink(
                result.player.player_id,
                result.player.guest_id,
                result.connect_url(),
            );
        }
    }

    fn on_session_started(&mut self, payload: &[u8]) {
        let Some(player) = sdk::decode_start_session(payload) else {
            return;
        };
        if let Some(sink) = self.on_started.as_mut() {
            sink(player.player_id, player.guest_id);
        }
    }

    fn on_session_stopped(&mut self, payload: &[u8]) {
        let Some(player) = sdk::decode_stop_session(payload) else {
            return;
        };
        // Guest ids stay monotonic for the whole process, even once the
        // last session is gone.
        if let Some(sink) = self.on_stopped.as_mut() {
            sink(player.player_id, player.guest_id);
        }
    }
}

impl Default for InviteHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackHandler for InviteHandler {
    fn handle_callback(&mut self, callback_id: u32, payload: &[u8]) {
        match callback_id {
            CB_REMOTE_PLAY_INVITE_RESULT => self.on_invite_result(payload),
            CB_START_STREAM_SESSION => self.on_session_started(payload),
            CB_STOP_STREAM_SESSION => self.on_session_stopped(payload),
            _ => {}
        }
    }
}
