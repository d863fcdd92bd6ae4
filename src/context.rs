//! Lifecycle of the connection to the Steam client
//!
//! [`ClientContext`] owns the SDK backend plus the pipe and user handles,
//! and drives the callback pump. The context moves through three states:
//! not initialized, initialized, shut down. Shutdown is terminal — a context
//! is never brought back up within the same process.

use log::{error, info};

use crate::game_id::GameId;
use crate::sdk::{PipeHandle, SdkError, SteamSdk, UserHandle};

/// Receives raw callback payloads drained from the pipe.
pub trait CallbackHandler {
    fn handle_callback(&mut self, callback_id: u32, payload: &[u8]);
}

/// Connection to the running Steam client.
pub struct ClientContext {
    sdk: Box<dyn SteamSdk>,
    pipe: PipeHandle,
    user: UserHandle,
    initialized: bool,
    shutting_down: bool,
}

impl ClientContext {
    pub fn new(sdk: Box<dyn SteamSdk>) -> Self {
        ClientContext {
            sdk,
            pipe: 0,
            user: 0,
            initialized: false,
            shutting_down: false,
        }
    }

    /// Bring up the connection. Safe to call repeatedly; true once the
    /// context is usable. Either every interface is acquired or the context
    /// stays uninitialized and a later call may retry. A context that has
    /// been shut down stays down.
    pub fn init(&mut self) -> bool {
        if self.shutting_down {
            return false;
        }
        if self.initialized {
            return true;
        }
        match self.try_init() {
            Ok(()) => {
                self.initialized = true;
                info!("steam client context initialized");
                true
            }
            Err(e) => {
                error!("steam client init failed: {e}");
                self.pipe = 0;
                self.user = 0;
                false
            }
        }
    }

    fn try_init(&mut self) -> Result<(), SdkError> {
        self.sdk.load_library()?;
        self.sdk.create_client()?;
        self.pipe = self.sdk.create_pipe()?;
        self.user = self.sdk.connect_to_global_user(self.pipe)?;
        self.sdk.acquire_user(self.user, self.pipe)?;
        self.sdk.acquire_friends(self.user, self.pipe)?;
        self.sdk.acquire_client_engine()?;
        self.sdk.acquire_remote_client_manager(self.pipe)?;
        self.sdk.acquire_app_manager(self.user, self.pipe)?;
        Ok(())
    }

    /// Tear the connection down. Idempotent. After the first call the pump
    /// and every query become no-ops.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        if self.pipe != 0 {
            if self.user != 0 {
                self.sdk.release_user(self.pipe, self.user);
            }
            if self.sdk.release_pipe(self.pipe) {
                self.sdk.shutdown_if_all_pipes_closed();
            }
        }
        info!("steam client context shut down");
    }

    /// Drain every queued callback on the pipe, dispatching `handler`
    /// synchronously on the calling thread. Must be ticked regularly for
    /// invites to progress.
    pub fn run_callbacks(&mut self, handler: &mut dyn CallbackHandler) {
        if !self.is_ready() {
            return;
        }
        let pipe = self.pipe;
        self.sdk
            .pump_callbacks(pipe, &mut |id, payload| handler.handle_callback(id, payload));
    }

    /// Packed id of the game the signed-in user is currently in, or the
    /// invalid id when no game is running.
    pub fn running_game_id(&mut self) -> GameId {
        if !self.is_ready() {
            return GameId::invalid();
        }
        let me = self.sdk.signed_in_user();
        match self.sdk.friend_game_played(me) {
            Some(packed) => GameId::from(packed),
            None => GameId::invalid(),
        }
    }

    /// Whether `game` supports Remote Play Together, per the app manager.
    pub fn can_remote_play_together(&mut self, game: GameId) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.sdk.can_remote_play_together(game.app_id())
    }

    /// True between a successful `init` and `shutdown`.
    pub fn is_ready(&self) -> bool {
        self.initialized && !self.shutting_down
    }

    /// Direct access to the SDK backend, for the invite paths.
    pub fn sdk_mut(&mut self) -> &mut dyn SteamSdk {
        self.sdk.as_mut()
    }
}
