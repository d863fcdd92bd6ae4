//! Scripted stand-in for the Steam client used by the integration tests
//!
//! Records every call the shim makes (library loads, pipe creations,
//! invites, cancels, tear-down) and plays back a scripted event queue
//! through the callback pump. Step failures are scripted per bring-up
//! stage so partial-init behavior can be exercised.

use std::sync::{Arc, Mutex, MutexGuard};

use steam_stuff::sdk::{
    payload_bytes, AppId, PipeHandle, RemotePlayer, SdkError, SteamId, SteamSdk, UserHandle,
};

#[derive(Default)]
pub struct FakeState {
    // Recorded calls
    pub library_loads: u32,
    pub pipes_created: u32,
    pub pump_ticks: u32,
    pub released_users: Vec<(PipeHandle, UserHandle)>,
    pub released_pipes: Vec<PipeHandle>,
    pub shutdown_requests: u32,
    pub invites: Vec<(RemotePlayer, AppId)>,
    pub cancels: Vec<RemotePlayer>,

    // Scripted behavior
    pub fail_load: bool,
    pub fail_pipe: bool,
    pub fail_friends: bool,
    pub signed_in_user: SteamId,
    pub running_game: Option<u64>,
    pub remote_play_apps: Vec<AppId>,
    pub streaming_active: bool,
    pub queued_events: Vec<(u32, Vec<u8>)>,
}

/// Cloneable handle; every clone shares the same state, so tests keep one
/// clone for scripting and inspection after handing another to the context.
#[derive(Clone, Default)]
pub struct FakeSdk {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Queue a callback payload for the next pump tick.
    pub fn push_event<T: Copy>(&self, callback_id: u32, payload: &T) {
        self.state()
            .queued_events
            .push((callback_id, payload_bytes(payload)));
    }
}

impl SteamSdk for FakeSdk {
    fn load_library(&mut self) -> Result<(), SdkError> {
        let mut state = self.state();
        if state.fail_load {
            return Err(SdkError::LibraryLoad("scripted failure".into()));
        }
        state.library_loads += 1;
        Ok(())
    }

    fn create_client(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn create_pipe(&mut self) -> Result<PipeHandle, SdkError> {
        let mut state = self.state();
        if state.fail_pipe {
            return Err(SdkError::PipeUnavailable);
        }
        state.pipes_created += 1;
        Ok(1)
    }

    fn connect_to_global_user(&mut self, _pipe: PipeHandle) -> Result<UserHandle, SdkError> {
        Ok(1)
    }

    fn acquire_user(&mut self, _user: UserHandle, _pipe: PipeHandle) -> Result<(), SdkError> {
        Ok(())
    }

    fn acquire_friends(&mut self, _user: UserHandle, _pipe: PipeHandle) -> Result<(), SdkError> {
        if self.state().fail_friends {
            return Err(SdkError::MissingInterface("SteamFriends015"));
        }
        Ok(())
    }

    fn acquire_client_engine(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn acquire_remote_client_manager(&mut self, _pipe: PipeHandle) -> Result<(), SdkError> {
        Ok(())
    }

    fn acquire_app_manager(&mut self, _user: UserHandle, _pipe: PipeHandle) -> Result<(), SdkError> {
        Ok(())
    }

    fn release_user(&mut self, pipe: PipeHandle, user: UserHandle) {
        self.state().released_users.push((pipe, user));
    }

    fn release_pipe(&mut self, pipe: PipeHandle) -> bool {
        self.state().released_pipes.push(pipe);
        true
    }

    fn shutdown_if_all_pipes_closed(&mut self) {
        self.state().shutdown_requests += 1;
    }

    fn pump_callbacks(&mut self, _pipe: PipeHandle, sink: &mut dyn FnMut(u32, &[u8])) {
        // Dispatch without holding the lock.
        let events = {
            let mut state = self.state();
            state.pump_ticks += 1;
            std::mem::take(&mut state.queued_events)
        };
        for (callback_id, payload) in events {
            sink(callback_id, &payload);
        }
    }

    fn signed_in_user(&mut self) -> SteamId {
        self.state().signed_in_user
    }

    fn friend_game_played(&mut self, friend: SteamId) -> Option<u64> {
        let state = self.state();
        if friend == state.signed_in_user {
            state.running_game
        } else {
            None
        }
    }

    fn can_remote_play_together(&mut self, app_id: AppId) -> bool {
        self.state().remote_play_apps.contains(&app_id)
    }

    fn create_invite_and_session(&mut self, player: RemotePlayer, app_id: AppId) -> bool {
        self.state().invites.push((player, app_id));
        true
    }

    fn cancel_invite_and_session(&mut self, player: RemotePlayer) {
        self.state().cancels.push(player);
    }

    fn is_streaming_session_active(&mut self) -> bool {
        self.state().streaming_active
    }
}
