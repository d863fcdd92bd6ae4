//! Lifecycle tests for the client context: bring-up idempotence, partial
//! bring-up, tear-down, and pump gating.

mod common;

use common::FakeSdk;
use steam_stuff::sdk::{RemotePlayer, StopStreamSession, CB_STOP_STREAM_SESSION};
use steam_stuff::{CallbackHandler, ClientContext, GameId};

const HOST: u64 = 0x0110_0001_0000_1111;

struct CountingHandler {
    calls: u32,
}

impl CallbackHandler for CountingHandler {
    fn handle_callback(&mut self, _callback_id: u32, _payload: &[u8]) {
        self.calls += 1;
    }
}

#[test]
fn test_init_is_idempotent() {
    let sdk = FakeSdk::new();
    let mut context = ClientContext::new(Box::new(sdk.clone()));

    for _ in 0..5 {
        assert!(context.init());
    }

    let state = sdk.state();
    assert_eq!(state.library_loads, 1);
    assert_eq!(state.pipes_created, 1);
}

#[test]
fn test_failed_init_leaves_context_unusable_and_retries() {
    let sdk = FakeSdk::new();
    sdk.state().fail_pipe = true;
    let mut context = ClientContext::new(Box::new(sdk.clone()));

    assert!(!context.init());
    assert!(!context.is_ready());
    assert_eq!(context.running_game_id(), GameId::invalid());
    assert_eq!(sdk.state().pipes_created, 0);

    sdk.state().fail_pipe = false;
    assert!(context.init());
    assert!(context.is_ready());
    assert_eq!(sdk.state().pipes_created, 1);
}

#[test]
fn test_partial_init_keeps_context_uninitialized() {
    let sdk = FakeSdk::new();
    sdk.state().fail_friends = true;
    let mut context = ClientContext::new(Box::new(sdk.clone()));

    assert!(!context.init());
    assert!(!context.is_ready());
    assert!(!context.can_remote_play_together(GameId::steam_app(2644470)));
}

#[test]
fn test_shutdown_is_idempotent() {
    let sdk = FakeSdk::new();
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());

    context.shutdown();
    context.shutdown();
    context.shutdown();

    let state = sdk.state();
    assert_eq!(state.released_users, vec![(1, 1)]);
    assert_eq!(state.released_pipes, vec![1]);
    assert_eq!(state.shutdown_requests, 1);
}

#[test]
fn test_run_callbacks_after_shutdown_is_noop() {
    let sdk = FakeSdk::new();
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());
    context.shutdown();

    sdk.push_event(
        CB_STOP_STREAM_SESSION,
        &StopStreamSession {
            player: RemotePlayer::new(HOST, 1),
        },
    );

    let mut handler = CountingHandler { calls: 0 };
    context.run_callbacks(&mut handler);

    assert_eq!(handler.calls, 0);
    assert_eq!(sdk.state().pump_ticks, 0);
}

#[test]
fn test_init_after_shutdown_is_rejected() {
    let sdk = FakeSdk::new();
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());
    context.shutdown();

    assert!(!context.init());
    assert!(!context.is_ready());
    assert_eq!(sdk.state().pipes_created, 1);
}

#[test]
fn test_shutdown_without_init_touches_nothing() {
    let sdk = FakeSdk::new();
    let mut context = ClientContext::new(Box::new(sdk.clone()));

    context.shutdown();

    let state = sdk.state();
    assert!(state.released_users.is_empty());
    assert!(state.released_pipes.is_empty());
    assert_eq!(state.shutdown_requests, 0);
}

#[test]
fn test_running_game_id_reports_current_game() {
    let sdk = FakeSdk::new();
    {
        let mut state = sdk.state();
        state.signed_in_user = HOST;
        state.running_game = Some(2644470);
    }
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());

    let game = context.running_game_id();
    assert_eq!(game.app_id(), 2644470);
    assert!(game.is_steam_app());
    assert!(game.is_valid());
}

#[test]
fn test_running_game_id_invalid_when_not_in_game() {
    let sdk = FakeSdk::new();
    sdk.state().signed_in_user = HOST;
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());

    assert!(!context.running_game_id().is_valid());
}

#[test]
fn test_can_remote_play_together_probes_app_manager() {
    let sdk = FakeSdk::new();
    sdk.state().remote_play_apps.push(2644470);
    let mut context = ClientContext::new(Box::new(sdk.clone()));
    assert!(context.init());

    assert!(context.can_remote_play_together(GameId::steam_app(2644470)));
    assert!(!context.can_remote_play_together(GameId::steam_app(730)));
}
