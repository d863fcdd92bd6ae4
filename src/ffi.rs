//! Flat C entry points
//!
//! Re-exposes the context and invite handler as the stable `SteamStuff_*`
//! surface so any language with a C FFI can drive the shim. The two
//! singletons live behind one static cell; this layer owns no other state
//! and adds no error codes of its own.
//!
//! Every function is safe to call in any order: calls before `SteamStuff_Init`
//! or after `SteamStuff_Shutdown` are no-ops (returning false or 0 where a
//! value is expected). Sinks may be installed before `SteamStuff_Init`.
//!
//! Sinks fire synchronously inside `SteamStuff_RunCallbacks` while the shim
//! lock is held; they must not call back into this surface.

#![allow(non_snake_case)]

use std::ffi::{c_char, CString};
use std::sync::Mutex;

use crate::context::ClientContext;
use crate::game_id::GameId;
use crate::invite::InviteHandler;
use crate::sdk::native::NativeSdk;

/// Invite-result callback: invitee, guest id, connect URL. The URL pointer
/// is only valid for the duration of the call.
pub type OnRemoteInvited =
    Option<unsafe extern "C" fn(invitee: u64, guest_id: u64, connect_url: *const c_char)>;

/// Session-started callback: invitee, guest id.
pub type OnRemoteStarted = Option<unsafe extern "C" fn(invitee: u64, guest_id: u64)>;

/// Session-stopped callback: invitee, guest id.
pub type OnRemoteStopped = Option<unsafe extern "C" fn(invitee: u64, guest_id: u64)>;

struct Shim {
    context: ClientContext,
    invites: InviteHandler,
}

static SHIM: Mutex<Option<Shim>> = Mutex::new(None);

fn with_shim<R>(f: impl FnOnce(&mut Shim) -> R) -> R {
    let mut guard = SHIM.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let shim = guard.get_or_insert_with(|| Shim {
        context: ClientContext::new(Box::new(NativeSdk::new())),
        invites: InviteHandler::new(),
    });
    f(shim)
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Connect to the running Steam client. Idempotent; false when any client
/// interface is unavailable or the shim has already been shut down.
#[no_mangle]
pub extern "C" fn SteamStuff_Init() -> bool {
    init_logging();
    with_shim(|shim| shim.context.init())
}

/// Tear the client connection down. Idempotent; terminal for the process.
#[no_mangle]
pub extern "C" fn SteamStuff_Shutdown() {
    with_shim(|shim| shim.context.shutdown());
}

/// Drain all queued client callbacks, dispatching the installed sinks on
/// the calling thread. Tick at a regular cadence for invites to progress.
#[no_mangle]
pub extern "C" fn SteamStuff_RunCallbacks() {
    with_shim(|shim| {
        let Shim { context, invites } = shim;
        context.run_callbacks(invites);
    });
}

/// Packed game id of the signed-in user's running game, or 0 when no game
/// is running.
#[no_mangle]
pub extern "C" fn SteamStuff_GetRunningGameID() -> u64 {
    with_shim(|shim| shim.context.running_game_id().into())
}

/// Whether the given packed game id supports Remote Play Together.
#[no_mangle]
pub extern "C" fn SteamStuff_CanRemotePlayTogether(gameID: u64) -> bool {
    with_shim(|shim| shim.context.can_remote_play_together(GameId::from(gameID)))
}

/// Invite `invitee` into a Remote Play session of `gameID`. Returns the
/// minted guest id, or 0 when the invite is refused.
#[no_mangle]
pub extern "C" fn SteamStuff_SendInvite(invitee: u64, gameID: u64) -> u64 {
    with_shim(|shim| {
        if !shim.context.is_ready() {
            return 0;
        }
        let Shim { context, invites } = shim;
        invites.send_invite(context.sdk_mut(), invitee, GameId::from(gameID))
    })
}

/// Cancel a pending invite. A no-op unless a streaming session is active.
#[no_mangle]
pub extern "C" fn SteamStuff_CancelInvite(invitee: u64, guestID: u64) {
    with_shim(|shim| {
        if !shim.context.is_ready() {
            return;
        }
        let Shim { context, invites } = shim;
        invites.cancel_invite(context.sdk_mut(), invitee, guestID);
    });
}

#[no_mangle]
pub extern "C" fn SteamStuff_SetOnRemoteInvited(cb: OnRemoteInvited) {
    with_shim(|shim| match cb {
        Some(cb) => shim
            .invites
            .set_on_invited(Some(Box::new(move |invitee, guest_id, url| {
                // Re-encode for C; the pointer is only valid during the call.
                let url = CString::new(url).unwrap_or_default();
                unsafe { cb(invitee, guest_id, url.as_ptr()) }
            }))),
        None => shim.invites.set_on_invited(None),
    });
}

#[no_mangle]
pub extern "C" fn SteamStuff_SetOnRemoteStarted(cb: OnRemoteStarted) {
    with_shim(|shim| match cb {
        Some(cb) => shim
            .invites
            .set_on_started(Some(Box::new(move |invitee, guest_id| unsafe {
                cb(invitee, guest_id)
            }))),
        None => shim.invites.set_on_started(None),
    });
}

#[no_mangle]
pub extern "C" fn SteamStuff_SetOnRemoteStopped(cb: OnRemoteStopped) {
    with_shim(|shim| match cb {
        Some(cb) => shim
            .invites
            .set_on_stopped(Some(Box::new(move |invitee, guest_id| unsafe {
                cb(invitee, guest_id)
            }))),
        None => shim.invites.set_on_stopped(None),
    });
}
