//! Consumed surface of the Steam client library
//!
//! Everything the shim needs from the client is expressed through the
//! [`SteamSdk`] trait, so the rest of the crate never touches raw interface
//! pointers. The production backend lives in [`native`]; the integration
//! tests substitute a scripted fake.
//!
//! This module also owns the wire view of the remote-client-manager callback
//! family: the payload layouts, their ids, and the range-checked decoders
//! that turn a raw `(callback_id, bytes)` pair into typed records.

pub mod native;

use std::ffi::CStr;
use std::mem;

use log::warn;
use thiserror::Error;

/// 64-bit packed Steam account identifier.
pub type SteamId = u64;

/// Steam application id.
pub type AppId = u32;

/// Channel to the client daemon. Callbacks are queued and drained per pipe.
pub type PipeHandle = i32;

/// Per-pipe handle for the signed-in user.
pub type UserHandle = i32;

/// Failures raised by the SDK backend during context bring-up.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("steam client library could not be loaded: {0}")]
    LibraryLoad(String),
    #[error("entry point {0} is not exported by the client library")]
    MissingExport(&'static str),
    #[error("interface {0} is not available in this client build")]
    MissingInterface(&'static str),
    #[error("steam client refused to create a pipe")]
    PipeUnavailable,
    #[error("no signed-in user available on the pipe")]
    NoGlobalUser,
}

// Callback ids of the remote-client-manager family.
pub const REMOTE_CLIENT_MANAGER_CALLBACKS: u32 = 1300;
/// Result of a previously issued Remote Play invite.
pub const CB_REMOTE_PLAY_INVITE_RESULT: u32 = REMOTE_CLIENT_MANAGER_CALLBACKS + 16;
/// A guest's streaming client connected and the stream session is starting.
pub const CB_START_STREAM_SESSION: u32 = REMOTE_CLIENT_MANAGER_CALLBACKS + 17;
/// A stream session ended.
pub const CB_STOP_STREAM_SESSION: u32 = REMOTE_CLIENT_MANAGER_CALLBACKS + 18;

/// Player record handed to the remote-client manager per invite and echoed
/// back in its callbacks. The trailing fields are reserved; the client
/// inspects them and expects zeroes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemotePlayer {
    pub player_id: SteamId,
    pub guest_id: u64,
    pub reserved: [u32; 3],
}

impl RemotePlayer {
    pub fn new(player_id: SteamId, guest_id: u64) -> Self {
        RemotePlayer {
            player_id,
            guest_id,
            reserved: [0; 3],
        }
    }
}

/// Outcome codes reported with an invite result. Only [`Ok`] passes the
/// invite filter; everything else is dropped.
///
/// [`Ok`]: LaunchResult::Ok
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchResult {
    Ok = 1,
    Failed = 2,
    Busy = 3,
    NoUser = 4,
    TimedOut = 5,
}

/// Length of the connect-URL buffer in the invite-result payload.
pub const CONNECT_URL_LEN: usize = 512;

/// Invite-result payload. The result code arrives as a raw `i32` since the
/// client may report codes this build does not know about.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RemotePlayInviteResult {
    pub result: i32,
    pub player: RemotePlayer,
    pub connect_url: [u8; CONNECT_URL_LEN],
}

impl RemotePlayInviteResult {
    pub fn is_ok(&self) -> bool {
        self.result == LaunchResult::Ok as i32
    }

    /// Connect URL up to the first NUL. Empty when the buffer is malformed.
    pub fn connect_url(&self) -> &str {
        CStr::from_bytes_until_nul(&self.connect_url)
            .ok()
            .and_then(|s| s.to_str().ok())
            .unwrap_or("")
    }
}

/// Stream-session start payload, bare shape.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StartStreamSession {
    pub player: RemotePlayer,
}

/// Length of the opaque header in the connected-client shape of the start
/// payload. The header contents are not understood; only its length matters.
pub const STREAMING_CLIENT_HEADER_LEN: usize = 0x80;

/// Stream-session start payload, connected-client shape. Some client builds
/// emit this wider variant under the same callback id family.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StreamingClientConnected {
    pub header: [u8; STREAMING_CLIENT_HEADER_LEN],
    pub player: RemotePlayer,
}

/// Stream-session stop payload.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StopStreamSession {
    pub player: RemotePlayer,
}

// Layout checks for everything read off the wire.
const _: () = assert!(mem::size_of::<RemotePlayer>() == 32);
const _: () = assert!(mem::size_of::<RemotePlayInviteResult>() == 40 + CONNECT_URL_LEN);
const _: () = assert!(mem::size_of::<StartStreamSession>() == 32);
const _: () = assert!(mem::size_of::<StreamingClientConnected>() == STREAMING_CLIENT_HEADER_LEN + 32);
const _: () = assert!(mem::size_of::<StopStreamSession>() == 32);

/// Decode an invite-result blob. None when the blob is shorter than the
/// declared layout.
pub fn decode_invite_result(payload: &[u8]) -> Option<RemotePlayInviteResult> {
    if payload.len() < mem::size_of::<RemotePlayInviteResult>() {
        warn!(
            "invite-result payload too short: {} bytes, expected {}",
            payload.len(),
            mem::size_of::<RemotePlayInviteResult>()
        );
        return None;
    }
    Some(unsafe { (payload.as_ptr() as *const RemotePlayInviteResult).read_unaligned() })
}

/// Decode a session-start blob. Both historical shapes are accepted; the
/// player record is read at the offset of whichever shape the length covers.
pub fn decode_start_session(payload: &[u8]) -> Option<RemotePlayer> {
    if payload.len() >= mem::size_of::<StreamingClientConnected>() {
        let cb = unsafe { (payload.as_ptr() as *const StreamingClientConnected).read_unaligned() };
        Some(cb.player)
    } else if payload.len() >= mem::size_of::<StartStreamSession>() {
        let cb = unsafe { (payload.as_ptr() as *const StartStreamSession).read_unaligned() };
        Some(cb.player)
    } else {
        warn!("session-start payload too short: {} bytes", payload.len());
        None
    }
}

/// Decode a session-stop blob.
pub fn decode_stop_session(payload: &[u8]) -> Option<RemotePlayer> {
    if payload.len() < mem::size_of::<StopStreamSession>() {
        warn!("session-stop payload too short: {} bytes", payload.len());
        return None;
    }
    let cb = unsafe { (payload.as_ptr() as *const StopStreamSession).read_unaligned() };
    Some(cb.player)
}

/// Raw bytes of a callback payload, as the pump presents them. The inverse
/// of the decoders above; the fake client backend uses it to script events.
pub fn payload_bytes<T: Copy>(value: &T) -> Vec<u8> {
    unsafe {
        std::slice::from_raw_parts((value as *const T) as *const u8, mem::size_of::<T>()).to_vec()
    }
}

/// The slice of the Steam client this shim consumes: one method per SDK
/// entry point it touches.
///
/// The bring-up methods mirror the init sequence of
/// [`ClientContext`](crate::context::ClientContext) step by step so a failure
/// is attributable to the exact interface that was missing. Everything below
/// the tear-down group assumes bring-up succeeded.
pub trait SteamSdk: Send {
    // Bring-up, in init order.
    fn load_library(&mut self) -> Result<(), SdkError>;
    fn create_client(&mut self) -> Result<(), SdkError>;
    fn create_pipe(&mut self) -> Result<PipeHandle, SdkError>;
    fn connect_to_global_user(&mut self, pipe: PipeHandle) -> Result<UserHandle, SdkError>;
    fn acquire_user(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError>;
    fn acquire_friends(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError>;
    fn acquire_client_engine(&mut self) -> Result<(), SdkError>;
    fn acquire_remote_client_manager(&mut self, pipe: PipeHandle) -> Result<(), SdkError>;
    fn acquire_app_manager(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError>;

    // Tear-down.
    fn release_user(&mut self, pipe: PipeHandle, user: UserHandle);
    /// True when this was the last open pipe.
    fn release_pipe(&mut self, pipe: PipeHandle) -> bool;
    fn shutdown_if_all_pipes_closed(&mut self);

    /// Drain every queued callback on `pipe`, handing each one to `sink` as
    /// a raw `(callback_id, payload)` pair on the calling thread.
    fn pump_callbacks(&mut self, pipe: PipeHandle, sink: &mut dyn FnMut(u32, &[u8]));

    // Queries and session control.
    fn signed_in_user(&mut self) -> SteamId;
    fn friend_game_played(&mut self, friend: SteamId) -> Option<u64>;
    fn can_remote_play_together(&mut self, app_id: AppId) -> bool;
    fn create_invite_and_session(&mut self, player: RemotePlayer, app_id: AppId) -> bool;
    fn cancel_invite_and_session(&mut self, player: RemotePlayer);
    fn is_streaming_session_active(&mut self) -> bool;
}
