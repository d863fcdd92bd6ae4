//! Native backend over the installed Steam client
//!
//! Loads the client library at runtime and reaches its versioned interfaces
//! through their C++ vtables. Public-SDK interfaces get explicit vtable
//! structs in declaration order; the undocumented client-engine family is
//! reached through vtable slot constants. 64-bit targets only — calls use
//! the platform C ABI, which matches the client's virtual call convention
//! on x86-64.

use std::ffi::{c_char, c_void, CStr};
use std::mem;
use std::path::PathBuf;
use std::ptr;

use libloading::Library;
use log::{debug, info};

use super::{AppId, PipeHandle, RemotePlayer, SdkError, SteamId, SteamSdk, UserHandle};

// Versioned interface identifiers, as the client registers them.
const STEAMCLIENT_INTERFACE_VERSION: &CStr = c"SteamClient019";
const STEAMUSER_INTERFACE_VERSION: &CStr = c"SteamUser019";
const STEAMFRIENDS_INTERFACE_VERSION: &CStr = c"SteamFriends015";
const CLIENTENGINE_INTERFACE_VERSION: &CStr = c"CLIENTENGINE_INTERFACE_VERSION005";

type CreateInterfaceFn =
    unsafe extern "C" fn(name: *const c_char, ret_code: *mut i32) -> *mut c_void;
type BGetCallbackFn = unsafe extern "C" fn(pipe: PipeHandle, msg: *mut CallbackMsg) -> bool;
type FreeLastCallbackFn = unsafe extern "C" fn(pipe: PipeHandle) -> bool;

/// One queued callback, as `Steam_BGetCallback` hands it out.
#[repr(C)]
#[allow(dead_code)]
struct CallbackMsg {
    user: UserHandle,
    callback_id: i32,
    data: *mut u8,
    len: i32,
}

/// FriendGameInfo_t as the friends interface fills it.
#[repr(C)]
#[allow(dead_code)]
struct FriendGameInfo {
    game_id: u64,
    game_ip: u32,
    game_port: u16,
    query_port: u16,
    lobby_id: u64,
}

const _: () = assert!(mem::size_of::<FriendGameInfo>() == 24);

/// ISteamClient019 virtual method table, in declaration order. Entries the
/// shim never calls are kept as opaque slots for layout.
#[repr(C)]
struct SteamClientVtbl {
    create_steam_pipe: unsafe extern "C" fn(*mut c_void) -> PipeHandle,
    release_steam_pipe: unsafe extern "C" fn(*mut c_void, PipeHandle) -> bool,
    connect_to_global_user: unsafe extern "C" fn(*mut c_void, PipeHandle) -> UserHandle,
    create_local_user: *const c_void,
    release_user: unsafe extern "C" fn(*mut c_void, PipeHandle, UserHandle),
    get_steam_user:
        unsafe extern "C" fn(*mut c_void, UserHandle, PipeHandle, *const c_char) -> *mut c_void,
    get_game_server: *const c_void,
    set_local_ip_binding: *const c_void,
    get_steam_friends:
        unsafe extern "C" fn(*mut c_void, UserHandle, PipeHandle, *const c_char) -> *mut c_void,
    get_steam_utils: *const c_void,
    get_steam_matchmaking: *const c_void,
    get_steam_matchmaking_servers: *const c_void,
    get_generic_interface: *const c_void,
    get_steam_user_stats: *const c_void,
    get_steam_game_server_stats: *const c_void,
    get_steam_apps: *const c_void,
    get_steam_networking: *const c_void,
    get_steam_remote_storage: *const c_void,
    get_steam_screenshots: *const c_void,
    get_steam_game_search: *const c_void,
    run_frame: *const c_void,
    get_ipc_call_count: *const c_void,
    set_warning_message_hook: *const c_void,
    shutdown_if_all_pipes_closed: unsafe extern "C" fn(*mut c_void) -> bool,
    // Trailing entries omitted; nothing past this point is called.
}

/// ISteamUser019 virtual method table, leading entries only.
#[repr(C)]
struct SteamUserVtbl {
    get_hsteam_user: *const c_void,
    logged_on: *const c_void,
    get_steam_id: unsafe extern "C" fn(*mut c_void) -> SteamId,
}

/// ISteamFriends015 virtual method table, up to the one entry the shim uses.
#[repr(C)]
struct SteamFriendsVtbl {
    get_persona_name: *const c_void,
    set_persona_name: *const c_void,
    get_persona_state: *const c_void,
    get_friend_count: *const c_void,
    get_friend_by_index: *const c_void,
    get_friend_relationship: *const c_void,
    get_friend_persona_state: *const c_void,
    get_friend_persona_name: *const c_void,
    get_friend_game_played:
        unsafe extern "C" fn(*mut c_void, SteamId, *mut FriendGameInfo) -> bool,
}

#[repr(C)]
struct Interface<V> {
    vtbl: *const V,
}

// Vtable slots in the unversioned client-engine family. The surrounding
// entries are not understood; only these offsets are relied on, taken from
// the interface listings shipped with the open client headers.
const ENGINE_SLOT_GET_CLIENT_APP_MANAGER: usize = 14;
const ENGINE_SLOT_GET_CLIENT_REMOTE_MANAGER: usize = 30;
const REMOTE_MGR_SLOT_IS_STREAMING_SESSION_ACTIVE: usize = 9;
const REMOTE_MGR_SLOT_CREATE_INVITE_AND_SESSION: usize = 12;
const REMOTE_MGR_SLOT_CANCEL_INVITE_AND_SESSION: usize = 13;
const APP_MGR_SLOT_CAN_REMOTE_PLAY_TOGETHER: usize = 45;

/// Fetch a typed entry from a C++ vtable at a known slot.
///
/// # Safety
/// `iface` must point at a live C++ object whose vtable holds a function of
/// type `F` at `slot`.
unsafe fn vtable_slot<F: Copy>(iface: *mut c_void, slot: usize) -> F {
    let vtbl = *(iface as *const *const *const c_void);
    let entry = *vtbl.add(slot);
    mem::transmute_copy::<*const c_void, F>(&entry)
}

/// Production [`SteamSdk`] backend.
///
/// All pointers are vended by the client library and stay valid until the
/// pipe is torn down; the shim never frees them.
pub struct NativeSdk {
    library: Option<Library>,
    create_interface: Option<CreateInterfaceFn>,
    get_callback: Option<BGetCallbackFn>,
    free_last_callback: Option<FreeLastCallbackFn>,
    client: *mut c_void,
    user: *mut c_void,
    friends: *mut c_void,
    engine: *mut c_void,
    remote_manager: *mut c_void,
    app_manager: *mut c_void,
}

// The host serializes every call into the shim (init, pump, invites); the
// interface pointers never race across threads.
unsafe impl Send for NativeSdk {}

impl NativeSdk {
    pub fn new() -> Self {
        NativeSdk {
            library: None,
            create_interface: None,
            get_callback: None,
            free_last_callback: None,
            client: ptr::null_mut(),
            user: ptr::null_mut(),
            friends: ptr::null_mut(),
            engine: ptr::null_mut(),
            remote_manager: ptr::null_mut(),
            app_manager: ptr::null_mut(),
        }
    }

    /// Candidate locations for the client library, most specific last.
    fn library_candidates() -> Vec<PathBuf> {
        #[cfg(windows)]
        {
            vec![PathBuf::from("steamclient64.dll")]
        }
        #[cfg(not(windows))]
        {
            let mut candidates = vec![PathBuf::from("steamclient.so")];
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join(".steam/sdk64/steamclient.so"));
            }
            candidates
        }
    }

    fn resolve_interface(&self, version: &'static CStr) -> Result<*mut c_void, SdkError> {
        let create = self
            .create_interface
            .ok_or(SdkError::MissingExport("CreateInterface"))?;
        let iface = unsafe { create(version.as_ptr(), ptr::null_mut()) };
        if iface.is_null() {
            return Err(SdkError::MissingInterface(
                version.to_str().unwrap_or("unknown"),
            ));
        }
        Ok(iface)
    }

    unsafe fn client_vtbl(&self) -> &SteamClientVtbl {
        &*(*(self.client as *const Interface<SteamClientVtbl>)).vtbl
    }
}

impl Default for NativeSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SteamSdk for NativeSdk {
    fn load_library(&mut self) -> Result<(), SdkError> {
        if self.library.is_some() {
            return Ok(());
        }

        let mut last_error = String::from("no candidate paths");
        for candidate in Self::library_candidates() {
            match unsafe { Library::new(&candidate) } {
                Ok(library) => {
                    info!("loaded steam client library from {}", candidate.display());
                    let create_interface: CreateInterfaceFn =
                        *unsafe { library.get(b"CreateInterface\0") }
                            .map_err(|_| SdkError::MissingExport("CreateInterface"))?;
                    let get_callback: BGetCallbackFn =
                        *unsafe { library.get(b"Steam_BGetCallback\0") }
                            .map_err(|_| SdkError::MissingExport("Steam_BGetCallback"))?;
                    let free_last_callback: FreeLastCallbackFn =
                        *unsafe { library.get(b"Steam_FreeLastCallback\0") }
                            .map_err(|_| SdkError::MissingExport("Steam_FreeLastCallback"))?;
                    self.create_interface = Some(create_interface);
                    self.get_callback = Some(get_callback);
                    self.free_last_callback = Some(free_last_callback);
                    self.library = Some(library);
                    return Ok(());
                }
                Err(e) => {
                    debug!("steam client not at {}: {e}", candidate.display());
                    last_error = e.to_string();
                }
            }
        }
        Err(SdkError::LibraryLoad(last_error))
    }

    fn create_client(&mut self) -> Result<(), SdkError> {
        self.client = self.resolve_interface(STEAMCLIENT_INTERFACE_VERSION)?;
        Ok(())
    }

    fn create_pipe(&mut self) -> Result<PipeHandle, SdkError> {
        let pipe = unsafe { (self.client_vtbl().create_steam_pipe)(self.client) };
        if pipe == 0 {
            return Err(SdkError::PipeUnavailable);
        }
        Ok(pipe)
    }

    fn connect_to_global_user(&mut self, pipe: PipeHandle) -> Result<UserHandle, SdkError> {
        let user = unsafe { (self.client_vtbl().connect_to_global_user)(self.client, pipe) };
        if user == 0 {
            return Err(SdkError::NoGlobalUser);
        }
        Ok(user)
    }

    fn acquire_user(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError> {
        self.user = unsafe {
            (self.client_vtbl().get_steam_user)(
                self.client,
                user,
                pipe,
                STEAMUSER_INTERFACE_VERSION.as_ptr(),
            )
        };
        if self.user.is_null() {
            return Err(SdkError::MissingInterface("SteamUser019"));
        }
        Ok(())
    }

    fn acquire_friends(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError> {
        self.friends = unsafe {
            (self.client_vtbl().get_steam_friends)(
                self.client,
                user,
                pipe,
                STEAMFRIENDS_INTERFACE_VERSION.as_ptr(),
            )
        };
        if self.friends.is_null() {
            return Err(SdkError::MissingInterface("SteamFriends015"));
        }
        Ok(())
    }

    fn acquire_client_engine(&mut self) -> Result<(), SdkError> {
        self.engine = self.resolve_interface(CLIENTENGINE_INTERFACE_VERSION)?;
        Ok(())
    }

    fn acquire_remote_client_manager(&mut self, pipe: PipeHandle) -> Result<(), SdkError> {
        let get: unsafe extern "C" fn(*mut c_void, PipeHandle) -> *mut c_void =
            unsafe { vtable_slot(self.engine, ENGINE_SLOT_GET_CLIENT_REMOTE_MANAGER) };
        self.remote_manager = unsafe { get(self.engine, pipe) };
        if self.remote_manager.is_null() {
            return Err(SdkError::MissingInterface("IClientRemoteClientManager"));
        }
        Ok(())
    }

    fn acquire_app_manager(&mut self, user: UserHandle, pipe: PipeHandle) -> Result<(), SdkError> {
        let get: unsafe extern "C" fn(*mut c_void, UserHandle, PipeHandle) -> *mut c_void =
            unsafe { vtable_slot(self.engine, ENGINE_SLOT_GET_CLIENT_APP_MANAGER) };
        self.app_manager = unsafe { get(self.engine, user, pipe) };
        if self.app_manager.is_null() {
            return Err(SdkError::MissingInterface("IClientAppManager"));
        }
        Ok(())
    }

    fn release_user(&mut self, pipe: PipeHandle, user: UserHandle) {
        unsafe { (self.client_vtbl().release_user)(self.client, pipe, user) }
    }

    fn release_pipe(&mut self, pipe: PipeHandle) -> bool {
        unsafe { (self.client_vtbl().release_steam_pipe)(self.client, pipe) }
    }

    fn shutdown_if_all_pipes_closed(&mut self) {
        unsafe {
            (self.client_vtbl().shutdown_if_all_pipes_closed)(self.client);
        }
    }

    fn pump_callbacks(&mut self, pipe: PipeHandle, sink: &mut dyn FnMut(u32, &[u8])) {
        let (Some(get), Some(free)) = (self.get_callback, self.free_last_callback) else {
            return;
        };
        unsafe {
            let mut msg = CallbackMsg {
                user: 0,
                callback_id: 0,
                data: ptr::null_mut(),
                len: 0,
            };
            while get(pipe, &mut msg) {
                if !msg.data.is_null() && msg.len >= 0 {
                    let payload = std::slice::from_raw_parts(msg.data, msg.len as usize);
                    sink(msg.callback_id as u32, payload);
                }
                free(pipe);
            }
        }
    }

    fn signed_in_user(&mut self) -> SteamId {
        if self.user.is_null() {
            return 0;
        }
        unsafe {
            let vtbl = &*(*(self.user as *const Interface<SteamUserVtbl>)).vtbl;
            (vtbl.get_steam_id)(self.user)
        }
    }

    fn friend_game_played(&mut self, friend: SteamId) -> Option<u64> {
        if self.friends.is_null() {
            return None;
        }
        unsafe {
            let vtbl = &*(*(self.friends as *const Interface<SteamFriendsVtbl>)).vtbl;
            let mut info = FriendGameInfo {
                game_id: 0,
                game_ip: 0,
                game_port: 0,
                query_port: 0,
                lobby_id: 0,
            };
            if (vtbl.get_friend_game_played)(self.friends, friend, &mut info) {
                Some(info.game_id)
            } else {
                None
            }
        }
    }

    fn can_remote_play_together(&mut self, app_id: AppId) -> bool {
        if self.app_manager.is_null() {
            return false;
        }
        let probe: unsafe extern "C" fn(*mut c_void, AppId) -> bool =
            unsafe { vtable_slot(self.app_manager, APP_MGR_SLOT_CAN_REMOTE_PLAY_TOGETHER) };
        unsafe { probe(self.app_manager, app_id) }
    }

    fn create_invite_and_session(&mut self, player: RemotePlayer, app_id: AppId) -> bool {
        if self.remote_manager.is_null() {
            return false;
        }
        let create: unsafe extern "C" fn(*mut c_void, RemotePlayer, AppId) -> bool =
            unsafe { vtable_slot(self.remote_manager, REMOTE_MGR_SLOT_CREATE_INVITE_AND_SESSION) };
        unsafe { create(self.remote_manager, player, app_id) }
    }

    fn cancel_invite_and_session(&mut self, player: RemotePlayer) {
        if self.remote_manager.is_null() {
            return;
        }
        let cancel: unsafe extern "C" fn(*mut c_void, RemotePlayer) =
            unsafe { vtable_slot(self.remote_manager, REMOTE_MGR_SLOT_CANCEL_INVITE_AND_SESSION) };
        unsafe { cancel(self.remote_manager, player) }
    }

    fn is_streaming_session_active(&mut self) -> bool {
        if self.remote_manager.is_null() {
            return false;
        }
        let active: unsafe extern "C" fn(*mut c_void) -> bool = unsafe {
            vtable_slot(self.remote_manager, REMOTE_MGR_SLOT_IS_STREAMING_SESSION_ACTIVE)
        };
        unsafe { active(self.remote_manager) }
    }
}
