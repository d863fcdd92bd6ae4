//! SteamStuff — Remote Play Together host shim
//!
//! Sits between a host application and the installed Steam client: brings
//! the client connection up and down, drives its callback pump, reports the
//! running game, and hosts Remote Play Together sessions — inviting guests,
//! cancelling invites, and surfacing session lifecycle events.
//!
//! Consumable either as a Rust library (an explicit [`ClientContext`] plus
//! an [`InviteHandler`]) or through the flat C surface in [`ffi`].

pub mod context;
pub mod ffi;
pub mod game_id;
pub mod invite;
pub mod sdk;

// Re-export commonly used types
pub use context::{CallbackHandler, ClientContext};
pub use game_id::{GameId, GameIdKind};
pub use invite::{InviteHandler, InvitedSink, SessionSink};
pub use sdk::native::NativeSdk;
pub use sdk::{RemotePlayer, SdkError, SteamId, SteamSdk};
