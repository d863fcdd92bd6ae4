//! Console demonstration of the Remote Play host shim
//!
//! Connects to the running Steam client, reports the current game, invites
//! a friend (steam id given as the first argument) and tails the session
//! callbacks at 1 Hz.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;

use steam_stuff::{ClientContext, InviteHandler, NativeSdk};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let invitee: u64 = match env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .context("invitee steam id must be a 64-bit number")?,
        None => bail!("usage: steam-stuff-demo <invitee-steam-id>"),
    };

    let mut context = ClientContext::new(Box::new(NativeSdk::new()));
    if !context.init() {
        bail!("failed to initialize the steam client context — is the client running?");
    }

    let game = context.running_game_id();
    info!("running game: {:?} (packed {})", game, u64::from(game));
    if !game.is_valid() {
        bail!("no game running");
    }
    if !game.is_steam_app() {
        bail!("the running game is not a steam app");
    }

    let mut invites = InviteHandler::new();
    invites.set_on_invited(Some(Box::new(|invitee, guest_id, url| {
        info!("invite ready for {invitee}: guest {guest_id}, url {url}");
    })));
    invites.set_on_started(Some(Box::new(|invitee, guest_id| {
        info!("session started for {invitee} (guest {guest_id})");
    })));
    invites.set_on_stopped(Some(Box::new(|invitee, guest_id| {
        info!("session stopped for {invitee} (guest {guest_id})");
    })));

    let guest_id = invites.send_invite(context.sdk_mut(), invitee, game);
    if guest_id == 0 {
        bail!("invite refused: the running game cannot host remote play together");
    }
    info!("invite sent, guest id {guest_id}");

    loop {
        context.run_callbacks(&mut invites);
        thread::sleep(Duration::from_secs(1));
    }
}
