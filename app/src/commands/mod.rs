pub mod ai;
pub mod event;
pub mod extensions;
pub mod frc;
pub mod general;
pub mod labgame;
pub mod remember;
pub mod research;
pub mod webhook;

use crate::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        ai::ask(),
        ai::ai_character(),
        webhook::webhook_send(),
        webhook::webhook_embed(),
        webhook::webhook_create(),
        webhook::webhook_list(),
        webhook::forward_setup(),
        research::research(),
        frc::frc_match(),
        frc::frc_events(),
        event::event(),
        remember::remember(),
        labgame::latesh(),
        general::help(),
        general::ping(),
        general::hi(),
        general::joke(),
        general::userinfo(),
        extensions::extensions(),
    ]
}
