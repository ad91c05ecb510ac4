//! Discord side of the bot: slash commands in, replies and status cards out.

pub mod commands;
pub mod definitions;
pub mod discord;
pub mod embed;
pub mod interactions;
pub mod notifier;
