//! Receipt bot: relays receipt QR data from Telegram to the receipt API.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod relay;
