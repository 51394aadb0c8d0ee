mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod link;
pub mod pipeline;
pub mod playback;
pub mod state;
pub mod tools;
pub mod transcript;
pub mod vad;

pub use aura_realtime_types as types;
pub use aura_realtime_utils as utils;

pub use client::{connect, connect_with_config, Client, ServerRx};
pub use engine::SessionEngine;
pub use error::SessionError;
