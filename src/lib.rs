pub mod cache;
pub mod config;
pub mod error;
pub mod playback;
pub mod server;
pub mod store;
pub mod sync;
pub mod vod;
