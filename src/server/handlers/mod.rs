pub mod health;
pub mod play;
pub mod stats;
pub mod sync;
pub mod videos;
