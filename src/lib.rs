//! Page enhancements for the event landing page: preload splash, hero sizing,
//! scroll fade-in, countdown and share links.
//!
//! Everything outside [`frontend`] is plain Rust and is tested on the host.

pub mod config;
pub mod countdown;
pub mod fade;
pub mod hero;
pub mod preload;
pub mod share;
pub mod telemetry;

#[cfg(target_arch = "wasm32")]
pub mod frontend;
