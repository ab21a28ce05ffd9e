pub mod actors;
pub mod alerts;
pub mod config;
pub mod diagnostics;
pub mod discord;
pub mod monitors;
pub mod source;
pub mod targets;
pub mod util;
