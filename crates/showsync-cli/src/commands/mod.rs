pub mod clear;
pub mod config;
pub mod daemon;
pub mod status;
pub mod sync;
pub mod sync_ui;
