// Library surface for headless/integration tests and reuse.
// Terminal rendering stays in the binary.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod elapsed;
pub mod error;
pub mod format;
pub mod history;
pub mod kv;
pub mod plan;
pub mod rest;
pub mod runtime;
pub mod session;
pub mod timer;
