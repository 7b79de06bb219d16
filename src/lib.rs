pub mod application;
pub mod commands;
pub mod config;
pub mod exposure;
pub mod manifest;
pub mod runtime;
pub mod venv;
