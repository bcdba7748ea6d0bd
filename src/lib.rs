//! oceanctl - command-line client for the DigitalOcean control plane

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod displayers;
pub mod exitcode;
pub mod framework;
pub mod logging;
pub mod output;
