pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;
pub mod output;
pub mod render;
pub mod simulated;
