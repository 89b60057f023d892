pub mod admission;
pub mod anthropic;
pub mod branches;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod logging;
pub mod pipeline;
pub mod preprocess;
pub mod progress;
pub mod prompts;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod text;
pub mod ui;
