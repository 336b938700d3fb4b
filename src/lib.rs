// src/lib.rs

pub mod alert;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod sentiment;

pub use error::{ConvoError, Result};
