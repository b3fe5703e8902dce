// Core modules
pub mod config;
pub mod error;
pub mod execution;
pub mod feed;
pub mod frame;
pub mod indicators;
pub mod models;
pub mod registry;
pub mod strategy;

// Re-export commonly used types
pub use frame::{Frame, FrameBuilder};
pub use models::*;
pub use registry::PairRegistry;
pub use strategy::SignalEvaluator;
