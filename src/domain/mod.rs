pub mod analytics;
pub mod bar;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod orchestrator;
pub mod policy;
pub mod position;
pub mod rsi_sma;
