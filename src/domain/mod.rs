//! Core domain types and logic.

pub mod backtest;
pub mod batch;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod nav;
pub mod portfolio;
pub mod position;
pub mod screen;
pub mod signal;
pub mod strategy;
