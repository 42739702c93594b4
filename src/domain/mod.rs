//! Core domain types and logic.

pub mod price_series;
pub mod indicator;
pub mod regime;
pub mod crash;
pub mod universe;
pub mod momentum;
pub mod position;
pub mod book;
pub mod order;
pub mod order_engine;
pub mod accountant;
pub mod market;
pub mod cycle;
pub mod config_validation;
pub mod error;
