//! Core domain types and logic.

pub mod bar;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod indicator_service;
pub mod position;
pub mod signal;
pub mod signal_generator;
pub mod summary;
pub mod universe;
