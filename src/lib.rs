//! tradesignal: technical indicators, multi-factor signal scoring and
//! risk-based position sizing over daily price bars.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
