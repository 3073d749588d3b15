//! Test utilities and fixtures for the market simulation services
//!
//! This module provides:
//! - Standard engine configurations as rstest fixtures
//! - Scripted and switchable random sources
//! - A manually driven clock
//! - Factories for trades and book levels
//! - Invariant assertions over candles and snapshots

pub mod assertions;
pub mod factories;

pub use assertions::*;
pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
