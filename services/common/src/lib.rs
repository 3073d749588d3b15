//! Common constants and error types shared by the simulation services

pub mod constants;
pub mod errors;

pub use constants::*;
pub use errors::*;
