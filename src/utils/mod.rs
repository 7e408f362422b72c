// Utility functions
pub mod error;
pub mod qr;

pub use error::*;
