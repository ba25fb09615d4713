//! Chat Wire Protocol
//!
//! This module contains the length-prefixed message framing and the
//! canonical room message formats.

pub mod codec;
pub mod constants;
pub mod format;

pub use constants::*;
