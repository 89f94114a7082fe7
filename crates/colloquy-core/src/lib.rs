//! Core types and error definitions for Colloquy.
//!
//! This crate provides the foundational types shared across all Colloquy
//! crates.
//!
//! # Main types
//!
//! - [`ColloquyError`]: Unified error enum for all Colloquy subsystems.
//! - [`ColloquyResult`]: Convenience alias for `Result<T, ColloquyError>`.
//! - [`Turn`]: One user/model exchange.
//! - [`Tone`]: Requested response register.
//! - [`ImageAttachment`]: Image bytes sent with a turn.

/// Error type and result alias.
pub mod error;
/// Turn, tone and image attachment types.
pub mod turn;

pub use error::{ColloquyError, ColloquyResult};
pub use turn::{mime_from_extension, ImageAttachment, Tone, Turn};
