//! The converter service: mints durable short codes and resolves them.
//!
//! [`ConverterService`] ties the shard allocator, a record store and a
//! resolution cache together behind the [`Converter`] trait.

pub mod error;
pub mod service;

pub use error::StartupError;
pub use service::{ConverterService, MAX_ATTEMPTS};
pub use shortbase_core::{Converter, ConvertError, EncodeParams, Redirect, ShortCode};
