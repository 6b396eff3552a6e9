//! Managed-runtime surfaces over the safe Rust API.
#[cfg(feature = "python")]
pub mod python;
