//! Defines the error types for the binding.
use crate::marshal::ContractViolation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    // --- Native-call failures (recoverable) ---
    #[error("failed to set floating-point parameter whose id is {key} with value {value}")]
    SetFloatParam { key: i32, value: f64 },
    #[error("failed to set integer parameter whose id is {key} with value {value}")]
    SetIntParam { key: i32, value: i32 },
    #[error("failed to get floating-point parameter whose id is {key}")]
    GetFloatParam { key: i32 },
    #[error("failed to get integer parameter whose id is {key}")]
    GetIntParam { key: i32 },

    /// The solver returned a null context. Treated as allocation failure.
    #[error("the solver could not allocate a new context")]
    ContextAllocation,
    #[error("handle has been released")]
    Released,

    // --- Library access ---
    #[error("no solver library is loaded; call load_library first")]
    LibraryNotLoaded,
    #[error("failed to load solver library '{path}': {reason}")]
    LibraryLoad { path: String, reason: String },
    #[error("solver library does not export '{symbol}': {reason}")]
    MissingSymbol { symbol: &'static str, reason: String },
    #[error("a solver library is already loaded from '{0}'")]
    AlreadyLoaded(String),

    // --- Caller bugs ---
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}
