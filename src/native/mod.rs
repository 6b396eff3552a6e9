//! Access to the native solver: raw FFI types and the function table.
pub mod ffi;
#[cfg(feature = "link")]
pub mod linked;
mod loader;

pub use ffi::{FunctionTable, KTR_context, Status};
pub use loader::{default_table, load_library, loaded_library_path};
