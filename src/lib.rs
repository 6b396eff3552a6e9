// FFI Facade: Rust and Python access to the Knitro solver.
// The native library is reached through a function table; `context` owns a
// solver instance, `params` configures it and `marshal` moves arrays across.

pub mod bindings;
pub mod context;
pub mod error;
pub mod marshal;
pub mod native;
mod params;

pub use context::Context;
pub use error::BindingError;
pub use marshal::{
    count_abnormal, ContractViolation, ProblemDefinition, ProblemShape, SolveBuffers,
    SolveIteration,
};
pub use native::{load_library, FunctionTable, Status};

// --- Module Definition ---
/// This function defines the `_knitro` Python module.
/// The leading underscore marks it as the compiled half of a Python package.
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn _knitro(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    bindings::python::register(m)
}
