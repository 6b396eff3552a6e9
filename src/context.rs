//! Ownership of a native solver context.

use crate::error::BindingError;
use crate::marshal::ProblemShape;
use crate::native::{self, FunctionTable, KTR_context};
use std::fmt;
use std::ptr::NonNull;

/// Exclusive owner of one native context.
///
/// The context is freed exactly once, when this value is dropped. It cannot
/// be cloned, compared or serialized, and the raw pointer never leaves the
/// crate.
pub struct Context {
    raw: NonNull<KTR_context>,
    table: &'static FunctionTable,
    shape: Option<ProblemShape>,
}

// A context has no thread affinity. It is not `Sync`: the solver is not
// reentrant on one context, so calls go through the single owner.
unsafe impl Send for Context {}

impl Context {
    /// Creates a context from the process-wide function table.
    pub fn new() -> Result<Self, BindingError> {
        Self::with_table(native::default_table()?)
    }

    /// Creates a context through an explicit function table.
    pub fn with_table(table: &'static FunctionTable) -> Result<Self, BindingError> {
        let raw = unsafe { (table.new)() };
        let raw = NonNull::new(raw).ok_or(BindingError::ContextAllocation)?;
        log::debug!("created solver context {:p}", raw);
        Ok(Self {
            raw,
            table,
            shape: None,
        })
    }

    /// Dimensions registered by the last `init`, if any.
    pub fn problem_shape(&self) -> Option<ProblemShape> {
        self.shape
    }

    pub(crate) fn as_ptr(&self) -> *mut KTR_context {
        self.raw.as_ptr()
    }

    pub(crate) fn table(&self) -> &'static FunctionTable {
        self.table
    }

    pub(crate) fn register_shape(&mut self, shape: ProblemShape) {
        self.shape = Some(shape);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let mut raw = self.raw.as_ptr();
        let status = unsafe { (self.table.free)(&mut raw) };
        if status == 0 {
            log::debug!("freed solver context {:p}", self.raw);
        } else {
            log::warn!("freeing solver context {:p} returned status {}", self.raw, status);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
