//! The `_knitro` Python module.
//!
//! Arrays arrive through the buffer protocol (NumPy arrays, `array.array`,
//! memoryviews) and are handed to the solver without copying. Every
//! structural problem with them is collected into one `ContractViolation`.

use crate::context::Context;
use crate::error::BindingError;
use crate::marshal::iteration::BufferLengths;
use crate::marshal::{self, ElementKind, ProblemDefinition, ShapeCheck, ShapeViolation, SolveIteration};
use crate::native::{self, ffi, FunctionTable};
use pyo3::buffer::{Element, PyBuffer};
use pyo3::create_exception;
use pyo3::exceptions::{PyAssertionError, PyMemoryError, PyRuntimeError};
use pyo3::prelude::*;
use pyo3::types::PyMemoryView;
use std::ffi::CString;
use std::mem;
use std::sync::{Mutex, MutexGuard};

create_exception!(_knitro, KnitroError, PyRuntimeError, "A call into the solver failed.");
create_exception!(
    _knitro,
    ContractViolation,
    PyAssertionError,
    "Arrays passed to init or solve do not match each other or the problem."
);

fn to_py_err(e: BindingError) -> PyErr {
    match e {
        BindingError::ContextAllocation => PyMemoryError::new_err(e.to_string()),
        BindingError::Contract(violation) => ContractViolation::new_err(violation.to_string()),
        other => KnitroError::new_err(other.to_string()),
    }
}

fn contract_err(violation: marshal::ContractViolation) -> PyErr {
    to_py_err(BindingError::Contract(violation))
}

// --- Buffer arguments ---

/// A validated one-dimensional, contiguous buffer export.
///
/// Zero-length exports carry no buffer: exporters may hand out an unaligned
/// dummy pointer for them, which the typed request rejects.
struct ArrayArg<T: Element> {
    name: &'static str,
    buffer: Option<PyBuffer<T>>,
}

/// What `memoryview` reports about an export the typed request refused.
struct ExportInfo {
    format: String,
    itemsize: usize,
    ndim: usize,
    nbytes: usize,
    readonly: bool,
}

impl ExportInfo {
    fn read(obj: &Bound<'_, PyAny>) -> PyResult<Self> {
        let view = PyMemoryView::from(obj)?;
        Ok(Self {
            format: view.getattr("format")?.extract()?,
            itemsize: view.getattr("itemsize")?.extract()?,
            ndim: view.getattr("ndim")?.extract()?,
            nbytes: view.getattr("nbytes")?.extract()?,
            readonly: view.getattr("readonly")?.extract()?,
        })
    }

    fn holds<T: Element>(&self) -> bool {
        self.itemsize == mem::size_of::<T>()
            && CString::new(self.format.as_str()).is_ok_and(|format| T::is_compatible_format(&format))
    }
}

impl<T: Element> ArrayArg<T> {
    /// Requests the buffer and records any structural problem in `check`.
    /// Returns `None` when the buffer cannot be used at all.
    fn borrow(
        obj: &Bound<'_, PyAny>,
        name: &'static str,
        expected: ElementKind,
        writable: bool,
        check: &mut ShapeCheck,
    ) -> Option<Self> {
        let buffer = match PyBuffer::<T>::get(obj) {
            Ok(buffer) => buffer,
            Err(err) => return Self::fallback(obj, name, expected, writable, err, check),
        };
        if buffer.dimensions() != 1 {
            check.push(ShapeViolation::Dimensions { array: name, found: buffer.dimensions() });
            return None;
        }
        if !buffer.is_c_contiguous() {
            check.push(ShapeViolation::NotContiguous { array: name });
            return None;
        }
        if writable && buffer.readonly() {
            check.push(ShapeViolation::ReadOnly { array: name });
            return None;
        }
        Some(Self { name, buffer: Some(buffer) })
    }

    /// Classifies an export the typed request refused. Empty arrays of the
    /// right element type are accepted; anything else is a violation.
    fn fallback(
        obj: &Bound<'_, PyAny>,
        name: &'static str,
        expected: ElementKind,
        writable: bool,
        err: PyErr,
        check: &mut ShapeCheck,
    ) -> Option<Self> {
        let Ok(info) = ExportInfo::read(obj) else {
            check.push(ShapeViolation::Unreadable { array: name, reason: err.to_string() });
            return None;
        };
        if !info.holds::<T>() {
            check.push(ShapeViolation::ElementType { array: name, expected });
        } else if info.ndim != 1 {
            check.push(ShapeViolation::Dimensions { array: name, found: info.ndim });
        } else if info.nbytes != 0 {
            check.push(ShapeViolation::Unreadable { array: name, reason: err.to_string() });
        } else if writable && info.readonly {
            check.push(ShapeViolation::ReadOnly { array: name });
        } else {
            return Some(Self { name, buffer: None });
        }
        None
    }

    fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, PyBuffer::item_count)
    }

    fn byte_range(&self) -> (&'static str, usize, usize) {
        match &self.buffer {
            Some(buffer) => (self.name, buffer.buf_ptr() as usize, self.len() * mem::size_of::<T>()),
            None => (self.name, 0, 0),
        }
    }

    /// # Safety
    /// The exporter must not resize or free the storage while the slice lives.
    unsafe fn as_slice(&self) -> &[T] {
        match &self.buffer {
            Some(buffer) if self.len() > 0 => {
                std::slice::from_raw_parts(buffer.buf_ptr() as *const T, self.len())
            }
            _ => &[],
        }
    }

    /// # Safety
    /// As for `as_slice`, and no other live slice may cover the same storage.
    #[allow(clippy::mut_from_ref)]
    unsafe fn as_mut_slice(&self) -> &mut [T] {
        match &self.buffer {
            Some(buffer) if self.len() > 0 => {
                std::slice::from_raw_parts_mut(buffer.buf_ptr() as *mut T, self.len())
            }
            _ => &mut [],
        }
    }
}

fn floats(obj: &Bound<'_, PyAny>, name: &'static str, check: &mut ShapeCheck) -> Option<ArrayArg<f64>> {
    ArrayArg::borrow(obj, name, ElementKind::Float64, false, check)
}

fn ints(obj: &Bound<'_, PyAny>, name: &'static str, check: &mut ShapeCheck) -> Option<ArrayArg<i32>> {
    ArrayArg::borrow(obj, name, ElementKind::Int32, false, check)
}

fn out_floats(obj: &Bound<'_, PyAny>, name: &'static str, check: &mut ShapeCheck) -> Option<ArrayArg<f64>> {
    ArrayArg::borrow(obj, name, ElementKind::Float64, true, check)
}

// --- Handle ---

/// A solver context. Released by `close()`, by leaving a `with` block, or
/// when the object is collected, whichever comes first.
#[pyclass(name = "Knitro", module = "_knitro")]
pub struct PyKnitro {
    context: Mutex<Option<Context>>,
}

impl PyKnitro {
    fn open(table: &'static FunctionTable) -> PyResult<Self> {
        let context = Context::with_table(table).map_err(to_py_err)?;
        Ok(Self { context: Mutex::new(Some(context)) })
    }

    fn lock(&self) -> PyResult<MutexGuard<'_, Option<Context>>> {
        self.context
            .lock()
            .map_err(|_| KnitroError::new_err("handle lock poisoned by a panic"))
    }

    fn with_context<R>(&self, f: impl FnOnce(&mut Context) -> Result<R, BindingError>) -> PyResult<R> {
        let mut guard = self.lock()?;
        let context = guard.as_mut().ok_or_else(|| to_py_err(BindingError::Released))?;
        f(context).map_err(to_py_err)
    }
}

#[pymethods]
impl PyKnitro {
    #[new]
    fn new() -> PyResult<Self> {
        Self::open(native::default_table().map_err(to_py_err)?)
    }

    fn set_float_param(&self, key: i32, value: f64) -> PyResult<()> {
        self.with_context(|ctx| ctx.set_float_param(key, value))
    }

    fn set_int_param(&self, key: i32, value: i32) -> PyResult<()> {
        self.with_context(|ctx| ctx.set_int_param(key, value))
    }

    fn get_float_param(&self, key: i32) -> PyResult<f64> {
        self.with_context(|ctx| ctx.get_float_param(key))
    }

    fn get_int_param(&self, key: i32) -> PyResult<i32> {
        self.with_context(|ctx| ctx.get_int_param(key))
    }

    /// Registers the problem. Returns the solver's status code.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        n, obj_goal, obj_type, x_lo_bnds, x_up_bnds,
        m, c_type, c_lo_bnds, c_up_bnds,
        nnz_j, jac_index_vars, jac_index_cons,
        nnz_h, hess_index_rows, hess_index_cols,
        x_initial, lambda_initial=None
    ))]
    fn init(
        &self,
        n: i32,
        obj_goal: i32,
        obj_type: i32,
        x_lo_bnds: &Bound<'_, PyAny>,
        x_up_bnds: &Bound<'_, PyAny>,
        m: i32,
        c_type: &Bound<'_, PyAny>,
        c_lo_bnds: &Bound<'_, PyAny>,
        c_up_bnds: &Bound<'_, PyAny>,
        nnz_j: i32,
        jac_index_vars: &Bound<'_, PyAny>,
        jac_index_cons: &Bound<'_, PyAny>,
        nnz_h: i32,
        hess_index_rows: &Bound<'_, PyAny>,
        hess_index_cols: &Bound<'_, PyAny>,
        x_initial: &Bound<'_, PyAny>,
        lambda_initial: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<i32> {
        let mut check = ShapeCheck::new();
        let args = (
            floats(x_lo_bnds, "x_lo_bnds", &mut check),
            floats(x_up_bnds, "x_up_bnds", &mut check),
            ints(c_type, "c_type", &mut check),
            floats(c_lo_bnds, "c_lo_bnds", &mut check),
            floats(c_up_bnds, "c_up_bnds", &mut check),
            ints(jac_index_vars, "jac_index_vars", &mut check),
            ints(jac_index_cons, "jac_index_cons", &mut check),
            ints(hess_index_rows, "hess_index_rows", &mut check),
            ints(hess_index_cols, "hess_index_cols", &mut check),
            floats(x_initial, "x_initial", &mut check),
            // `None` marks an unusable buffer, `Some(None)` an omitted argument.
            match lambda_initial {
                Some(obj) => floats(obj, "lambda_initial", &mut check).map(Some),
                None => Some(None),
            },
        );
        let (
            Some(x_lo_bnds),
            Some(x_up_bnds),
            Some(c_type),
            Some(c_lo_bnds),
            Some(c_up_bnds),
            Some(jac_index_vars),
            Some(jac_index_cons),
            Some(hess_index_rows),
            Some(hess_index_cols),
            Some(x_initial),
            Some(lambda_initial),
        ) = args
        else {
            return Err(contract_err(check.into_violation()));
        };

        // SAFETY: the exports are held until the native call returns, and
        // the solver only reads from them.
        let problem = unsafe {
            ProblemDefinition {
                n,
                obj_goal,
                obj_type,
                x_lo_bnds: x_lo_bnds.as_slice(),
                x_up_bnds: x_up_bnds.as_slice(),
                m,
                c_type: c_type.as_slice(),
                c_lo_bnds: c_lo_bnds.as_slice(),
                c_up_bnds: c_up_bnds.as_slice(),
                nnz_j,
                jac_index_vars: jac_index_vars.as_slice(),
                jac_index_cons: jac_index_cons.as_slice(),
                nnz_h,
                hess_index_rows: hess_index_rows.as_slice(),
                hess_index_cols: hess_index_cols.as_slice(),
                x_initial: x_initial.as_slice(),
                lambda_initial: match &lambda_initial {
                    Some(arg) => Some(arg.as_slice()),
                    None => None,
                },
            }
        };
        self.with_context(|ctx| Ok(ctx.init(&problem)?))
    }

    /// Runs one solver step, updating the buffers in place. Returns the
    /// solver's status code.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (x, lambda_, eval_status, obj, c, obj_grad, jac, hess, hess_vector))]
    fn solve(
        &self,
        x: &Bound<'_, PyAny>,
        lambda_: &Bound<'_, PyAny>,
        eval_status: i32,
        obj: &Bound<'_, PyAny>,
        c: &Bound<'_, PyAny>,
        obj_grad: &Bound<'_, PyAny>,
        jac: &Bound<'_, PyAny>,
        hess: &Bound<'_, PyAny>,
        hess_vector: &Bound<'_, PyAny>,
    ) -> PyResult<i32> {
        let mut check = ShapeCheck::new();
        let args = (
            out_floats(x, "x", &mut check),
            out_floats(lambda_, "lambda", &mut check),
            out_floats(obj, "obj", &mut check),
            out_floats(c, "c", &mut check),
            out_floats(obj_grad, "obj_grad", &mut check),
            out_floats(jac, "jac", &mut check),
            out_floats(hess, "hess", &mut check),
            out_floats(hess_vector, "hess_vector", &mut check),
        );
        let (Some(x), Some(lambda), Some(obj), Some(c), Some(obj_grad), Some(jac), Some(hess), Some(hess_vector)) =
            args
        else {
            return Err(contract_err(check.into_violation()));
        };

        let lengths = BufferLengths {
            x: x.len(),
            lambda: lambda.len(),
            obj: obj.len(),
            c: c.len(),
            obj_grad: obj_grad.len(),
            jac: jac.len(),
            hess: hess.len(),
            hess_vector: hess_vector.len(),
        };
        check.disjoint(&[
            x.byte_range(),
            lambda.byte_range(),
            obj.byte_range(),
            c.byte_range(),
            obj_grad.byte_range(),
            jac.byte_range(),
            hess.byte_range(),
            hess_vector.byte_range(),
        ]);

        self.with_context(|ctx| {
            lengths.check(ctx.problem_shape(), &mut check);
            check.finish()?;

            // SAFETY: the exports are held and writable, and the ranges were
            // just checked to be pairwise disjoint.
            let mut iteration = unsafe {
                SolveIteration {
                    x: x.as_mut_slice(),
                    lambda: lambda.as_mut_slice(),
                    eval_status,
                    obj: obj.as_mut_slice(),
                    c: c.as_mut_slice(),
                    obj_grad: obj_grad.as_mut_slice(),
                    jac: jac.as_mut_slice(),
                    hess: hess.as_mut_slice(),
                    hess_vector: hess_vector.as_mut_slice(),
                }
            };
            Ok(ctx.solve(&mut iteration)?)
        })
    }

    /// Releases the native context. Safe to call more than once.
    fn close(&self) -> PyResult<()> {
        let context = self.lock()?.take();
        drop(context);
        Ok(())
    }

    #[getter]
    fn closed(&self) -> PyResult<bool> {
        Ok(self.lock()?.is_none())
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __exit__(
        &self,
        _exc_type: &Bound<'_, PyAny>,
        _exc_value: &Bound<'_, PyAny>,
        _traceback: &Bound<'_, PyAny>,
    ) -> PyResult<bool> {
        self.close()?;
        Ok(false)
    }
}

// --- Module functions ---

/// Opens the Knitro shared library at `path` for all handles created afterwards.
#[pyfunction]
fn load_library(path: &str) -> PyResult<()> {
    native::load_library(path).map(|_| ()).map_err(to_py_err)
}

#[pyfunction]
fn loaded_library_path() -> Option<String> {
    native::loaded_library_path().map(|p| p.display().to_string())
}

/// Number of infinite or NaN entries in a float64 array.
#[pyfunction]
fn count_abnormal(values: &Bound<'_, PyAny>) -> PyResult<usize> {
    let mut check = ShapeCheck::new();
    let Some(arg) = floats(values, "values", &mut check) else {
        return Err(contract_err(check.into_violation()));
    };
    // SAFETY: the export is held for the duration of the count.
    Ok(marshal::count_abnormal(unsafe { arg.as_slice() }))
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyKnitro>()?;
    m.add_function(wrap_pyfunction!(load_library, m)?)?;
    m.add_function(wrap_pyfunction!(loaded_library_path, m)?)?;
    m.add_function(wrap_pyfunction!(count_abnormal, m)?)?;
    m.add("KnitroError", m.py().get_type::<KnitroError>())?;
    m.add("ContractViolation", m.py().get_type::<ContractViolation>())?;

    m.add("INFBOUND", ffi::INFBOUND)?;
    m.add("OBJGOAL_MINIMIZE", ffi::OBJGOAL_MINIMIZE)?;
    m.add("OBJGOAL_MAXIMIZE", ffi::OBJGOAL_MAXIMIZE)?;
    m.add("OBJTYPE_GENERAL", ffi::OBJTYPE_GENERAL)?;
    m.add("OBJTYPE_LINEAR", ffi::OBJTYPE_LINEAR)?;
    m.add("OBJTYPE_QUADRATIC", ffi::OBJTYPE_QUADRATIC)?;
    m.add("CONTYPE_GENERAL", ffi::CONTYPE_GENERAL)?;
    m.add("CONTYPE_LINEAR", ffi::CONTYPE_LINEAR)?;
    m.add("CONTYPE_QUADRATIC", ffi::CONTYPE_QUADRATIC)?;
    m.add("PARAM_ALGORITHM", ffi::PARAM_ALGORITHM)?;
    m.add("PARAM_MAXIT", ffi::PARAM_MAXIT)?;
    m.add("PARAM_OUTLEV", ffi::PARAM_OUTLEV)?;
    m.add("PARAM_FEASTOL", ffi::PARAM_FEASTOL)?;
    m.add("PARAM_OPTTOL", ffi::PARAM_OPTTOL)?;
    Ok(())
}
