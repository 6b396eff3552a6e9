//! Raw FFI types for the Knitro C interface.
//!
//! These definitions follow the reverse-communication section of `knitro.h`.
//! Array arguments that the solver only reads are declared `*const`; the C
//! header leaves them unqualified, which is ABI-identical.

#![allow(non_camel_case_types)]

use libc::{c_double, c_int, c_void};
use std::fmt;

pub type Index = c_int;
pub type Number = c_double;

/// The integer every native call returns. Zero means success for the
/// parameter calls; for `init_problem` and `solve` the meaning belongs to the
/// solver.
pub type Status = c_int;

/// The opaque solver state. Only ever handled behind a pointer.
#[repr(C)]
pub struct KTR_context {
    _private: [u8; 0],
}

// --- Function Pointer Types ---

pub type New_FN = unsafe extern "C" fn() -> *mut KTR_context;

/// Frees the context and sets `*kc_handle` to null.
pub type Free_FN = unsafe extern "C" fn(kc_handle: *mut *mut KTR_context) -> Status;

pub type SetDoubleParam_FN =
    unsafe extern "C" fn(kc: *mut KTR_context, param_id: c_int, value: Number) -> Status;

pub type GetDoubleParam_FN =
    unsafe extern "C" fn(kc: *mut KTR_context, param_id: c_int, value: *mut Number) -> Status;

pub type SetIntParam_FN =
    unsafe extern "C" fn(kc: *mut KTR_context, param_id: c_int, value: c_int) -> Status;

pub type GetIntParam_FN =
    unsafe extern "C" fn(kc: *mut KTR_context, param_id: c_int, value: *mut c_int) -> Status;

pub type InitProblem_FN = unsafe extern "C" fn(
    kc: *mut KTR_context,
    n: Index,
    obj_goal: c_int,
    obj_type: c_int,
    x_lo_bnds: *const Number,
    x_up_bnds: *const Number,
    m: Index,
    c_type: *const c_int,
    c_lo_bnds: *const Number,
    c_up_bnds: *const Number,
    nnz_j: Index,
    jac_index_vars: *const Index,
    jac_index_cons: *const Index,
    nnz_h: Index,
    hess_index_rows: *const Index,
    hess_index_cols: *const Index,
    x_initial: *const Number,
    lambda_initial: *const Number,
) -> Status;

pub type Solve_FN = unsafe extern "C" fn(
    kc: *mut KTR_context,
    x: *mut Number,
    lambda: *mut Number,
    eval_status: c_int,
    obj: *mut Number,
    c: *mut Number,
    obj_grad: *mut Number,
    jac: *mut Number,
    hess: *mut Number,
    hess_vector: *mut Number,
    user_params: *mut c_void,
) -> Status;

/// The fixed set of entry points the binding calls into.
///
/// A table can come from the linked library, from a library opened at
/// runtime, or from any other implementation of the same C signatures.
#[derive(Clone, Copy)]
pub struct FunctionTable {
    pub new: New_FN,
    pub free: Free_FN,
    pub set_double_param: SetDoubleParam_FN,
    pub get_double_param: GetDoubleParam_FN,
    pub set_int_param: SetIntParam_FN,
    pub get_int_param: GetIntParam_FN,
    pub init_problem: InitProblem_FN,
    pub solve: Solve_FN,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("new", &(self.new as *const c_void))
            .field("free", &(self.free as *const c_void))
            .finish_non_exhaustive()
    }
}

// --- Well-known constants ---
// Keys and codes are opaque to the binding; these only spare callers from
// copying numbers out of `knitro.h`.

pub const INFBOUND: Number = 1.0e20;

pub const OBJGOAL_MINIMIZE: c_int = 0;
pub const OBJGOAL_MAXIMIZE: c_int = 1;

pub const OBJTYPE_GENERAL: c_int = 0;
pub const OBJTYPE_LINEAR: c_int = 1;
pub const OBJTYPE_QUADRATIC: c_int = 2;

pub const CONTYPE_GENERAL: c_int = 0;
pub const CONTYPE_LINEAR: c_int = 1;
pub const CONTYPE_QUADRATIC: c_int = 2;

pub const PARAM_ALGORITHM: c_int = 1003;
pub const PARAM_MAXIT: c_int = 1014;
pub const PARAM_OUTLEV: c_int = 1015;
pub const PARAM_FEASTOL: c_int = 1022;
pub const PARAM_OPTTOL: c_int = 1027;
