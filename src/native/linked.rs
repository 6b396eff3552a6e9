//! Entry points resolved by the linker when built with the `link` feature.

#![allow(non_snake_case)]

use super::ffi::*;
use libc::{c_int, c_void};

#[link(name = "knitro")]
extern "C" {
    fn KTR_new() -> *mut KTR_context;

    fn KTR_free(kc_handle: *mut *mut KTR_context) -> Status;

    fn KTR_set_double_param(kc: *mut KTR_context, param_id: c_int, value: Number) -> Status;
    fn KTR_get_double_param(kc: *mut KTR_context, param_id: c_int, value: *mut Number) -> Status;
    fn KTR_set_int_param(kc: *mut KTR_context, param_id: c_int, value: c_int) -> Status;
    fn KTR_get_int_param(kc: *mut KTR_context, param_id: c_int, value: *mut c_int) -> Status;

    fn KTR_init_problem(
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

    fn KTR_solve(
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
}

/// The table backed by the library linked at build time.
pub static LINKED: FunctionTable = FunctionTable {
    new: KTR_new,
    free: KTR_free,
    set_double_param: KTR_set_double_param,
    get_double_param: KTR_get_double_param,
    set_int_param: KTR_set_int_param,
    get_int_param: KTR_get_int_param,
    init_problem: KTR_init_problem,
    solve: KTR_solve,
};
