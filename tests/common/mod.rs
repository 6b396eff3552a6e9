//! An in-process stand-in for the native solver.
//!
//! It speaks the same C signatures as the real library, records every call
//! per context, and runs a fixed-step projected-gradient loop through the
//! reverse-communication protocol so the binding can be driven end to end.

#![allow(dead_code)]

use knitro_bind::native::ffi::{Index, Number, PARAM_FEASTOL, PARAM_MAXIT, PARAM_OPTTOL, PARAM_OUTLEV};
use knitro_bind::native::{FunctionTable, KTR_context, Status};
use knitro_bind::{Context, ProblemDefinition};
use libc::{c_int, c_void};
use std::cell::Cell;
use std::collections::HashMap;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};

// --- Protocol codes of the stand-in ---

pub const RC_OPTIMAL: Status = 0;
pub const RC_EVALFC: Status = 1;
pub const RC_EVALGA: Status = 2;
pub const RC_ITER_LIMIT: Status = -400;
pub const RC_EVAL_ERR: Status = -500;
pub const RC_BAD_PARAM: Status = -510;
pub const RC_BAD_PROBLEM: Status = -515;
pub const RC_NOT_INITIALIZED: Status = -516;

const STEP: f64 = 0.25;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallLog {
    pub init_calls: usize,
    pub solve_calls: usize,
    pub free_calls: usize,
    pub saw_lambda_initial: bool,
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
static CALLS: LazyLock<Mutex<HashMap<usize, CallLog>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

thread_local! {
    static LAST_CREATED: Cell<Option<usize>> = const { Cell::new(None) };
}

fn record(id: usize, f: impl FnOnce(&mut CallLog)) {
    let mut calls = CALLS.lock().unwrap_or_else(|e| e.into_inner());
    f(calls.entry(id).or_default());
}

/// Call log of a context created by the stand-in.
pub fn calls(id: usize) -> CallLog {
    CALLS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(&id)
        .cloned()
        .unwrap_or_default()
}

/// Id of the last context the stand-in created on this thread.
pub fn last_created() -> usize {
    LAST_CREATED.with(|c| c.get()).expect("no context created on this thread")
}

/// Creates a context on the stand-in and returns it with its id.
pub fn new_context() -> (Context, usize) {
    let context = Context::with_table(&MOCK).expect("stand-in never returns null");
    (context, last_created())
}

// --- State behind the opaque pointer ---

enum Phase {
    Start,
    AwaitObjective,
    AwaitGradient,
    Finished(Status),
}

struct Problem {
    n: usize,
    lo: Vec<f64>,
    up: Vec<f64>,
    x0: Vec<f64>,
}

struct MockContext {
    id: usize,
    int_params: HashMap<c_int, c_int>,
    float_params: HashMap<c_int, f64>,
    problem: Option<Problem>,
    phase: Phase,
    iterations: c_int,
}

impl MockContext {
    fn new(id: usize) -> Self {
        Self {
            id,
            int_params: HashMap::from([(PARAM_MAXIT, 10_000), (PARAM_OUTLEV, 2)]),
            float_params: HashMap::from([(PARAM_OPTTOL, 1.0e-6), (PARAM_FEASTOL, 1.0e-6)]),
            problem: None,
            phase: Phase::Start,
            iterations: 0,
        }
    }
}

unsafe fn state<'a>(kc: *mut KTR_context) -> &'a mut MockContext {
    &mut *kc.cast::<MockContext>()
}

unsafe fn read<T: Copy>(p: *const T, len: usize) -> Vec<T> {
    if len == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(p, len).to_vec()
    }
}

// --- Entry points ---

unsafe extern "C" fn mock_new() -> *mut KTR_context {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    record(id, |_| {});
    LAST_CREATED.with(|c| c.set(Some(id)));
    Box::into_raw(Box::new(MockContext::new(id))).cast()
}

unsafe extern "C" fn mock_free(kc_handle: *mut *mut KTR_context) -> Status {
    if kc_handle.is_null() || (*kc_handle).is_null() {
        return -1;
    }
    let context = Box::from_raw((*kc_handle).cast::<MockContext>());
    *kc_handle = ptr::null_mut();
    record(context.id, |log| log.free_calls += 1);
    0
}

unsafe extern "C" fn mock_set_double_param(kc: *mut KTR_context, key: c_int, value: Number) -> Status {
    let ctx = state(kc);
    match ctx.float_params.get_mut(&key) {
        Some(slot) if value > 0.0 => {
            *slot = value;
            0
        }
        _ => RC_BAD_PARAM,
    }
}

unsafe extern "C" fn mock_get_double_param(kc: *mut KTR_context, key: c_int, value: *mut Number) -> Status {
    match state(kc).float_params.get(&key) {
        Some(v) => {
            *value = *v;
            0
        }
        None => RC_BAD_PARAM,
    }
}

unsafe extern "C" fn mock_set_int_param(kc: *mut KTR_context, key: c_int, value: c_int) -> Status {
    let ctx = state(kc);
    match ctx.int_params.get_mut(&key) {
        Some(slot) if value >= 0 => {
            *slot = value;
            0
        }
        _ => RC_BAD_PARAM,
    }
}

unsafe extern "C" fn mock_get_int_param(kc: *mut KTR_context, key: c_int, value: *mut c_int) -> Status {
    match state(kc).int_params.get(&key) {
        Some(v) => {
            *value = *v;
            0
        }
        None => RC_BAD_PARAM,
    }
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn mock_init_problem(
    kc: *mut KTR_context,
    n: Index,
    _obj_goal: c_int,
    _obj_type: c_int,
    x_lo_bnds: *const Number,
    x_up_bnds: *const Number,
    _m: Index,
    _c_type: *const c_int,
    _c_lo_bnds: *const Number,
    _c_up_bnds: *const Number,
    _nnz_j: Index,
    _jac_index_vars: *const Index,
    _jac_index_cons: *const Index,
    _nnz_h: Index,
    _hess_index_rows: *const Index,
    _hess_index_cols: *const Index,
    x_initial: *const Number,
    lambda_initial: *const Number,
) -> Status {
    let ctx = state(kc);
    record(ctx.id, |log| {
        log.init_calls += 1;
        log.saw_lambda_initial = !lambda_initial.is_null();
    });
    if n < 0 {
        return RC_BAD_PROBLEM;
    }
    let n = n as usize;
    ctx.problem = Some(Problem {
        n,
        lo: read(x_lo_bnds, n),
        up: read(x_up_bnds, n),
        x0: read(x_initial, n),
    });
    ctx.phase = Phase::Start;
    ctx.iterations = 0;
    0
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn mock_solve(
    kc: *mut KTR_context,
    x: *mut Number,
    _lambda: *mut Number,
    eval_status: c_int,
    _obj: *mut Number,
    _c: *mut Number,
    obj_grad: *mut Number,
    _jac: *mut Number,
    _hess: *mut Number,
    _hess_vector: *mut Number,
    _user_params: *mut c_void,
) -> Status {
    let ctx = state(kc);
    record(ctx.id, |log| log.solve_calls += 1);
    let Some(problem) = ctx.problem.as_ref() else {
        return RC_NOT_INITIALIZED;
    };
    if eval_status != 0 {
        ctx.phase = Phase::Finished(RC_EVAL_ERR);
    }
    let n = problem.n;
    let x: &mut [f64] = if n == 0 { &mut [] } else { slice::from_raw_parts_mut(x, n) };
    let clamp = |i: usize, v: f64| v.clamp(problem.lo[i], problem.up[i]);

    match ctx.phase {
        Phase::Start => {
            for i in 0..n {
                x[i] = clamp(i, problem.x0[i]);
            }
            ctx.phase = Phase::AwaitObjective;
            RC_EVALFC
        }
        Phase::AwaitObjective => {
            ctx.phase = Phase::AwaitGradient;
            RC_EVALGA
        }
        Phase::AwaitGradient => {
            let grad: &[f64] = if n == 0 { &[] } else { slice::from_raw_parts(obj_grad, n) };
            let stationarity = (0..n)
                .map(|i| (clamp(i, x[i] - grad[i]) - x[i]).abs())
                .fold(0.0, f64::max);
            if stationarity <= ctx.float_params[&PARAM_OPTTOL] {
                ctx.phase = Phase::Finished(RC_OPTIMAL);
                return RC_OPTIMAL;
            }
            if ctx.iterations >= ctx.int_params[&PARAM_MAXIT] {
                ctx.phase = Phase::Finished(RC_ITER_LIMIT);
                return RC_ITER_LIMIT;
            }
            ctx.iterations += 1;
            for i in 0..n {
                x[i] = clamp(i, x[i] - STEP * grad[i]);
            }
            ctx.phase = Phase::AwaitObjective;
            RC_EVALFC
        }
        Phase::Finished(status) => status,
    }
}

unsafe extern "C" fn null_new() -> *mut KTR_context {
    ptr::null_mut()
}

const MOCK_TABLE: FunctionTable = FunctionTable {
    new: mock_new,
    free: mock_free,
    set_double_param: mock_set_double_param,
    get_double_param: mock_get_double_param,
    set_int_param: mock_set_int_param,
    get_int_param: mock_get_int_param,
    init_problem: mock_init_problem,
    solve: mock_solve,
};

/// The stand-in's function table.
pub static MOCK: FunctionTable = MOCK_TABLE;

/// A table whose constructor always fails.
pub static EXHAUSTED: FunctionTable = FunctionTable { new: null_new, ..MOCK_TABLE };

// --- Problem fixtures ---

/// Owned arrays for a problem definition.
#[derive(Debug, Clone)]
pub struct ProblemData {
    pub n: i32,
    pub m: i32,
    pub nnz_j: i32,
    pub nnz_h: i32,
    pub x_lo_bnds: Vec<f64>,
    pub x_up_bnds: Vec<f64>,
    pub c_type: Vec<i32>,
    pub c_lo_bnds: Vec<f64>,
    pub c_up_bnds: Vec<f64>,
    pub jac_index_vars: Vec<i32>,
    pub jac_index_cons: Vec<i32>,
    pub hess_index_rows: Vec<i32>,
    pub hess_index_cols: Vec<i32>,
    pub x_initial: Vec<f64>,
    pub lambda_initial: Option<Vec<f64>>,
}

impl ProblemData {
    /// Two variables within the given bounds, no constraints, no derivatives
    /// beyond the gradient.
    pub fn bounded(lo: [f64; 2], up: [f64; 2]) -> Self {
        Self {
            n: 2,
            m: 0,
            nnz_j: 0,
            nnz_h: 0,
            x_lo_bnds: lo.to_vec(),
            x_up_bnds: up.to_vec(),
            c_type: vec![],
            c_lo_bnds: vec![],
            c_up_bnds: vec![],
            jac_index_vars: vec![],
            jac_index_cons: vec![],
            hess_index_rows: vec![],
            hess_index_cols: vec![],
            x_initial: vec![0.0, 0.0],
            lambda_initial: None,
        }
    }

    /// Three variables and one dense constraint row, with a diagonal Hessian.
    pub fn constrained() -> Self {
        Self {
            n: 3,
            m: 1,
            nnz_j: 3,
            nnz_h: 3,
            x_lo_bnds: vec![-1.0e20; 3],
            x_up_bnds: vec![1.0e20; 3],
            c_type: vec![0],
            c_lo_bnds: vec![0.0],
            c_up_bnds: vec![0.0],
            jac_index_vars: vec![0, 1, 2],
            jac_index_cons: vec![0, 0, 0],
            hess_index_rows: vec![0, 1, 2],
            hess_index_cols: vec![0, 1, 2],
            x_initial: vec![0.0; 3],
            lambda_initial: Some(vec![0.0; 4]),
        }
    }

    pub fn definition(&self) -> ProblemDefinition<'_> {
        ProblemDefinition {
            n: self.n,
            obj_goal: 0,
            obj_type: 0,
            x_lo_bnds: &self.x_lo_bnds,
            x_up_bnds: &self.x_up_bnds,
            m: self.m,
            c_type: &self.c_type,
            c_lo_bnds: &self.c_lo_bnds,
            c_up_bnds: &self.c_up_bnds,
            nnz_j: self.nnz_j,
            jac_index_vars: &self.jac_index_vars,
            jac_index_cons: &self.jac_index_cons,
            nnz_h: self.nnz_h,
            hess_index_rows: &self.hess_index_rows,
            hess_index_cols: &self.hess_index_cols,
            x_initial: &self.x_initial,
            lambda_initial: self.lambda_initial.as_deref(),
        }
    }
}
