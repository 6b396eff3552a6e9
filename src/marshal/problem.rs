//! The one-time problem definition passed to `KTR_init_problem`.

use super::shape::{ContractViolation, ShapeCheck};
use crate::context::Context;
use crate::native::Status;
use std::ptr;

/// Dimensions fixed by a problem definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProblemShape {
    /// Number of variables.
    pub n: usize,
    /// Number of constraints.
    pub m: usize,
    /// Nonzeros in the constraint Jacobian.
    pub nnz_j: usize,
    /// Nonzeros in the Hessian of the Lagrangian.
    pub nnz_h: usize,
}

impl ProblemShape {
    /// Length of the multiplier vector: one per constraint, then one per variable.
    pub fn multipliers(&self) -> usize {
        self.m + self.n
    }
}

/// Borrowed view of a problem: dimensions, bounds, sparsity patterns and the
/// starting point. The solver reads the slices in place during `init`.
#[derive(Debug, Clone, Copy)]
pub struct ProblemDefinition<'a> {
    pub n: i32,
    pub obj_goal: i32,
    pub obj_type: i32,
    pub x_lo_bnds: &'a [f64],
    pub x_up_bnds: &'a [f64],
    pub m: i32,
    pub c_type: &'a [i32],
    pub c_lo_bnds: &'a [f64],
    pub c_up_bnds: &'a [f64],
    pub nnz_j: i32,
    pub jac_index_vars: &'a [i32],
    pub jac_index_cons: &'a [i32],
    pub nnz_h: i32,
    pub hess_index_rows: &'a [i32],
    pub hess_index_cols: &'a [i32],
    pub x_initial: &'a [f64],
    pub lambda_initial: Option<&'a [f64]>,
}

impl ProblemDefinition<'_> {
    /// Checks every array against the declared dimensions.
    pub fn validate(&self) -> Result<ProblemShape, ContractViolation> {
        let mut check = ShapeCheck::new();
        let n = check.dimension("n", self.n);
        let m = check.dimension("m", self.m);
        let nnz_j = check.dimension("nnz_j", self.nnz_j);
        let nnz_h = check.dimension("nnz_h", self.nnz_h);

        check.length("x_lo_bnds", self.x_lo_bnds.len(), n, "n");
        check.length("x_up_bnds", self.x_up_bnds.len(), n, "n");
        check.length("c_type", self.c_type.len(), m, "m");
        check.length("c_lo_bnds", self.c_lo_bnds.len(), m, "m");
        check.length("c_up_bnds", self.c_up_bnds.len(), m, "m");
        check.length("jac_index_vars", self.jac_index_vars.len(), nnz_j, "nnz_j");
        check.length("jac_index_cons", self.jac_index_cons.len(), nnz_j, "nnz_j");
        check.length("hess_index_rows", self.hess_index_rows.len(), nnz_h, "nnz_h");
        check.length("hess_index_cols", self.hess_index_cols.len(), nnz_h, "nnz_h");
        check.length("x_initial", self.x_initial.len(), n, "n");
        if let Some(lambda) = self.lambda_initial {
            let multipliers = n.zip(m).map(|(n, m)| n + m);
            check.length("lambda_initial", lambda.len(), multipliers, "m+n");
        }

        check.finish()?;
        Ok(ProblemShape {
            n: n.unwrap_or_default(),
            m: m.unwrap_or_default(),
            nnz_j: nnz_j.unwrap_or_default(),
            nnz_h: nnz_h.unwrap_or_default(),
        })
    }
}

impl Context {
    /// Registers the problem with the solver.
    ///
    /// Nothing reaches the solver unless every array agrees with the declared
    /// dimensions. The native status is returned as-is: a nonzero value is
    /// the solver's verdict, not a binding error.
    pub fn init(&mut self, problem: &ProblemDefinition<'_>) -> Result<Status, ContractViolation> {
        let shape = problem.validate()?;
        let lambda_initial = problem.lambda_initial.map_or(ptr::null(), <[f64]>::as_ptr);

        let status = unsafe {
            (self.table().init_problem)(
                self.as_ptr(),
                problem.n,
                problem.obj_goal,
                problem.obj_type,
                problem.x_lo_bnds.as_ptr(),
                problem.x_up_bnds.as_ptr(),
                problem.m,
                problem.c_type.as_ptr(),
                problem.c_lo_bnds.as_ptr(),
                problem.c_up_bnds.as_ptr(),
                problem.nnz_j,
                problem.jac_index_vars.as_ptr(),
                problem.jac_index_cons.as_ptr(),
                problem.nnz_h,
                problem.hess_index_rows.as_ptr(),
                problem.hess_index_cols.as_ptr(),
                problem.x_initial.as_ptr(),
                lambda_initial,
            )
        };
        log::debug!(
            "init_problem n={} m={} nnz_j={} nnz_h={} -> status {}",
            shape.n,
            shape.m,
            shape.nnz_j,
            shape.nnz_h,
            status
        );
        self.register_shape(shape);
        Ok(status)
    }
}
