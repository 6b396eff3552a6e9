//! The per-iteration buffers exchanged with `KTR_solve`.

use super::problem::ProblemShape;
use super::shape::{ContractViolation, ShapeCheck};
use crate::context::Context;
use crate::native::Status;
use std::ptr;

/// Mutable borrows of the buffers for one `solve` call.
///
/// The solver reads and writes them in place; the borrows end when the call
/// returns, so nothing the solver sees can outlive it.
#[derive(Debug)]
pub struct SolveIteration<'a> {
    pub x: &'a mut [f64],
    pub lambda: &'a mut [f64],
    /// Whether the evaluations requested by the previous call succeeded.
    /// Opaque to the binding.
    pub eval_status: i32,
    pub obj: &'a mut [f64],
    pub c: &'a mut [f64],
    pub obj_grad: &'a mut [f64],
    pub jac: &'a mut [f64],
    pub hess: &'a mut [f64],
    pub hess_vector: &'a mut [f64],
}

impl SolveIteration<'_> {
    /// Derives the dimensions from `x`, `c`, `jac` and `hess` and checks the
    /// other buffers against them. When `registered` is given (the shape
    /// passed to `init`), the derived dimensions must match it as well.
    pub fn validate(
        &self,
        registered: Option<ProblemShape>,
    ) -> Result<ProblemShape, ContractViolation> {
        let lengths = self.lengths();
        let mut check = ShapeCheck::new();
        lengths.check(registered, &mut check);
        check.finish()?;
        Ok(lengths.shape())
    }

    fn lengths(&self) -> BufferLengths {
        BufferLengths {
            x: self.x.len(),
            lambda: self.lambda.len(),
            obj: self.obj.len(),
            c: self.c.len(),
            obj_grad: self.obj_grad.len(),
            jac: self.jac.len(),
            hess: self.hess.len(),
            hess_vector: self.hess_vector.len(),
        }
    }
}

/// Element counts of the eight solve buffers, checked before any slice over
/// them is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BufferLengths {
    pub x: usize,
    pub lambda: usize,
    pub obj: usize,
    pub c: usize,
    pub obj_grad: usize,
    pub jac: usize,
    pub hess: usize,
    pub hess_vector: usize,
}

impl BufferLengths {
    /// Derives the dimensions from `x`, `c`, `jac` and `hess` and checks the
    /// other lengths against them, and against `registered` when given.
    pub(crate) fn check(&self, registered: Option<ProblemShape>, check: &mut ShapeCheck) {
        let n = check.derived("x", self.x);
        let m = check.derived("c", self.c);
        check.derived("jac", self.jac);
        check.derived("hess", self.hess);

        let multipliers = n.zip(m).map(|(n, m)| n + m);
        check.length("lambda", self.lambda, multipliers, "m+n");
        check.length("obj", self.obj, Some(1), "1");
        check.length("obj_grad", self.obj_grad, n, "n");
        check.length("hess_vector", self.hess_vector, n, "n");

        if let Some(shape) = registered {
            check.length("x", self.x, Some(shape.n), "n at init");
            check.length("c", self.c, Some(shape.m), "m at init");
            check.length("jac", self.jac, Some(shape.nnz_j), "nnz_j at init");
            check.length("hess", self.hess, Some(shape.nnz_h), "nnz_h at init");
        }
    }

    fn shape(&self) -> ProblemShape {
        ProblemShape {
            n: self.x,
            m: self.c,
            nnz_j: self.jac,
            nnz_h: self.hess,
        }
    }
}

impl Context {
    /// Runs one reverse-communication step of the solver.
    ///
    /// The returned status tells the driving loop what to evaluate next or
    /// that the solver has stopped; the binding does not interpret it.
    pub fn solve(&mut self, iteration: &mut SolveIteration<'_>) -> Result<Status, ContractViolation> {
        iteration.validate(self.problem_shape())?;

        let status = unsafe {
            (self.table().solve)(
                self.as_ptr(),
                iteration.x.as_mut_ptr(),
                iteration.lambda.as_mut_ptr(),
                iteration.eval_status,
                iteration.obj.as_mut_ptr(),
                iteration.c.as_mut_ptr(),
                iteration.obj_grad.as_mut_ptr(),
                iteration.jac.as_mut_ptr(),
                iteration.hess.as_mut_ptr(),
                iteration.hess_vector.as_mut_ptr(),
                ptr::null_mut(),
            )
        };
        log::trace!("solve eval_status={} -> status {}", iteration.eval_status, status);
        Ok(status)
    }
}

/// Owned buffers sized for a problem, for drivers written in Rust.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveBuffers {
    pub x: Vec<f64>,
    pub lambda: Vec<f64>,
    pub obj: [f64; 1],
    pub c: Vec<f64>,
    pub obj_grad: Vec<f64>,
    pub jac: Vec<f64>,
    pub hess: Vec<f64>,
    pub hess_vector: Vec<f64>,
}

impl SolveBuffers {
    pub fn new(shape: ProblemShape) -> Self {
        Self {
            x: vec![0.0; shape.n],
            lambda: vec![0.0; shape.multipliers()],
            obj: [0.0],
            c: vec![0.0; shape.m],
            obj_grad: vec![0.0; shape.n],
            jac: vec![0.0; shape.nnz_j],
            hess: vec![0.0; shape.nnz_h],
            hess_vector: vec![0.0; shape.n],
        }
    }

    /// Lends every buffer for one `solve` call.
    pub fn iteration(&mut self, eval_status: i32) -> SolveIteration<'_> {
        SolveIteration {
            x: &mut self.x,
            lambda: &mut self.lambda,
            eval_status,
            obj: &mut self.obj,
            c: &mut self.c,
            obj_grad: &mut self.obj_grad,
            jac: &mut self.jac,
            hess: &mut self.hess,
            hess_vector: &mut self.hess_vector,
        }
    }

    pub fn objective(&self) -> f64 {
        self.obj[0]
    }
}
