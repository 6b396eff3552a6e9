//! Validates caller-owned arrays and forwards them to `init_problem` and `solve`.
pub mod iteration;
pub mod problem;
pub mod shape;

pub use iteration::{SolveBuffers, SolveIteration};
pub use problem::{ProblemDefinition, ProblemShape};
pub use shape::{count_abnormal, ContractViolation, ElementKind, ShapeCheck, ShapeViolation};
