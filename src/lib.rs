//! Two-phase Simplex solver for linear programs in standard form.
//!
//! The engine pivots a canonical tableau generic over any totally ordered
//! field; the bundled parser reads a small textual LP format into exact
//! rationals. Infeasibility is reported as `None` from the loading entry
//! points, unboundedness as an error from [`solve`].

pub mod errors;
pub mod matrix;
pub mod parser;
pub mod scalar;
pub mod simplex;

use std::{fs::read_to_string, path::Path};

use num::Rational64;

pub use crate::errors::SimplexError;
pub use crate::matrix::Matrix;
pub use crate::parser::{Constraint, Goal, Program, Relation};
pub use crate::scalar::Scalar;
pub use crate::simplex::{load_matrix, simple_solve, solve, System};

/// Parse an LP file and run Phase I on it. `Ok(None)` means the program is
/// infeasible.
pub fn load_file(path: impl AsRef<Path>) -> Result<Option<System<Rational64>>, SimplexError> {
    let program: Program = read_to_string(path)?.parse()?;
    load_matrix(program.to_matrix())
}

/// Solve a parsed program end to end, reporting the optimum in the sense the
/// program asked for: minima come back as minima, not as the negated internal
/// maximum.
pub fn optimize(program: &Program) -> Result<Option<Rational64>, SimplexError> {
    match load_matrix(program.to_matrix())? {
        None => Ok(None),
        Some(system) => {
            let optimum = solve(system)?;
            Ok(Some(match program.goal {
                Goal::Maximize => optimum,
                Goal::Minimize => -optimum,
            }))
        }
    }
}
