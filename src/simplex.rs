use std::iter::once;

use log::{debug, trace};

use crate::{
    errors::SimplexError,
    matrix::Matrix,
    scalar::{neg, Scalar},
};

/// A canonical tableau paired with the column-index lists recording which
/// variables are currently basic.
///
/// Row 1 holds the objective in z-row form: negated coefficients in the
/// variable columns and the current objective value in the last cell, so the
/// value climbs monotonically while pivoting and is the optimum at
/// termination. Rows 2..n are the constraint rows, with the value of each
/// basic variable in the last column. Every basic column is a unit column
/// whose `one` sits in a unique constraint row.
#[derive(Debug, Clone)]
pub struct System<F> {
    tableau: Matrix<F>,
    nonbasic: Vec<usize>,
    basic: Vec<usize>,
}

enum Step {
    Optimal,
    Enter(usize),
}

impl<F: Scalar> System<F> {
    /// Pair a tableau with its index lists. No validation; callers promise
    /// the canonical-form invariants.
    pub fn new(tableau: Matrix<F>, nonbasic: Vec<usize>, basic: Vec<usize>) -> Self {
        Self {
            tableau,
            nonbasic,
            basic,
        }
    }

    pub fn into_parts(self) -> (Matrix<F>, Vec<usize>, Vec<usize>) {
        (self.tableau, self.nonbasic, self.basic)
    }

    pub fn tableau(&self) -> &Matrix<F> {
        &self.tableau
    }

    pub fn nonbasic(&self) -> &[usize] {
        &self.nonbasic
    }

    pub fn basic(&self) -> &[usize] {
        &self.basic
    }

    /// The objective value of the current basic solution.
    pub fn objective_value(&self) -> F {
        let (_, width) = self.tableau.dimensions();
        self.tableau.get(1, width)
    }

    /// One Gauss-Jordan step: `entering` (nonbasic) replaces `leaving`
    /// (basic) in the basis. The pivot entry must be non-zero; the ratio test
    /// guarantees that for Phase II pivots.
    pub fn pivot(&mut self, entering: usize, leaving: usize) -> Result<(), SimplexError> {
        let (rows, _) = self.tableau.dimensions();
        let row = self.unit_row(leaving)?;
        let pivot = self.tableau.get(row, entering);
        if pivot == F::zero() {
            return Err(SimplexError::Invariant("pivot entry is zero"));
        }
        self.tableau.scale_row(row, F::one() / pivot);
        for r in 1..=rows {
            if r == row {
                continue;
            }
            let k = self.tableau.get(r, entering);
            if k != F::zero() {
                self.tableau.sub_mult(r, row, k);
            }
        }
        let basic = once(entering)
            .chain(self.basic.iter().copied().filter(|&j| j != leaving))
            .collect();
        let nonbasic = once(leaving)
            .chain(self.nonbasic.iter().copied().filter(|&j| j != entering))
            .collect();
        self.basic = basic;
        self.nonbasic = nonbasic;
        debug!("pivot: x{entering} entered against x{leaving} in row {row}");
        trace!("tableau:\n{}", self.tableau);
        #[cfg(debug_assertions)]
        self.check_canonical();
        Ok(())
    }

    /// The constraint row holding the unit `one` of a basic column. Row 1 is
    /// never a pivot row.
    fn unit_row(&self, col: usize) -> Result<usize, SimplexError> {
        let (rows, _) = self.tableau.dimensions();
        (2..=rows)
            .find(|&r| self.tableau.get(r, col) == F::one())
            .ok_or(SimplexError::Invariant("basic column has no unit entry"))
    }

    /// Bland's rule: the profitable nonbasic column of smallest index that
    /// has at least one positive entry below the objective row. Profitable
    /// columns with entirely non-positive entries mean the objective is
    /// unbounded.
    fn entering(&self) -> Result<Step, SimplexError> {
        let (rows, _) = self.tableau.dimensions();
        let mut columns = self.nonbasic.clone();
        columns.sort_unstable();
        let mut profitable = false;
        for j in columns {
            if self.tableau.get(1, j) < F::zero() {
                profitable = true;
                if (2..=rows).any(|r| self.tableau.get(r, j) > F::zero()) {
                    return Ok(Step::Enter(j));
                }
            }
        }
        if profitable {
            Err(SimplexError::Unbounded)
        } else {
            Ok(Step::Optimal)
        }
    }

    /// Minimum-ratio test over the positive entries of the entering column;
    /// the earliest row wins ties. Returns the basic column whose unit `one`
    /// sits in the chosen row.
    fn leaving(&self, entering: usize) -> Result<usize, SimplexError> {
        let (rows, width) = self.tableau.dimensions();
        let mut best: Option<(usize, F)> = None;
        for r in 2..=rows {
            let step = self.tableau.get(r, entering);
            if step > F::zero() {
                let ratio = self.tableau.get(r, width) / step;
                if best.map_or(true, |(_, smallest)| ratio < smallest) {
                    best = Some((r, ratio));
                }
            }
        }
        let (row, _) = best.ok_or(SimplexError::Invariant(
            "entering column has no positive entry",
        ))?;
        self.basic
            .iter()
            .copied()
            .find(|&j| self.tableau.get(row, j) == F::one())
            .ok_or(SimplexError::Invariant("pivot row owns no basic column"))
    }

    #[cfg(debug_assertions)]
    fn check_canonical(&self) {
        use std::collections::HashSet;

        let (rows, width) = self.tableau.dimensions();
        debug_assert_eq!(self.basic.len(), rows - 1);
        let mut seen = HashSet::new();
        for &j in self.basic.iter().chain(&self.nonbasic) {
            debug_assert!(j >= 1 && j < width, "column {j} out of range");
            debug_assert!(seen.insert(j), "column {j} listed twice");
        }
        debug_assert_eq!(seen.len(), width - 1);
        for &j in &self.basic {
            debug_assert!(self.tableau.get(1, j) == F::zero());
            let ones = (2..=rows)
                .filter(|&r| self.tableau.get(r, j) == F::one())
                .count();
            let zeros = (2..=rows)
                .filter(|&r| self.tableau.get(r, j) == F::zero())
                .count();
            debug_assert!(
                ones == 1 && ones + zeros == rows - 1,
                "column {j} is not a unit column"
            );
        }
    }
}

/// Phase II: pivot until no nonbasic column is profitable, then hand back the
/// optimum together with the final tableau.
pub fn simple_solve<F: Scalar>(mut sys: System<F>) -> Result<(F, System<F>), SimplexError> {
    loop {
        match sys.entering()? {
            Step::Optimal => {
                let optimum = sys.objective_value();
                return Ok((optimum, sys));
            }
            Step::Enter(entering) => {
                let leaving = sys.leaving(entering)?;
                let before = sys.objective_value();
                sys.pivot(entering, leaving)?;
                debug_assert!(
                    sys.objective_value() >= before,
                    "objective value decreased across a pivot"
                );
            }
        }
    }
}

/// Phase II, discarding the final tableau.
pub fn solve<F: Scalar>(sys: System<F>) -> Result<F, SimplexError> {
    simple_solve(sys).map(|(optimum, _)| optimum)
}

/// Phase I. The input is tableau-shaped: row 1 carries the objective
/// coefficients with the constant term in the last column, rows 2..m carry
/// the constraint coefficients with the right-hand side in the last column.
/// `Ok(None)` means the constraints admit no solution at all.
pub fn load_matrix<F: Scalar>(input: Matrix<F>) -> Result<Option<System<F>>, SimplexError> {
    let (rows, cols) = input.dimensions();
    if rows < 2 || cols < 2 {
        return Err(SimplexError::ImproperInput(format!(
            "a {rows}x{cols} tableau has no constraints or no variables"
        )));
    }
    let mut min_row = 2;
    for r in 3..=rows {
        if input.get(r, cols) < input.get(min_row, cols) {
            min_row = r;
        }
    }
    if input.get(min_row, cols) >= F::zero() {
        // every right-hand side is non-negative, so the origin is feasible
        Ok(Some(slack_form(&input)))
    } else {
        auxiliary_phase(&input, min_row)
    }
}

/// Slack-form tableau for an input whose origin is feasible: decision columns
/// first, one slack column per constraint row, right-hand sides last, and the
/// objective row flipped into z-row form.
fn slack_form<F: Scalar>(input: &Matrix<F>) -> System<F> {
    let (rows, cols) = input.dimensions();
    let width = rows + cols - 1;
    let mut tableau = Matrix::zeros(rows, width);
    for c in 1..cols {
        tableau.set(1, c, neg(input.get(1, c)));
        for r in 2..=rows {
            tableau.set(r, c, input.get(r, c));
        }
    }
    for r in 2..=rows {
        tableau.set(r, cols + r - 2, F::one());
        tableau.set(r, width, input.get(r, cols));
    }
    tableau.set(1, width, input.get(1, cols));
    System::new(tableau, (1..cols).collect(), (cols..width).collect())
}

/// Phase I proper: some right-hand side is negative, so minimize an
/// artificial variable that slackens every constraint at once. A zero
/// optimum yields a feasible basis for the original program; anything else
/// proves infeasibility.
fn auxiliary_phase<F: Scalar>(
    input: &Matrix<F>,
    min_row: usize,
) -> Result<Option<System<F>>, SimplexError> {
    let (rows, cols) = input.dimensions();
    let artificial = rows + cols - 1;
    let width = rows + cols;
    let mut tableau = Matrix::zeros(rows, width);
    for r in 2..=rows {
        for c in 1..cols {
            tableau.set(r, c, input.get(r, c));
        }
        tableau.set(r, cols + r - 2, F::one());
        tableau.set(r, artificial, neg(F::one()));
        tableau.set(r, width, input.get(r, cols));
    }
    tableau.set(1, artificial, F::one());

    let nonbasic = (1..cols).chain(once(artificial)).collect();
    let basic = (cols..artificial).collect();
    let mut sys = System::new(tableau, nonbasic, basic);

    // Forced pivot against the most violated row's slack: afterwards every
    // right-hand side is non-negative and the auxiliary program is canonical.
    sys.pivot(artificial, min_row + cols - 2)?;
    let (optimum, mut sys) = simple_solve(sys)?;
    if optimum != F::zero() {
        debug!("auxiliary optimum {optimum}, program is infeasible");
        return Ok(None);
    }
    drive_out(&mut sys, artificial)?;
    let sys = strip_column(sys, artificial);
    restore_objective(sys, input)
}

/// A degenerate optimum can leave the artificial variable in the basis at
/// value zero; swap it for any nonbasic column with a non-zero entry in its
/// row before the column is deleted.
fn drive_out<F: Scalar>(sys: &mut System<F>, artificial: usize) -> Result<(), SimplexError> {
    if !sys.basic.contains(&artificial) {
        return Ok(());
    }
    let row = sys.unit_row(artificial)?;
    let entering = sys
        .nonbasic
        .iter()
        .copied()
        .find(|&j| sys.tableau.get(row, j) != F::zero())
        .ok_or(SimplexError::Invariant(
            "no replacement column for the artificial variable",
        ))?;
    sys.pivot(entering, artificial)
}

/// Drop the artificial column. It sits directly before the right-hand-side
/// column, so every other column keeps its index.
fn strip_column<F: Scalar>(sys: System<F>, artificial: usize) -> System<F> {
    let (tableau, nonbasic, basic) = sys.into_parts();
    let (rows, width) = tableau.dimensions();
    let mut stripped = Matrix::zeros(rows, width - 1);
    for r in 1..=rows {
        for c in 1..artificial {
            stripped.set(r, c, tableau.get(r, c));
        }
        stripped.set(r, width - 1, tableau.get(r, width));
    }
    let nonbasic = nonbasic.into_iter().filter(|&j| j != artificial).collect();
    System::new(stripped, nonbasic, basic)
}

/// Write the original objective back over row 1 in z-row form, then cancel
/// the entries over basic columns so the tableau is canonical again and the
/// last cell holds the objective value of the feasible basis.
fn restore_objective<F: Scalar>(
    mut sys: System<F>,
    input: &Matrix<F>,
) -> Result<Option<System<F>>, SimplexError> {
    let (_, width) = sys.tableau.dimensions();
    let (_, cols) = input.dimensions();
    for c in 1..=width {
        sys.tableau.set(1, c, F::zero());
    }
    for c in 1..cols {
        sys.tableau.set(1, c, neg(input.get(1, c)));
    }
    sys.tableau.set(1, width, input.get(1, cols));
    for j in sys.basic.clone() {
        let row = sys.unit_row(j)?;
        let k = sys.tableau.get(1, j);
        if k != F::zero() {
            sys.tableau.sub_mult(1, row, k);
        }
    }
    Ok(Some(sys))
}
