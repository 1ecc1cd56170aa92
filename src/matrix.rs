use std::fmt::{self, Display};

use ndarray::{Array1, Array2};

use crate::{errors::SimplexError, scalar::Scalar};

/// Dense grid of field elements.
///
/// Cells are addressed 1-based; the buffers returned by [`Matrix::row`] and
/// [`Matrix::column`] are ordinary 0-based arrays. Every operation preserves
/// the dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<F> {
    cells: Array2<F>,
}

impl<F: Scalar> Matrix<F> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            cells: Array2::from_elem((rows, cols), F::zero()),
        }
    }

    pub fn from_rows(rows: Vec<Vec<F>>) -> Result<Self, SimplexError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(SimplexError::ImproperInput(
                "rows of differing lengths".to_owned(),
            ));
        }
        let flat: Vec<F> = rows.into_iter().flatten().collect();
        let cells = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| SimplexError::ImproperInput(e.to_string()))?;
        Ok(Self { cells })
    }

    /// (rows, columns)
    pub fn dimensions(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> F {
        self.cells[[row - 1, col - 1]]
    }

    pub fn set(&mut self, row: usize, col: usize, value: F) {
        self.cells[[row - 1, col - 1]] = value;
    }

    pub fn row(&self, row: usize) -> Array1<F> {
        self.cells.row(row - 1).to_owned()
    }

    pub fn column(&self, col: usize) -> Array1<F> {
        self.cells.column(col - 1).to_owned()
    }

    pub fn set_row(&mut self, row: usize, values: &Array1<F>) {
        self.cells.row_mut(row - 1).assign(values);
    }

    pub fn set_column(&mut self, col: usize, values: &Array1<F>) {
        self.cells.column_mut(col - 1).assign(values);
    }

    /// row ← k·row, in place
    pub fn scale_row(&mut self, row: usize, k: F) {
        self.cells.row_mut(row - 1).map_inplace(|x| *x *= k);
    }

    /// row `target` ← row `target` − k·row `source`, in place
    pub fn sub_mult(&mut self, target: usize, source: usize, k: F) {
        let source = self.row(source);
        self.cells
            .row_mut(target - 1)
            .zip_mut_with(&source, |x, &y| *x -= k * y);
    }
}

impl<F: Scalar> Display for Matrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.outer_iter() {
            for cell in &row {
                write!(f, "{:<14} ", cell.to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use num::Rational64;
    use rstest::rstest;

    use crate::matrix::Matrix;

    fn int(n: i64) -> Rational64 {
        Rational64::from_integer(n)
    }

    fn sample() -> Matrix<Rational64> {
        Matrix::from_rows(vec![
            vec![int(1), int(2), int(3)],
            vec![int(4), int(5), int(6)],
        ])
        .unwrap()
    }

    #[rstest]
    fn zeros_has_requested_shape() {
        let m: Matrix<Rational64> = Matrix::zeros(3, 5);
        assert_eq!(m.dimensions(), (3, 5));
        assert_eq!(m.get(3, 5), int(0));
    }

    #[rstest]
    fn ragged_rows_are_rejected() {
        let ragged = Matrix::from_rows(vec![vec![int(1)], vec![int(1), int(2)]]);
        assert!(ragged.is_err());
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(1, 3, 3)]
    #[case(2, 2, 5)]
    fn get_is_one_indexed(#[case] row: usize, #[case] col: usize, #[case] expected: i64) {
        assert_eq!(sample().get(row, col), int(expected));
    }

    #[rstest]
    fn set_then_get() {
        let mut m = sample();
        m.set(2, 3, int(9));
        assert_eq!(m.get(2, 3), int(9));
        assert_eq!(m.dimensions(), (2, 3));
    }

    #[rstest]
    fn row_and_column_buffers_are_zero_indexed() {
        let m = sample();
        let row = m.row(2);
        assert_eq!(row.len(), 3);
        assert_eq!(row[0], int(4));
        let col = m.column(3);
        assert_eq!(col.len(), 2);
        assert_eq!(col[1], int(6));
    }

    #[rstest]
    fn overwrite_row_and_column() {
        let mut m = sample();
        m.set_row(1, &array![int(7), int(8), int(9)]);
        assert_eq!(m.row(1), array![int(7), int(8), int(9)]);
        m.set_column(2, &array![int(0), int(1)]);
        assert_eq!(m.column(2), array![int(0), int(1)]);
    }

    #[rstest]
    fn scale_row_in_place() {
        let mut m = sample();
        m.scale_row(2, Rational64::new(1, 2));
        assert_eq!(m.row(2), array![int(2), Rational64::new(5, 2), int(3)]);
        assert_eq!(m.row(1), array![int(1), int(2), int(3)]);
    }

    #[rstest]
    fn sub_mult_combines_rows() {
        let mut m = sample();
        m.sub_mult(2, 1, int(2));
        assert_eq!(m.row(2), array![int(2), int(1), int(0)]);
        assert_eq!(m.row(1), array![int(1), int(2), int(3)]);
    }
}
