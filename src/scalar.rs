use std::{fmt::Display, str::FromStr};

use num::{traits::NumAssign, Num};

/// An ordered field the solver can compute in.
///
/// Everything the engine does routes through these capabilities, so any
/// totally ordered field plugs in. The parser and CLI use `num::Rational64`
/// for exact arithmetic.
pub trait Scalar: Num + NumAssign + Copy + Ord + Display + FromStr {}

impl<T> Scalar for T where T: Num + NumAssign + Copy + Ord + Display + FromStr {}

/// Negation spelled with the field ops; `Neg` is not in the capability set.
pub fn neg<F: Scalar>(x: F) -> F {
    F::zero() - x
}

#[cfg(test)]
mod tests {
    use num::Rational64;
    use rstest::rstest;

    use crate::scalar::{neg, Scalar};

    fn sum_of_squares<F: Scalar>(values: &[F]) -> F {
        values
            .iter()
            .fold(F::zero(), |acc, &v| acc + v * v)
    }

    #[rstest]
    #[case(3, -3)]
    #[case(0, 0)]
    #[case(-7, 7)]
    fn test_neg(#[case] input: i64, #[case] expected: i64) {
        assert_eq!(
            neg(Rational64::from_integer(input)),
            Rational64::from_integer(expected)
        );
    }

    #[rstest]
    fn rationals_are_scalars() {
        let values = [Rational64::new(1, 2), Rational64::new(3, 2)];
        assert_eq!(sum_of_squares(&values), Rational64::new(5, 2));
    }

    #[rstest]
    fn parse_through_the_trait() {
        fn parse<F: Scalar>(s: &str) -> Option<F> {
            s.parse().ok()
        }

        assert_eq!(parse::<Rational64>("3/2"), Some(Rational64::new(3, 2)));
        assert_eq!(parse::<Rational64>("x"), None);
    }
}
