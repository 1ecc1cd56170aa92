use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, line_ending, one_of, space0, space1},
    combinator::{opt, recognize},
    error::{context, convert_error, ContextError, ErrorKind, ParseError, VerboseError},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, preceded},
    IResult, Parser,
};
use num::Rational64;

use crate::{errors::SimplexError, matrix::Matrix, scalar::Scalar};

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Goal {
    Maximize,
    Minimize,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Relation {
    Equal,
    Less,
    Greater,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Constraint {
    pub coefficients: Vec<Rational64>,
    pub relation: Relation,
    pub rhs: Rational64,
}

/// A parsed LP file: the goal line, the objective coefficients with the
/// constant term last, and one entry per constraint line.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    pub goal: Goal,
    pub objective: Vec<Rational64>,
    pub constraints: Vec<Constraint>,
}

enum ConstraintToken {
    Rel(Relation),
    Number(Rational64),
}

/// A combinator that takes a parser `inner` and produces a parser that also
/// consumes leading and trailing spaces, returning the output of `inner`.
/// Line endings are left alone; the format is line-oriented.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, O, E>
where
    F: Parser<&'a str, O, E>,
    E: ParseError<&'a str>,
{
    delimited(space0, inner, space0)
}

fn digits<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str>,
{
    recognize(many1(one_of("0123456789"))).parse(input)
}

fn decimal<'a, E>(input: &'a str) -> IResult<&'a str, i64, E>
where
    E: ParseError<&'a str>,
{
    let (rest, text) = digits.parse(input)?;
    match text.parse() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(overflow(input)),
    }
}

fn overflow<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::Err<E> {
    nom::Err::Error(E::from_error_kind(input, ErrorKind::Digit))
}

/// (+|-)?<0..9>+('.'<0..9>*)?
fn coefficient<'a, E>() -> impl Parser<&'a str, Rational64, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context("coefficient", move |s: &'a str| {
        let (rest, sign) = opt(one_of("+-")).parse(s)?;
        let (rest, whole) = decimal.parse(rest)?;
        let (rest, frac) = opt(preceded(tag("."), opt(digits))).parse(rest)?;

        let number = match frac.flatten() {
            Some(text) => {
                let numer: i64 = text.parse().map_err(|_| overflow(s))?;
                let denom = 10_i64
                    .checked_pow(text.len() as u32)
                    .ok_or_else(|| overflow(s))?;
                Rational64::from_integer(whole) + Rational64::new(numer, denom)
            }
            None => Rational64::from_integer(whole),
        };

        Ok((
            rest,
            if let Some('-') = sign {
                -number
            } else {
                number
            },
        ))
    })
}

/// '<='|'>='|'='
fn relation<'a, E>() -> impl Parser<&'a str, Relation, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context("relation", |s| {
        let (rest, token) = alt((tag("<="), tag(">="), tag("="))).parse(s)?;

        Ok((
            rest,
            match token {
                "<=" => Relation::Less,
                ">=" => Relation::Greater,
                _ => Relation::Equal,
            },
        ))
    })
}

/// 'min'|'max'
fn goal<'a, E>() -> impl Parser<&'a str, Goal, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context(
        "goal",
        alt((
            tag_no_case("max").map(|_| Goal::Maximize),
            tag_no_case("min").map(|_| Goal::Minimize),
        )),
    )
}

fn subject_to<'a, E>() -> impl Parser<&'a str, (), E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context("subject to", |s| {
        let (s, _) = tag_no_case("subject").parse(s)?;
        let (s, _) = space1(s)?;
        let (s, _) = tag_no_case("to").parse(s)?;
        Ok((s, ()))
    })
}

fn constraint_token<'a, E>() -> impl Parser<&'a str, ConstraintToken, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    alt((
        relation().map(ConstraintToken::Rel),
        coefficient().map(ConstraintToken::Number),
    ))
}

/// ([token] *',')+ with the relation sitting among the tokens; it is sorted
/// out after parsing
fn constraint_line<'a, E>() -> impl Parser<&'a str, Vec<ConstraintToken>, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context(
        "constraint",
        ws(separated_list1(ws(char(',')), constraint_token())),
    )
}

type Parsed = (Goal, Vec<Rational64>, Vec<Vec<ConstraintToken>>);

fn program<'a, E>() -> impl Parser<&'a str, Parsed, E>
where
    E: ParseError<&'a str> + ContextError<&'a str>,
{
    context("program", |s| {
        let (s, goal) = ws(goal()).parse(s)?;
        let (s, _) = line_ending(s)?;
        let (s, objective) = ws(separated_list1(ws(char(',')), coefficient())).parse(s)?;
        let (s, _) = line_ending(s)?;
        let (s, _) = ws(subject_to()).parse(s)?;
        let (s, lines) = many0(preceded(line_ending, constraint_line())).parse(s)?;

        Ok((s, (goal, objective, lines)))
    })
}

fn split_constraint(
    line: usize,
    tokens: Vec<ConstraintToken>,
    variables: usize,
) -> Result<Constraint, SimplexError> {
    let mut coefficients = Vec::new();
    let mut relation = None;
    let mut rhs = Vec::new();
    for token in tokens {
        match token {
            ConstraintToken::Rel(r) => {
                if relation.replace(r).is_some() {
                    return Err(SimplexError::ImproperInput(format!(
                        "constraint {line} has more than one relation"
                    )));
                }
            }
            ConstraintToken::Number(c) => match relation {
                None => coefficients.push(c),
                Some(_) => rhs.push(c),
            },
        }
    }
    let relation = relation.ok_or_else(|| {
        SimplexError::ImproperInput(format!("constraint {line} has no relation"))
    })?;
    if rhs.len() != 1 {
        return Err(SimplexError::ImproperInput(format!(
            "constraint {line} needs exactly one right-hand side, got {}",
            rhs.len()
        )));
    }
    if coefficients.len() != variables {
        return Err(SimplexError::ImproperInput(format!(
            "constraint {line} has {} coefficients, expected {variables}",
            coefficients.len()
        )));
    }
    Ok(Constraint {
        coefficients,
        relation,
        rhs: rhs[0],
    })
}

impl FromStr for Program {
    type Err = SimplexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, (goal, objective, lines)) = program::<VerboseError<&str>>()
            .parse(s)
            .map_err(|e| match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => {
                    SimplexError::ImproperInput(convert_error(s, e))
                }
                nom::Err::Incomplete(_) => {
                    SimplexError::ImproperInput("unexpected end of input".to_owned())
                }
            })?;
        if !rest.trim().is_empty() {
            return Err(SimplexError::ImproperInput(format!(
                "could not read {:?}",
                rest.trim()
            )));
        }
        if objective.len() < 2 {
            return Err(SimplexError::ImproperInput(
                "the objective needs at least one coefficient and the constant term".to_owned(),
            ));
        }
        let variables = objective.len() - 1;
        let constraints = lines
            .into_iter()
            .enumerate()
            .map(|(i, tokens)| split_constraint(i + 1, tokens, variables))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Program {
            goal,
            objective,
            constraints,
        })
    }
}

impl Program {
    pub fn variables(&self) -> usize {
        self.objective.len() - 1
    }

    /// Tableau-shaped matrix in the engine's maximize sense: `min` objectives
    /// get their coefficients negated (constant kept), `>=` rows are fully
    /// negated, and each equality is emitted as a pair of opposed `<=` rows.
    pub fn to_matrix<F: Scalar + From<Rational64>>(&self) -> Matrix<F> {
        let variables = self.variables();
        let height = 1 + self
            .constraints
            .iter()
            .map(|c| if c.relation == Relation::Equal { 2 } else { 1 })
            .sum::<usize>();
        let mut matrix = Matrix::zeros(height, variables + 1);
        for (i, &c) in self.objective.iter().enumerate() {
            let value = if self.goal == Goal::Minimize && i < variables {
                -c
            } else {
                c
            };
            matrix.set(1, i + 1, value.into());
        }
        let mut row = 2;
        for constraint in &self.constraints {
            match constraint.relation {
                Relation::Less => {
                    write_constraint(&mut matrix, row, constraint, false);
                    row += 1;
                }
                Relation::Greater => {
                    write_constraint(&mut matrix, row, constraint, true);
                    row += 1;
                }
                Relation::Equal => {
                    write_constraint(&mut matrix, row, constraint, false);
                    write_constraint(&mut matrix, row + 1, constraint, true);
                    row += 2;
                }
            }
        }
        matrix
    }
}

fn write_constraint<F: Scalar + From<Rational64>>(
    matrix: &mut Matrix<F>,
    row: usize,
    constraint: &Constraint,
    negate: bool,
) {
    let flip = |c: Rational64| if negate { -c } else { c };
    for (i, &c) in constraint.coefficients.iter().enumerate() {
        matrix.set(row, i + 1, flip(c).into());
    }
    matrix.set(row, constraint.coefficients.len() + 1, flip(constraint.rhs).into());
}

#[cfg(test)]
mod tests {
    use nom::Parser;
    use num::Rational64;
    use rstest::rstest;

    use crate::{
        errors::SimplexError,
        matrix::Matrix,
        parser::{coefficient, relation, Goal, Program, Relation},
    };

    fn int(n: i64) -> Rational64 {
        Rational64::from_integer(n)
    }

    #[rstest]
    #[case("5", 5, 1)]
    #[case("5.", 5, 1)]
    #[case("5.2", 26, 5)]
    #[case("-555.111", -555_111, 1000)]
    #[case("0.5", 1, 2)]
    #[case("0.05", 1, 20)]
    #[case("+3", 3, 1)]
    fn test_coefficient(#[case] text: &str, #[case] numer: i64, #[case] denom: i64) {
        assert_eq!(
            coefficient::<nom::error::Error<&str>>().parse(text),
            Ok(("", Rational64::new(numer, denom)))
        );
    }

    #[rstest]
    #[case("<=", Relation::Less)]
    #[case(">=", Relation::Greater)]
    #[case("=", Relation::Equal)]
    fn test_relation(#[case] text: &str, #[case] expected: Relation) {
        assert_eq!(
            relation::<nom::error::Error<&str>>().parse(text),
            Ok(("", expected))
        );
    }

    #[rstest]
    fn parses_a_whole_program() {
        let program: Program = "min\n3,2,0\nsubject to\n1,1,>=,4\n1,0,<=,10\n0,1,<=,10"
            .parse()
            .unwrap();
        assert_eq!(program.goal, Goal::Minimize);
        assert_eq!(program.objective, vec![int(3), int(2), int(0)]);
        assert_eq!(program.constraints.len(), 3);
        assert_eq!(program.constraints[0].relation, Relation::Greater);
        assert_eq!(program.constraints[0].coefficients, vec![int(1), int(1)]);
        assert_eq!(program.constraints[0].rhs, int(4));
    }

    #[rstest]
    fn tolerates_case_and_carriage_returns() {
        let program: Program = "MAX\r\n1, 1, 0\r\nSubject TO\r\n1, 0, <=, 1\r\n"
            .parse()
            .unwrap();
        assert_eq!(program.goal, Goal::Maximize);
        assert_eq!(program.constraints.len(), 1);
    }

    #[rstest]
    fn end_of_file_ends_the_constraints() {
        let program: Program = "max\n1,0\nsubject to".parse().unwrap();
        assert!(program.constraints.is_empty());
    }

    #[rstest]
    #[case("1,1\nsubject to\n1,<=,1")] // goal line missing
    #[case("max\n1,0\nsubjekt to\n1,<=,1")] // keyword misspelt
    #[case("max\n1,0\nsubject to\n1,frog,<=,1")] // non-numeric token
    #[case("max\n1,0\nsubject to\n1,<=,<=,1")] // two relations
    #[case("max\n1,0\nsubject to\n1,1")] // no relation
    #[case("max\n1,0\nsubject to\n1,<=,1,2")] // two right-hand sides
    #[case("max\n1,1,0\nsubject to\n1,<=,1")] // coefficient count mismatch
    fn improper_input(#[case] text: &str) {
        assert!(matches!(
            text.parse::<Program>(),
            Err(SimplexError::ImproperInput(_))
        ));
    }

    #[rstest]
    fn minimization_negates_the_objective() {
        let program: Program = "min\n3,2,5\nsubject to\n1,1,<=,4".parse().unwrap();
        let matrix: Matrix<Rational64> = program.to_matrix();
        assert_eq!(matrix.get(1, 1), int(-3));
        assert_eq!(matrix.get(1, 2), int(-2));
        assert_eq!(matrix.get(1, 3), int(5));
    }

    #[rstest]
    fn min_and_negated_max_agree() {
        let min: Program = "min\n3,2,0\nsubject to\n1,1,>=,4".parse().unwrap();
        let max: Program = "max\n-3,-2,0\nsubject to\n1,1,>=,4".parse().unwrap();
        assert_eq!(
            min.to_matrix::<Rational64>(),
            max.to_matrix::<Rational64>()
        );
    }

    #[rstest]
    fn greater_rows_are_negated() {
        let program: Program = "max\n1,1,0\nsubject to\n2,3,>=,4".parse().unwrap();
        let matrix: Matrix<Rational64> = program.to_matrix();
        assert_eq!(matrix.dimensions(), (2, 3));
        assert_eq!(matrix.row(2).to_vec(), vec![int(-2), int(-3), int(-4)]);
    }

    #[rstest]
    fn equalities_become_opposed_pairs() {
        let program: Program = "max\n1,1,0\nsubject to\n1,1,=,1".parse().unwrap();
        let matrix: Matrix<Rational64> = program.to_matrix();
        assert_eq!(matrix.dimensions(), (3, 3));
        assert_eq!(matrix.row(2).to_vec(), vec![int(1), int(1), int(1)]);
        assert_eq!(matrix.row(3).to_vec(), vec![int(-1), int(-1), int(-1)]);
    }
}
