use std::{env::args, fs::read_to_string, process::ExitCode};

use num::Rational64;

use linopt::{optimize, Program, SimplexError};

fn main() -> ExitCode {
    let path = args().nth(1).unwrap_or_else(|| "input.txt".to_owned());
    match run(&path) {
        Ok(Some(optimum)) => {
            println!("Optimal value: {optimum}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("The program is infeasible");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{path}: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> Result<Option<Rational64>, SimplexError> {
    let program: Program = read_to_string(path)?.parse()?;
    optimize(&program)
}
