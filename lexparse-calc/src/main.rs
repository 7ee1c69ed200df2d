//! Command-line front end: evaluate an expression with optional
//! variable bindings.
//!
//! ```text
//! lexparse-calc "2 * (3 + 4)"
//! lexparse-calc -d x=5 -d y=7 "x * y + 1"
//! lexparse-calc --recover "1 + + 2"
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;

use lexparse_calc::Calculator;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate arithmetic expressions over +, * and parentheses")]
struct Cli {
    /// Variable bindings, as name=value; may be repeated.
    #[arg(short, long = "define", value_name = "NAME=VALUE")]
    define: Vec<String>,

    /// Recover from syntax errors instead of failing on the first one.
    #[arg(long)]
    recover: bool,

    /// The expression to evaluate.
    expression: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut calc = Calculator::new().context("building the parsing tables")?;
    for binding in &cli.define {
        let Some((name, value)) = binding.split_once('=') else {
            bail!("binding {:?} is not of the form name=value", binding);
        };
        let value: i64 = value
            .trim()
            .parse()
            .with_context(|| format!("value of {:?} is not an integer", name))?;
        calc.set(name.trim(), value);
    }

    let value = if cli.recover {
        let (value, stats) = calc.evaluate_recovering(&cli.expression)?;
        if stats.recovered > 0 {
            eprintln!("recovered from {} syntax error(s)", stats.recovered);
        }
        value
    } else {
        calc.evaluate(&cli.expression)?
    };

    println!("{value}");
    Ok(())
}
