mod expression;
mod random;

use anyhow::{Context, Result, bail};
use clap::{Parser as ClapParser, Subcommand};
use std::io::IsTerminal;
use tracejit::{CompiledFunction, Shape, Value, compile_with_shape};
use tracing_subscriber::EnvFilter;

use expression::{Program, report_errors};

#[derive(ClapParser)]
#[command(name = "tracejit")]
#[command(about = "Trace numeric expressions into graphs and run them")]
struct Cli {
    /// Log tracing and execution details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression and print its graph
    Graph {
        /// Expression over the parameter, e.g. 'y - tanh(y)'
        #[arg(allow_hyphen_values = true)]
        expression: String,
        /// Trace on a vector of this length instead of a scalar
        #[arg(long)]
        shape: Option<usize>,
        /// Name of the input parameter
        #[arg(long, default_value = "y")]
        param: String,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile an expression and run it once
    Run {
        /// Expression over the parameter, e.g. 'y - tanh(y)'
        #[arg(allow_hyphen_values = true)]
        expression: String,
        /// Input values; a single value is a scalar unless --shape is given
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,
        /// Trace on a vector of this length
        #[arg(long)]
        shape: Option<usize>,
        /// Name of the input parameter
        #[arg(long, default_value = "y")]
        param: String,
        /// Run on standard normal samples instead of VALUES
        #[arg(long, conflicts_with = "values")]
        random: bool,
        /// Input as JSON, a number or an array of numbers, instead of VALUES
        #[arg(long, value_name = "JSON", conflicts_with_all = ["values", "random"])]
        input_json: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile tanhshrink for a length-2 input, print its graph and run it on random values
    Demo,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Graph {
            expression,
            shape,
            param,
            json,
        } => show_graph(&expression, &param, shape.map_or(Shape::Scalar, Shape::Vector), json),
        Commands::Run {
            expression,
            values,
            shape,
            param,
            random,
            input_json,
            json,
        } => {
            let source = match input_json {
                Some(json) => InputSource::Json(json),
                None if random => InputSource::Random,
                None => InputSource::Values(values),
            };
            runtime_input(source, shape).and_then(|(input, shape)| {
                run_expression(&expression, &param, &input, shape, json)
            })
        }
        Commands::Demo => demo(),
    };

    if let Err(error) = result {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn compile_expression(source: &str, param: &str, shape: Shape) -> Result<CompiledFunction> {
    let program = match Program::parse(source, param) {
        Ok(program) => program,
        Err(diagnostics) => {
            report_errors(&diagnostics, "<expression>", source, std::io::stderr().is_terminal());
            bail!("could not parse expression");
        }
    };
    tracing::debug!(parameter = program.parameter(), %shape, "tracing expression");
    compile_with_shape(shape, |session, input| program.lower(session, input))
        .with_context(|| format!("could not compile '{source}'"))
}

fn show_graph(source: &str, param: &str, shape: Shape, json: bool) -> Result<()> {
    let compiled = compile_expression(source, param, shape)?;
    if json {
        println!("{}", compiled.graph().to_json()?);
    } else {
        println!("{}", compiled.describe());
    }
    Ok(())
}

/// Where `tracejit run` takes its input from.
#[derive(Debug)]
enum InputSource {
    Values(Vec<f64>),
    Random,
    Json(String),
}

/// Build the runtime input and the shape to trace with.
///
/// Without `--shape` the input decides: one value is a scalar, several a vector. With
/// `--shape` the trace is a vector of that length, even for a single value.
fn runtime_input(source: InputSource, shape: Option<usize>) -> Result<(Value, Shape)> {
    let input = match source {
        InputSource::Json(json) => {
            Value::from_json(&json).with_context(|| format!("invalid input JSON '{json}'"))?
        }
        InputSource::Random => match shape {
            Some(len) => Value::vector(random::standard_normal(len)?),
            None => Value::scalar(random::standard_normal(1)?[0]),
        },
        InputSource::Values(values) => match (shape, values.as_slice()) {
            (_, []) => bail!("no input values given (pass VALUES, --random or --input-json)"),
            (None, [value]) => Value::scalar(*value),
            _ => Value::vector(values.iter().copied()),
        },
    };
    let shape = match shape {
        Some(len) => Shape::Vector(len),
        None => input.shape(),
    };
    Ok((input, shape))
}

fn run_expression(
    source: &str,
    param: &str,
    input: &Value,
    shape: Shape,
    json: bool,
) -> Result<()> {
    let compiled = compile_expression(source, param, shape)?;
    let output = compiled
        .run(input)
        .with_context(|| format!("could not run on {input}"))?;
    if json {
        println!("{}", output.to_json()?);
    } else {
        println!("{output}");
    }
    Ok(())
}

fn demo() -> Result<()> {
    let compiled = compile_with_shape(Shape::Vector(2), |session, y| session.tanhshrink(y))?;
    println!("{}", compiled.describe());
    let input = Value::vector(random::standard_normal(2)?);
    println!("{}", compiled.run(&input)?);
    Ok(())
}
