use bexpr::cli::{self, CliError, RunOptions};
use clap::{Args, Parser as ClapParser, Subcommand};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "bexpr")]
#[command(about = "bexpr - Boolean expressions for filtering structured data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a JSON document, printing true or false
    Eval {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Parse an expression and print its syntax tree
    Parse {
        /// The expression to parse
        expression: String,

        /// Maximum number of match expressions (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max_expressions: usize,
    },

    /// Keep the elements of a JSON array or object that match an expression
    Filter {
        #[command(flatten)]
        run: RunArgs,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// The expression to run
    expression: String,

    /// JSON input (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum number of match expressions (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_expressions: usize,

    /// Maximum length of a literal value (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_value_length: usize,

    /// Value used for selectors that resolve to nothing (JSON or a bare string)
    #[arg(long, conflicts_with = "error_on_missing")]
    unknown: Option<String>,

    /// Fail when a selector resolves to nothing
    #[arg(long)]
    error_on_missing: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval { run } => run_eval(run),
        Commands::Parse {
            expression,
            max_expressions,
        } => cli::execute_parse(&expression, max_expressions).map(|dump| print!("{}", dump)),
        Commands::Filter { run, pretty } => run_filter(run, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_options(args: RunArgs) -> Result<RunOptions, CliError> {
    Ok(RunOptions {
        expression: args.expression,
        input: read_input(args.input)?,
        max_expressions: args.max_expressions,
        max_value_length: args.max_value_length,
        unknown: args.unknown,
        error_on_missing: args.error_on_missing,
    })
}

fn run_eval(args: RunArgs) -> Result<(), CliError> {
    let options = run_options(args)?;
    println!("{}", cli::execute_eval(&options)?);
    Ok(())
}

fn run_filter(args: RunArgs, pretty: bool) -> Result<(), CliError> {
    let options = run_options(args)?;
    let output = cli::execute_filter(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}
