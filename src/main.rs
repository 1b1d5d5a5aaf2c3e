//! BeamScript CLI and REPL
//!
//! Usage:
//!   beam run <file.beam>   - Execute a BeamScript file
//!   beam repl              - Start interactive REPL
//!   beam                   - Same as `beam repl`

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser as _, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use beamscript::{BeamError, Lexer, Value, VERSION};

/// BeamScript, a small dynamically-typed scripting language.
///
/// ENVIRONMENT VARIABLES:
///     BEAM_LOG    Log filter, e.g. `debug` or `beamscript=trace` (default: warn)
///     NO_COLOR    Set to disable colored output
#[derive(clap::Parser)]
#[command(name = "beam")]
#[command(version)]
struct Cli {
    /// Log pipeline activity at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a BeamScript source file
    #[command(visible_alias = "r")]
    Run {
        /// Path to the source file
        file: PathBuf,
        /// Print the token stream before running
        #[arg(long)]
        dump_tokens: bool,
        /// Print the syntax tree before running
        #[arg(long)]
        dump_ast: bool,
    },

    /// Start an interactive REPL
    Repl,
}

/// What to print besides program output
#[derive(Debug, Clone, Copy, Default)]
struct DumpOptions {
    tokens: bool,
    ast: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Run { file, dump_tokens, dump_ast }) => {
            let dump = DumpOptions { tokens: dump_tokens, ast: dump_ast };
            if !run_file(&file, dump)? {
                process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Repl) | None => run_repl(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("BEAM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Print the token stream and/or syntax tree of `source`
fn dump(source: &str, options: DumpOptions) -> beamscript::Result<()> {
    let tokens = Lexer::new(source).tokenize()?;
    if options.tokens {
        for token in &tokens {
            println!("{:?}", token);
        }
    }
    if options.ast {
        let program = beamscript::Parser::new(tokens).parse()?;
        println!("{:#?}", program);
    }
    Ok(())
}

/// Run `source` against a fresh root scope, dumping first if asked
fn execute(source: &str, options: DumpOptions) -> beamscript::Result<Value> {
    if options.tokens || options.ast {
        dump(source, options)?;
    }
    beamscript::run(source)
}

fn report(err: BeamError, source: &str) {
    let err = err.with_source(source);
    eprintln!("{}", err.to_string().red());
}

/// Returns whether the program ran without error
fn run_file(path: &Path, dump: DumpOptions) -> Result<bool> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("cannot read file '{}'", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = source.len(), "running file");
    match execute(&source, dump) {
        Ok(_) => Ok(true),
        Err(err) => {
            report(err, &source);
            Ok(false)
        }
    }
}

fn run_repl() -> Result<()> {
    println!("{} {} - {}",
        "BeamScript".cyan().bold(),
        VERSION.cyan(),
        "each line runs in a fresh scope".dimmed()
    );
    println!("Type {} to exit, {} for help\n",
        "exit".yellow(),
        "help".yellow()
    );

    let mut rl = DefaultEditor::new().context("failed to create line editor")?;

    loop {
        match rl.readline(&format!("{} ", ">>>".green().bold())) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    "exit" | "quit" => {
                        println!("{}", "Goodbye!".cyan());
                        break;
                    }
                    "help" => {
                        print_repl_help();
                        continue;
                    }
                    _ => {}
                }

                if let Some(path) = line.strip_prefix("run ") {
                    if let Err(err) = run_file(Path::new(path.trim()), DumpOptions::default()) {
                        eprintln!("{}: {:#}", "error".red(), err);
                    }
                    continue;
                }

                match execute(line, DumpOptions::default()) {
                    Ok(Value::Null) => {}
                    Ok(value) => println!("{} {}", "=>".dimmed(), value.to_string().cyan()),
                    Err(err) => report(err, line),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }

    Ok(())
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  run <file>   Execute a source file");
    println!("  help         Show this help\n");
    println!("{}", "Language Examples:".yellow());
    println!("  declare x = 10, y = 2");
    println!("  const var limit = 3");
    println!("  def add(a, b) {{ a + b }}");
    println!("  con.out.println(add(1, 2))");
    println!("  declare name = con.in('name? ')");
}
