//! Murk CLI and REPL
//!
//! Usage:
//!   murk run <file.mrk>   - Execute a Murk file
//!   murk <file.mrk>       - Same as `murk run`
//!   murk repl             - Start interactive REPL

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use murk::{Interpreter, MurkError, StdConsole, VERSION};

/// Environment variable holding the log filter
const LOG_ENV: &str = "MURK_LOG";

#[derive(Parser, Debug)]
#[command(name = "murk", version, about = "Run Murk scripts", args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Script to run, shorthand for `murk run <FILE>`
    file: Option<PathBuf>,

    /// Log interpreter activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a Murk file
    Run {
        file: PathBuf,

        /// Directory file imports are resolved against (defaults to the file's directory)
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,
    },
    /// Start interactive REPL
    Repl,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match (cli.command, cli.file) {
        (Some(Command::Run { file, base_dir }), _) => run_file(file, base_dir),
        (Some(Command::Repl), _) => run_repl(),
        (None, Some(file)) => run_file(file, None),
        (None, None) => run_repl(),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_file(path: PathBuf, base_dir: Option<PathBuf>) {
    if let Err(err) = murk::run_file(&path, base_dir.as_deref(), StdConsole::shared()) {
        report(&err);
        process::exit(1);
    }
}

fn report(err: &MurkError) {
    eprintln!("{}", err.to_string().red());
}

fn run_repl() {
    println!("{} {}", "Murk".cyan().bold(), VERSION.cyan());
    println!("Type {} to exit, {} for help\n", "exit".yellow(), "help".yellow());

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("{}: cannot start REPL: {}", "error".red(), err);
            process::exit(1);
        }
    };

    // State persists across entries so later lines see earlier declarations
    let mut interpreter = Interpreter::new(StdConsole::shared());
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            format!("{} ", "murk>".green().bold())
        } else {
            format!("{} ", "...>".dimmed())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    match line.trim() {
                        "" => continue,
                        "exit" | "quit" => {
                            println!("{}", "Goodbye!".cyan());
                            break;
                        }
                        "help" => {
                            print_repl_help();
                            continue;
                        }
                        "clear" => {
                            interpreter = Interpreter::new(StdConsole::shared());
                            println!("{}", "State cleared.".dimmed());
                            continue;
                        }
                        _ => {}
                    }
                }

                let _ = rl.add_history_entry(line.as_str());
                buffer.push_str(&line);
                buffer.push('\n');

                // Function bodies may span several lines
                if open_braces(&buffer) > 0 {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                let result = murk::parse(&source, std::path::Path::new("."))
                    .and_then(|program| interpreter.execute(&program).map(|_| ()));
                if let Err(err) = result {
                    report(&err.with_source(&source));
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
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
}

/// Unclosed `{` in `source`, ignoring braces inside strings
fn open_braces(source: &str) -> isize {
    let mut depth = 0;
    let mut quote = None;

    for ch in source.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '{') => depth += 1,
            (None, '}') => depth -= 1,
            _ => {}
        }
    }

    depth
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  clear        Forget all variables and functions");
    println!("  help         Show this help\n");
    println!("{}", "Language Examples:".yellow());
    println!("  import \"IO\"");
    println!("  var name = \"murk\"");
    println!("  function greet(who: String) {{ return who }}");
    println!("  var message = greet(name)");
    println!("  IO.printf(\"hello {{}}\", message)");
}
