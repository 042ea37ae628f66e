use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::token::Token;
use rox::{Diagnostics, Lox, LoxError};

/// Exit status for scan, parse and resolution errors.
const EXIT_STATIC_ERROR: u8 = 65;

/// Exit status for an uncaught runtime error.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    /// Defaults to an interactive prompt when omitted
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each statement's syntax tree
    Parse { filename: PathBuf },

    /// Runs input from a file as a program
    Run { filename: PathBuf },

    /// Reads and runs one line at a time
    Repl,
}

/// Reads the contents of a file as UTF‑8 text
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf)
        .map_err(LoxError::from)
        .context(format!("{:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from module paths
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env() // RUST_LOG overrides the default level
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(diagnostics: &Diagnostics) {
    for error in diagnostics.iter() {
        eprintln!("{}", error);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for result in Scanner::new(&source) {
        match result {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    }

    if !tokenized {
        debug!("Tokenization failed");
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    Ok(ExitCode::SUCCESS)
}

fn parse(filename: &Path) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = Scanner::new(&source).scan_tokens(&mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);

    match statements {
        Some(statements) if !diagnostics.had_error() => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
            Ok(ExitCode::SUCCESS)
        }

        _ => {
            report(&diagnostics);
            Ok(ExitCode::from(EXIT_STATIC_ERROR))
        }
    }
}

fn run(filename: &Path) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut lox = Lox::new();

    let diagnostics = lox.run(&source);
    report(&diagnostics);

    if diagnostics.had_error() {
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    if diagnostics.had_runtime_error() {
        return Ok(ExitCode::from(EXIT_RUNTIME_ERROR));
    }

    info!("Program executed successfully");
    Ok(ExitCode::SUCCESS)
}

fn repl() -> Result<ExitCode> {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        // Errors only affect the line that caused them.
        report(&lox.run(&line));
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),
        Commands::Parse { filename } => parse(&filename),
        Commands::Run { filename } => run(&filename),
        Commands::Repl => repl(),
    }
}
