use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use sharp_script as sharp;

use sharp::ast_printer::AstPrinter;
use sharp::interpreter::Interpreter;
use sharp::lexer::Lexer;
use sharp::parser::Parser;
use sharp::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "SharpScript interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a script file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a script file and prints its syntax tree
    Parse { filename: PathBuf },

    /// Runs a script file
    Run { filename: PathBuf },
}

/// Reads a script file as UTF-8 text.
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'sharp_script::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("sharp_script::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Parses `source`, printing every diagnostic to stderr.  Returns the
/// recovered program and whether any diagnostic was found.
fn parse_reporting(source: &str) -> (sharp::ast::Program, bool) {
    let tokens: Vec<Token> = Lexer::new(source).tokenize();
    let mut parser = Parser::new(&tokens);
    let program = parser.parse();

    for e in parser.errors() {
        debug!("Parse debug: {}", e);
        eprintln!("{}", e);
    }

    info!("Parsed {} statements", program.len());

    (program, !parser.errors().is_empty())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_file(&filename)?;
            let tokens: Vec<Token> = Lexer::new(&source).tokenize();

            if json {
                let rendered =
                    serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
                println!("{}", rendered);
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }

            info!("Tokenization completed: {} tokens", tokens.len());
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_file(&filename)?;
            let (program, had_errors) = parse_reporting(&source);

            if had_errors {
                std::process::exit(65);
            }

            let ast_str = AstPrinter::program(&program);

            debug!("AST: {}", ast_str);
            println!("{}", ast_str);

            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source = read_file(&filename)?;
            info!("Provided input:\n {}", source);

            // Malformed statements are dropped; the rest still runs.
            let (program, had_errors) = parse_reporting(&source);
            let mut interpreter = Interpreter::new();

            match interpreter.interpret(&program) {
                Ok(()) if had_errors => {
                    info!("Recovered program executed; parse errors were reported");
                    std::process::exit(65);
                }

                Ok(()) => {
                    info!("Program executed successfully");
                }

                // Already reported on the console by the interpreter.
                Err(e) => {
                    debug!("Runtime debug: {}", e);
                    std::process::exit(70);
                }
            }
        }
    }

    Ok(())
}
