use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use mico::error::MicoError;
use mico::interpreter::Interpreter;
use mico::parser::Parser;
use mico::scanner::Scanner;
use mico::token::Token;
use mico::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "Mico language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to mico.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file and pretty-prints the program
    Parse {
        filename: Option<PathBuf>,

        /// Dump the AST as JSON instead of pretty-printing
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Mico program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// Source bytes backed by a file mapping. Zero-length files cannot be
/// mapped on every platform, so they get their own variant.
enum Input {
    Mapped(Mmap),
    Empty,
}

impl Input {
    fn bytes(&self) -> &[u8] {
        match self {
            Input::Mapped(map) => map,
            Input::Empty => &[],
        }
    }
}

fn map_file(filename: &PathBuf) -> Result<Input> {
    info!("Mapping file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        info!("File {:?} is empty", filename);
        return Ok(Input::Empty);
    }

    let map = unsafe { Mmap::map(&file) }
        .context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(Input::Mapped(map))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("mico.log").context("Failed to create mico.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("mico::")
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
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to mico.log");
    Ok(())
}

/// Exit code for a front-end (lex/parse) vs runtime error, per the
/// sysexits convention.
fn error_exit_code(error: &MicoError) -> i32 {
    match error {
        MicoError::Runtime { .. } => 70,
        _ => 65,
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let input = map_file(&filename)?;
                let scanner = Scanner::new(input.bytes());
                let mut tokenized = true;

                for token in scanner {
                    match token {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);
                            println!("{}", token);
                        }
                        Err(e) => {
                            tokenized = false;
                            debug!("Tokenization debug: {}", e);
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");
                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Parse { filename, json } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let input = map_file(&filename)?;

                match Interpreter::parse(input.bytes()) {
                    Ok(program) => {
                        info!("Parsed {} statements", program.len());

                        if json {
                            let dump = serde_json::to_string_pretty(&program)
                                .context("Failed to serialize AST")?;
                            println!("{}", dump);
                        } else {
                            for stmt in &program {
                                println!("{}", stmt);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => {
                info!("Running Evaluate subcommand");
                let input = map_file(&filename)?;

                let tokens: std::result::Result<Vec<Token<'_>>, _> =
                    Scanner::new(input.bytes()).collect();

                let expr = tokens.and_then(|tokens| Parser::new(&tokens).parse_expression());

                match expr {
                    Ok(expr) => {
                        info!("Expression parsed successfully");
                        let mut interpreter = Interpreter::new();

                        match interpreter.interpret(std::slice::from_ref(&expr)) {
                            Ok(value) => {
                                debug!("Evaluated to: {}", value);
                                println!("{}", interpreter.render(&value));
                            }
                            Err(e) => {
                                debug!("Evaluation debug: {}", e);
                                eprintln!("{}", e);
                                std::process::exit(70);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Evaluate subcommand completed");
            }
            None => {
                info!("No filepath provided for Evaluate");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let input = map_file(&filename)?;
                let mut interpreter = Interpreter::new();

                match interpreter.run(input.bytes()) {
                    Ok(value) => {
                        info!("Program executed successfully");

                        // A final integer value becomes the process
                        // exit code.
                        if let Value::Int(code) = value {
                            debug!("Program exit code: {}", code);
                            std::process::exit(code as i32);
                        }
                    }
                    Err(e) => {
                        debug!("Execution debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(error_exit_code(&e));
                    }
                }
            }
            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Repl => {
            info!("Starting REPL");
            let mut interpreter = Interpreter::new();
            interpreter.repl()?;
        }
    }

    Ok(())
}
