//! Scval schema compiler and document validator CLI.
//!
//! Three subcommands cover the pipeline end to end: `compile` (schema
//! text to a bytecode blob), `validate` (bytecode blob plus an XML
//! document to an accept/reject verdict), and `check` (both steps at
//! once). Mirrors `lmlang-cli`'s `#[derive(Parser)]`/`#[derive(Subcommand)]`
//! shape and its convention of mapping errors to process exit codes by
//! hand rather than taking an `anyhow` dependency.

mod callbacks;
mod xml_cursor;

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use scval_codegen::{generate, Bytecode, CodegenError};
use scval_core::parser::{ParseError, Parser as SchemaParser};
use scval_vm::run;

use callbacks::register_demo_callbacks;
use xml_cursor::XmlTreeCursor;

/// Scval schema compiler and validator.
#[derive(Parser)]
#[command(name = "scval", about = "Scval schema compiler and document validator")]
struct Cli {
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex, parse, and lower a schema to a bytecode blob.
    Compile {
        /// Path to the `.scval` schema source.
        schema: PathBuf,

        /// Output path for the compiled bytecode blob.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load a bytecode blob and validate an XML document against it.
    Validate {
        /// Path to a bytecode blob produced by `compile`.
        bytecode: PathBuf,

        /// Path to the XML document to validate.
        document: PathBuf,

        /// Record and print the VM's per-opcode execution trace.
        #[arg(long)]
        trace: bool,
    },
    /// Compile a schema and validate a document in one step.
    Check {
        /// Path to the `.scval` schema source.
        schema: PathBuf,

        /// Path to the XML document to validate.
        document: PathBuf,

        /// Record and print the VM's per-opcode execution trace.
        #[arg(long)]
        trace: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Compile { schema, output } => run_compile(&schema, &output),
        Commands::Validate {
            bytecode,
            document,
            trace,
        } => run_validate(&bytecode, &document, trace),
        Commands::Check {
            schema,
            document,
            trace,
        } => run_check(&schema, &document, trace),
    };
    process::exit(exit_code);
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Exit codes: 0 = success, 1 = schema error, 2 = document rejected,
/// 3 = I/O error, 4 = VM fault.
fn run_compile(schema_path: &PathBuf, output_path: &PathBuf) -> i32 {
    let src = match fs::read_to_string(schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", schema_path.display(), e);
            return 3;
        }
    };

    let bytecode = match compile_schema(&src) {
        Ok(bc) => bc,
        Err(code) => return code,
    };

    if let Err(e) = fs::write(output_path, bytecode.save()) {
        eprintln!("Error: failed to write '{}': {}", output_path.display(), e);
        return 3;
    }

    println!(
        "compiled {} operation(s), {} constant(s), register banks [{}, {}]",
        bytecode.code.len(),
        bytecode.consts.len(),
        bytecode.counter_bank_size(),
        bytecode.string_bank_size()
    );
    0
}

fn run_validate(bytecode_path: &PathBuf, document_path: &PathBuf, trace: bool) -> i32 {
    let blob = match fs::read(bytecode_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", bytecode_path.display(), e);
            return 3;
        }
    };
    let bytecode = match Bytecode::load(&blob) {
        Ok(bc) => bc,
        Err(e) => {
            eprintln!("Error: malformed bytecode: {e}");
            return 1;
        }
    };

    validate_document(&bytecode, document_path, trace)
}

fn run_check(schema_path: &PathBuf, document_path: &PathBuf, trace: bool) -> i32 {
    let src = match fs::read_to_string(schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", schema_path.display(), e);
            return 3;
        }
    };

    let bytecode = match compile_schema(&src) {
        Ok(bc) => bc,
        Err(code) => return code,
    };

    validate_document(&bytecode, document_path, trace)
}

fn compile_schema(src: &str) -> Result<Bytecode, i32> {
    let tree = SchemaParser::new(src).parse().map_err(|e: ParseError| {
        eprintln!("Error: schema rejected: {e}");
        1
    })?;
    generate(&tree).map_err(|e: CodegenError| {
        eprintln!("Error: codegen failed: {e}");
        1
    })
}

fn validate_document(bytecode: &Bytecode, document_path: &PathBuf, trace: bool) -> i32 {
    let xml = match fs::read_to_string(document_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", document_path.display(), e);
            return 3;
        }
    };

    let mut cursor = match XmlTreeCursor::from_str(&xml) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: malformed document: {e}");
            return 3;
        }
    };
    register_demo_callbacks(&mut cursor);

    match run(bytecode, &mut cursor, trace) {
        Ok(outcome) => {
            if let Some(log) = &outcome.trace {
                for entry in log {
                    eprintln!("  pc={:<5} {:?}", entry.pc, entry.opcode);
                }
            }
            if outcome.accepted {
                println!("accept");
                0
            } else {
                println!("reject");
                2
            }
        }
        Err(e) => {
            eprintln!("Error: VM fault: {e}");
            4
        }
    }
}
