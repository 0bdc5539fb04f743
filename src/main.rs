use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser as ClapParser;
use colored::Colorize;

use crate::frontend::{lexer::Span, parser::Parser, SourceFile, SourceFileOrigin};

mod backend;
mod frontend;
mod index;
mod middle;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Stop after the named stage and print its output
    #[arg(short = 'e', value_enum)]
    emit: Option<EmitFormat>,

    /// Blueprint output path
    #[arg(short = 'o', default_value = "out.bp")]
    output_path: PathBuf,

    source_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmitFormat {
    #[value(name = "ast")]
    Ast,
    #[value(name = "ir")]
    Ir,
    #[value(name = "json")]
    Json,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn position_of(source: &SourceFile, span: Span) -> String {
    format!(
        "{}:{}:{}",
        source.origin,
        source.row_for_position(span.start),
        source.column_for_position(span.start)
    )
}

fn run(args: &Args) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.source_file).with_context(|| {
        format!("failed to read source file '{}'", args.source_file.display())
    })?;

    let source = SourceFile {
        contents,
        origin: SourceFileOrigin::File(args.source_file.clone()),
    };

    // Construct the syntax tree; the first syntax error aborts
    let ast = match Parser::parse_module(&source) {
        Ok(ast) => ast,
        Err(error) => {
            anyhow::bail!("{}: {}", position_of(&source, error.span), error.message);
        }
    };

    if args.emit == Some(EmitFormat::Ast) {
        println!("{ast:#?}");
        return Ok(());
    }

    // Resolve names and types; semantic errors are reported in a batch
    let module = match middle::sema::analyze(&ast) {
        Ok(module) => module,
        Err(errors) => {
            for error in &errors {
                eprintln!(
                    "{}: {}",
                    position_of(&source, error.span).bold(),
                    error.message
                );
            }

            anyhow::bail!("aborting due to {} error(s)", errors.len());
        }
    };

    if args.emit == Some(EmitFormat::Ir) {
        println!("{module:#?}");
        return Ok(());
    }

    let compiled = backend::compile_module(&module)?;

    if args.emit == Some(EmitFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&compiled.to_json())?);
        return Ok(());
    }

    let file = File::create(&args.output_path).with_context(|| {
        format!(
            "failed to create output file '{}'",
            args.output_path.display()
        )
    })?;

    let mut writer = BufWriter::new(file);
    compiled.save(&mut writer)?;
    writer.flush()?;

    Ok(())
}
