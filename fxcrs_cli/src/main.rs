//! HLSL compiler CLI tool using the safe Rust API

use clap::{ArgAction, Parser, Subcommand};
use fxcrs::{
    CompileBuilder, CompileFlags, D3DCompiler, DisassembleBuilder, LibraryConfig,
    PreprocessBuilder, ShaderTarget,
};
use log::{LevelFilter, debug, info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fxcrs")]
#[command(about = "Legacy HLSL compiler command-line tool", long_about = None)]
struct Cli {
    /// Compiler library to load instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    library: Option<PathBuf>,

    /// Refuse to load a library whose SHA-1 differs from this
    #[arg(long, global = true, value_name = "HEX")]
    sha1: Option<String>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile HLSL shader to bytecode
    Compile {
        /// Input HLSL file
        input: PathBuf,

        /// Entry point function name
        #[arg(short, long, default_value = "main")]
        entry: String,

        /// Target profile (e.g., vs_4_0, ps_5_0, ps_4_0_level_9_3)
        #[arg(short, long)]
        target: String,

        /// Output file (default: <input>.dxbc)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Optimization level 0-3
        #[arg(short = 'O', long, default_value = "1", value_parser = clap::value_parser!(u8).range(0..=3))]
        optimize: u8,

        /// Treat warnings as errors
        #[arg(long)]
        werror: bool,

        /// Preprocessor defines (NAME=VALUE or NAME)
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        defines: Vec<String>,
    },

    /// Disassemble shader bytecode
    #[command(alias = "disassemble")]
    Disasm {
        /// Input DXBC file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comment placed at the top of the listing
        #[arg(long)]
        comment: Option<String>,
    },

    /// Preprocess HLSL source
    #[command(alias = "pp")]
    Preprocess {
        /// Input HLSL file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preprocessor defines (NAME=VALUE or NAME)
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        defines: Vec<String>,
    },
}

fn parse_define(s: &str) -> (String, String) {
    s.split_once('=')
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .unwrap_or_else(|| (s.to_string(), "1".to_string()))
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn load_compiler(library: Option<PathBuf>, sha1: Option<String>) -> Result<D3DCompiler, String> {
    let mut config = LibraryConfig::from_env();
    if let Some(path) = library {
        config = config.with_path(path);
    }
    if let Some(sha1) = sha1 {
        config = config.with_expected_sha1(&sha1);
    }

    let compiler = D3DCompiler::load(&config).map_err(|e| format!("{}", e))?;
    info!("using compiler library {}", compiler.path().display());
    Ok(compiler)
}

#[allow(clippy::too_many_arguments)]
fn compile_shader(
    compiler: &D3DCompiler,
    input: PathBuf,
    entry: String,
    target: String,
    output: Option<PathBuf>,
    optimize: u8,
    werror: bool,
    defines: Vec<String>,
) -> Result<(), String> {
    let output = output.unwrap_or_else(|| input.with_extension("dxbc"));

    let source = std::fs::read_to_string(&input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;

    if target.parse::<ShaderTarget>().is_err() {
        warn!("{} is not a known target profile, passing it through", target);
    }

    let source_name = input.to_string_lossy();
    let mut builder = CompileBuilder::new(&source, &entry, target)
        .source_name(&source_name)
        .optimization_level(u32::from(optimize))
        .with_backend(compiler);

    if optimize == 0 {
        builder = builder.with_flags(CompileFlags::SKIP_OPTIMIZATION);
    }
    if werror {
        builder = builder.warnings_are_errors();
    }

    for def in &defines {
        let (name, value) = parse_define(def);
        debug!("define {}={}", name, value);
        builder = builder.define(&name, &value);
    }

    let result = builder.compile().map_err(|e| format!("{}", e))?;

    let bytecode = result.bytecode.as_bytes();
    std::fs::write(&output, bytecode)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;

    eprintln!(
        "Compiled {} -> {} ({} bytes)",
        input.display(),
        output.display(),
        bytecode.len()
    );

    if let Some(warnings) = result.warnings {
        eprintln!("Warnings:\n{}", warnings);
    }

    Ok(())
}

fn disassemble_shader(
    compiler: &D3DCompiler,
    input: PathBuf,
    output: Option<PathBuf>,
    comment: Option<String>,
) -> Result<(), String> {
    let bytecode =
        std::fs::read(&input).map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;

    let mut builder = DisassembleBuilder::new(&bytecode).with_backend(compiler);
    if let Some(comment) = comment.as_deref() {
        builder = builder.comment(comment);
    }
    let disasm = builder.disassemble().map_err(|e| format!("{}", e))?;

    if let Some(output) = output {
        std::fs::write(&output, disasm.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
        eprintln!("Disassembled {} -> {}", input.display(), output.display());
    } else {
        print!("{}", disasm);
    }

    Ok(())
}

fn preprocess_shader(
    compiler: &D3DCompiler,
    input: PathBuf,
    output: Option<PathBuf>,
    defines: Vec<String>,
) -> Result<(), String> {
    let source = std::fs::read_to_string(&input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;

    let source_name = input.to_string_lossy();
    let mut builder = PreprocessBuilder::new(&source)
        .source_name(&source_name)
        .with_backend(compiler);

    for def in &defines {
        let (name, value) = parse_define(def);
        builder = builder.define(&name, &value);
    }

    let result = builder.preprocess().map_err(|e| format!("{}", e))?;

    if let Some(output) = output {
        std::fs::write(&output, result.source.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
        eprintln!("Preprocessed {} -> {}", input.display(), output.display());
    } else {
        print!("{}", result.source);
    }

    if let Some(warnings) = result.warnings {
        eprintln!("Warnings:\n{}", warnings);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<(), String> {
    let compiler = load_compiler(cli.library, cli.sha1)?;

    match cli.command {
        Commands::Compile {
            input,
            entry,
            target,
            output,
            optimize,
            werror,
            defines,
        } => compile_shader(
            &compiler, input, entry, target, output, optimize, werror, defines,
        ),
        Commands::Disasm {
            input,
            output,
            comment,
        } => disassemble_shader(&compiler, input, output, comment),
        Commands::Preprocess {
            input,
            output,
            defines,
        } => preprocess_shader(&compiler, input, output, defines),
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(level_filter(cli.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
