use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simplec::CompileOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simplec", about = "Compile a script to bytecode", version)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// Where to write the bytecode
    output: PathBuf,

    /// Print the assembly listing
    #[arg(long)]
    asm: bool,

    /// Dump tokens and exit
    #[arg(long)]
    tokens: bool,

    /// Print the AST and exit
    #[arg(long)]
    ast: bool,

    /// Disable colors in the token dump
    #[arg(long)]
    no_color: bool,

    /// Show source text instead of Debug form in the token dump
    #[arg(long)]
    pretty: bool,

    /// Also write the structured bytecode (postcard) to this path
    #[arg(long, value_name = "PATH")]
    emit_ir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for CompileOptions {
    fn from(cli: Cli) -> Self {
        CompileOptions {
            input: cli.input,
            output: cli.output,
            asm: cli.asm,
            tokens: cli.tokens,
            no_color: cli.no_color,
            pretty: cli.pretty,
            ast: cli.ast,
            emit_ir: cli.emit_ir,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "simplec=debug" } else { "simplec=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = CompileOptions::from(cli);
    match simplec::run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
