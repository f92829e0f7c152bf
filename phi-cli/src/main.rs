use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use phi_compiler::{CodeGen, Compilation};

#[derive(Parser)]
#[command(name = "phic")]
#[command(version = "0.2.0")]
#[command(about = "Phi Programming Language Compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a parsed Phi module (AST JSON) to a native executable
    Compile {
        /// Input AST file produced by the parser
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output path for the produced binary
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Stop after writing the `.ll` file
        #[arg(long)]
        emit_llvm: bool,

        /// Skip the clang link step
        #[arg(long)]
        no_link: bool,
    },

    /// Run name resolution, inference, and checking without emitting code
    Check {
        /// Input AST file produced by the parser
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn load_module(input: &PathBuf) -> Result<phi_ast::Module> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("cannot read `{}`", input.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("`{}` is not a serialized Phi module", input.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { input } => {
            let module = load_module(&input)?;
            let mut compilation = Compilation::new(module, &input.display().to_string());
            let ok = compilation.analyze();
            compilation.diagnostics.print_all();
            compilation.diagnostics.print_summary();
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Compile {
            input,
            output,
            emit_llvm,
            no_link,
        } => {
            log::info!("compiling {:?}", input);
            let module = load_module(&input)?;

            let mut compilation = Compilation::new(module, &input.display().to_string());
            if !compilation.analyze() {
                compilation.diagnostics.print_all();
                compilation.diagnostics.print_summary();
                std::process::exit(1);
            }

            let context = inkwell::context::Context::create();
            let mut codegen = CodeGen::new(&context, &compilation);
            codegen
                .compile()
                .map_err(anyhow::Error::msg)
                .context("code generation failed")?;

            let ll_path = input.with_extension("ll");
            codegen
                .write_ir_to_file(&ll_path)
                .map_err(anyhow::Error::msg)?;
            log::info!("wrote {:?}", ll_path);

            if emit_llvm || no_link {
                return Ok(());
            }

            let binary = output.unwrap_or_else(|| PathBuf::from("a.out"));
            let status = std::process::Command::new("clang")
                .arg(&ll_path)
                .arg("-o")
                .arg(&binary)
                .status()
                .context("failed to invoke clang")?;
            if !status.success() {
                anyhow::bail!("clang exited with {}", status);
            }
            log::info!("wrote {:?}", binary);
            Ok(())
        }
    }
}
