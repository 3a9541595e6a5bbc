//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Run one entry point of a compiled module on a parameters file")]
pub(crate) struct Args {
    /// Path to the compiled module shared library.
    #[arg(short, long)]
    pub lib: PathBuf,

    /// Path to the module manifest describing its entry points.
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Function name to execute within the module.
    #[arg(short, long)]
    pub func: String,

    /// Runtime library whose symbols the compiled code links against.
    #[arg(short, long)]
    pub runtime_lib: Option<PathBuf>,

    /// Parameters file. If not specified, reads from stdin.
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Output file. If not specified, writes to stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}
