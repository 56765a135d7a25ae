//! mktheapidocs: write one markdown page per module of a Python package.
//!
//! `mktheapidocs my_pkg docs/api https://github.com/me/repo/blob/main`

use anyhow::{Context, Result};
use clap::Parser;
use mktheapidocs::{discover, logging, parser, render};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "mktheapidocs",
    about = "Generate markdown API documentation from numpydoc-style Python docstrings"
)]
struct Cli {
    /// Dotted name of the module or package to document
    module_name: String,

    /// Directory the markdown tree is written under
    output_dir: PathBuf,

    /// Base URL source links point at
    source_location: String,

    /// Directory to search for the module (repeatable, default: current directory)
    #[arg(short = 'p', long = "python-path")]
    python_path: Vec<PathBuf>,

    /// More log output (-vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet)?;

    let search_paths = if cli.python_path.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.python_path.clone()
    };
    make_api_doc(&cli.module_name, &cli.output_dir, &cli.source_location, &search_paths)
}

/// Document every module of `module_name` under `output_dir`.
fn make_api_doc(
    module_name: &str,
    output_dir: &Path,
    source_location: &str,
    search_paths: &[PathBuf],
) -> Result<()> {
    let output_dir = std::path::absolute(output_dir)
        .with_context(|| format!("invalid output directory: {}", output_dir.display()))?;
    let modules = discover::discover(module_name, search_paths)?;

    for discovered in &modules {
        let module = match parser::load(discovered) {
            Ok(module) => module,
            Err(e) => {
                warn!("skipping {}: {:#}", discovered.name, e);
                continue;
            }
        };
        let (path, text) = render::module::doc_module(
            &discovered.name,
            &module,
            &output_dir,
            source_location,
            discovered.is_leaf,
        )?;
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Built documentation for {}", discovered.file.display());
    }
    Ok(())
}
