use std::time::Instant;

use camino::Utf8PathBuf;
use clap::Parser;
use console::style;
use kiln::{Invocation, ProjectConfig};

/// Builds and packages a bundled web application.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Project root.
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    #[command(subcommand)]
    invocation: Invocation,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    kiln::init_logging().map_err(kiln::KilnError::Logging)?;

    let s = Instant::now();
    let root = Utf8PathBuf::try_from(std::path::absolute(&args.root)?)?;

    eprintln!(
        "Running {} {} in {} mode.",
        style("kiln").red(),
        style(args.invocation).green(),
        style(args.invocation.mode()).blue()
    );

    let project = ProjectConfig::load(&root).map_err(kiln::KilnError::Config)?;
    let (summary, diagnostics) = kiln::pipeline::run(args.invocation, project)?;

    tracing::debug!("\n{diagnostics}");

    if let Some(artifact) = &summary.artifact {
        match &artifact.digest {
            Some(digest) => eprintln!("Packaged {} (blake3:{digest})", artifact.path),
            None => eprintln!("Packaged {}", artifact.path),
        }
    }

    eprintln!(
        "Finished {} {}",
        args.invocation,
        kiln::as_overhead(s)
    );

    Ok(())
}
