//! folio - build EPUB packages from a JSON project file

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folio::project::Project;
use folio::{EpubConfig, EpubRenderer};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Build EPUB packages", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio book.json out                 Write out/<title>.epub
    folio book.json out -n my-book      Write out/my-book.epub
    folio book.json out/tree --tree     Write the package as loose files")]
struct Cli {
    /// Project file (JSON)
    #[arg(value_name = "PROJECT")]
    project: String,

    /// Output directory
    #[arg(value_name = "OUTPUT_DIR")]
    output: String,

    /// Base name of the .epub file (defaults to the title)
    #[arg(short, long)]
    name: Option<String>,

    /// Write loose files instead of an archive
    #[arg(long)]
    tree: bool,

    /// Deflate level (0-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression_level: Option<u32>,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,

    /// Log progress (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "folio=info",
        (false, _) => "folio=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> folio::Result<()> {
    let project_path = Path::new(&cli.project);
    let base = project_path.parent().unwrap_or(Path::new("."));
    let doc = Project::load(project_path).await?.into_document(base).await?;

    if cli.tree {
        doc.write_files(&cli.output).await?;
        if !cli.quiet {
            println!("Wrote {}", cli.output);
        }
        return Ok(());
    }

    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| file_stem_for(&doc.metadata().title));
    let mut config = EpubConfig::new();
    config.compression_level = cli.compression_level;

    let path = doc
        .write_epub_with(&cli.output, &name, &EpubRenderer, &config)
        .await?;
    if !cli.quiet {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// A file name derived from the title: path separators and control
/// characters become `_`.
fn file_stem_for(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() { "book".to_string() } else { stem }
}
