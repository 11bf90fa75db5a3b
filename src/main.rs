use clap::{Parser, Subcommand};
use mpq_archive::{Archive, OpenOptions};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mpq-archive", about = "Inspect and extract MPQ archives")]
struct Cli {
    /// Path to the archive.
    #[arg(short, long, global = true)]
    source: PathBuf,

    /// Skip loading `(listfile)` at open time.
    #[arg(long, global = true)]
    skip_listfile: bool,

    /// Treat unimplemented or failing codecs as warnings instead of
    /// aborting the read.
    #[arg(long, global = true)]
    permissive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every name recorded in the archive's listfile.
    List,
    /// Extract one named file, or every file in the listfile.
    Extract {
        /// Extract only this file.
        #[arg(long)]
        name: Option<String>,
        /// Extract every file in the listfile.
        #[arg(long, conflicts_with = "name")]
        all: bool,
        /// Directory to write extracted files into.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Dump the archive and user-data headers as JSON.
    Headers,
    /// Dump the hash table as text.
    HashTable,
    /// Dump the block table as text.
    BlockTable,
}

fn run() -> mpq_archive::Result<()> {
    let cli = Cli::parse();

    let options = OpenOptions {
        load_listfile: !cli.skip_listfile,
        permissive: cli.permissive,
        ..OpenOptions::default()
    };
    let file = File::open(&cli.source)?;
    let mut archive = Archive::open(file, options)?;

    match cli.command {
        Commands::List => {
            archive.write_files_text(io::stdout())?;
        }
        Commands::Extract { name, all: _, output } => {
            fs::create_dir_all(&output)?;
            let names = name.map(|n| vec![n]);
            let extracted = archive.extract(names.as_deref())?;
            for (name, bytes) in extracted {
                let dest = output.join(name.replace('\\', "/"));
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(dest, bytes)?;
            }
        }
        Commands::Headers => {
            archive.write_headers_json(io::stdout())?;
        }
        Commands::HashTable => {
            archive.write_hash_table_text(io::stdout())?;
        }
        Commands::BlockTable => {
            archive.write_block_table_text(io::stdout())?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(io::stderr(), "error: {err}");
            ExitCode::FAILURE
        }
    }
}
