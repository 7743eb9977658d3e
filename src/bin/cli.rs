//! blockvfs CLI
//!
//! Imports database images through the stream codec and reports on or
//! re-exports them. Doubles as an end-to-end exercise of the codec against
//! real files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use blockvfs::{deserialize_iter, serialize_iter, Config, Registry};

/// Size of the file-read chunks fed to the codec. Deliberately unaligned
/// with the block size: the codec must not care.
const READ_CHUNK: usize = 64 * 1024 - 17;

/// blockvfs CLI
#[derive(Parser, Debug)]
#[command(name = "blockvfs-cli")]
#[command(about = "Inspect and round-trip database images through blockvfs")]
#[command(version)]
struct Args {
    /// Block size in bytes
    #[arg(short, long, default_value = "4096")]
    block_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an image and print its block layout
    Info {
        /// Path to the database image
        image: PathBuf,
    },

    /// Import an image, export it again, and compare sizes
    Roundtrip {
        /// Path to the database image
        image: PathBuf,

        /// Where to write the exported copy
        output: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockvfs=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder().block_size(args.block_size).build();
    let registry = Registry::new(config);

    let result = match args.command {
        Commands::Info { image } => info(&registry, &image),
        Commands::Roundtrip { image, output } => roundtrip(&registry, &image, &output),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        process::exit(1);
    }
}

fn info(registry: &Registry, image: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let size = import(registry, image, "image")?;

    let blocks = size.div_ceil(registry.block_size() as u64);
    println!("image:      {}", image.display());
    println!("size:       {size} bytes");
    println!("block size: {} bytes", registry.block_size());
    println!("blocks:     {blocks}");
    Ok(())
}

fn roundtrip(
    registry: &Registry,
    image: &PathBuf,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = import(registry, image, "image")?;

    let mut writer = BufWriter::new(File::create(output)?);
    let mut written = 0u64;
    for chunk in serialize_iter(registry, "image")? {
        let chunk = chunk?;
        writer.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    writer.flush()?;

    if written != size {
        return Err(format!("exported {written} bytes, imported {size}").into());
    }
    println!("round-tripped {size} bytes to {}", output.display());
    Ok(())
}

/// Stream a file from disk into the registry in unaligned chunks
fn import(
    registry: &Registry,
    path: &PathBuf,
    file_id: &str,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut read_error = None;

    let chunks = std::iter::from_fn(|| {
        let mut chunk = vec![0u8; READ_CHUNK];
        match reader.read(&mut chunk) {
            Ok(0) => None,
            Ok(n) => {
                chunk.truncate(n);
                Some(chunk)
            }
            Err(e) => {
                read_error = Some(e);
                None
            }
        }
    });

    let size = deserialize_iter(registry, file_id, chunks)?;
    if let Some(e) = read_error {
        return Err(e.into());
    }
    Ok(size)
}
