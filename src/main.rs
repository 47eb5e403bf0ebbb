//! image-metadata - dump the metadata of image files.
//!
//! Prints every directory's raw tag values, one `[Directory] 0xTTTT = value`
//! line per tag, or the whole tree as JSON.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_metadata::{
    config::{Cli, OutputFormat},
    decode_user_comment, read_metadata_from_path, Directory, DirectoryKind, ExtractOptions,
    Metadata, TagValue,
};

/// Exif UserComment, which carries its own encoding prefix
const TAG_USER_COMMENT: u32 = 0x9286;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = cli.extract_options();
    let mut failed = false;
    for path in &cli.files {
        if !dump_file(path, &options, cli.format) {
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print one file's metadata. Returns `false` if it could not be read.
fn dump_file(path: &Path, options: &ExtractOptions, format: OutputFormat) -> bool {
    debug!(path = %path.display(), "reading");
    let metadata = match read_metadata_from_path(path, options) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(path = %path.display(), "{}", e);
            eprintln!("{}: {}", path.display(), e);
            return false;
        }
    };

    match format {
        OutputFormat::Text => print_text(path, &metadata),
        OutputFormat::Json => {
            if let Err(e) = print_json(path, &metadata) {
                error!(path = %path.display(), "JSON encoding failed: {}", e);
                return false;
            }
        }
    }
    true
}

// =============================================================================
// Text Output
// =============================================================================

fn print_text(path: &Path, metadata: &Metadata) {
    println!("=== {} ===", path.display());
    for directory in metadata.iter() {
        let name = directory.name();
        for tag in directory.tags() {
            println!("[{}] 0x{:04X} = {}", name, tag.id, render(directory, tag.id, &tag.value));
        }
        for message in directory.errors() {
            println!("[{}] ERROR: {}", name, message);
        }
    }
    println!();
}

fn render(directory: &Directory, tag: u32, value: &TagValue) -> String {
    if tag == TAG_USER_COMMENT && directory.kind() == &DirectoryKind::ExifSubIfd {
        if let Some(bytes) = directory.get_byte_array(tag) {
            return decode_user_comment(&bytes);
        }
    }
    value.to_string()
}

// =============================================================================
// JSON Output
// =============================================================================

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    metadata: &'a Metadata,
}

fn print_json(path: &Path, metadata: &Metadata) -> Result<(), serde_json::Error> {
    let report = FileReport {
        file: path.display().to_string(),
        metadata,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_metadata=debug"
    } else {
        "image_metadata=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
