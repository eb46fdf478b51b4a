use std::path::PathBuf;

use clap::Parser;
use espimg::{ImageSource, ImageSpec};
use espimg_common::options::Options;

/// Synthesizes a bootable UEFI disk image: protective MBR, GPT, and a FAT
/// EFI System Partition populated from a single boot payload or a directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Canonical EFI/BOOT/BOOTX64.EFI layout from a single payload file.
    #[arg(short = 'b', long = "boot", conflicts_with = "directory")]
    boot: Option<PathBuf>,

    /// Populate the image from a host directory tree.
    #[arg(short = 'd', long = "directory", conflicts_with = "boot")]
    directory: Option<PathBuf>,

    /// Output image path.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Volume label (FAT 8.3, space-padded to 11 bytes).
    #[arg(short = 'l', long = "label", default_value = "NOLABEL")]
    label: String,

    /// Preserve the case of names instead of uppercasing them.
    #[arg(short = 'c', long = "preserve-case")]
    preserve_case: bool,

    /// Reuse the output file if it already exists and is large enough.
    #[arg(short = 'f', long = "reformat")]
    reformat: bool,

    /// Emit verbose (trace-level) logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "trace" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    if args.boot.is_none() && args.directory.is_none() {
        anyhow::bail!("one of -b/--boot or -d/--directory is required");
    }

    let source = match (args.boot, args.directory) {
        (Some(boot), None) => ImageSource::SingleBoot(boot),
        (None, Some(dir)) => ImageSource::Directory(dir),
        _ => unreachable!("clap enforces -b/-d mutual exclusivity"),
    };

    let options = Options {
        preserve_case: args.preserve_case,
        reformat: args.reformat,
        verbose: args.verbose,
        label: args.label,
        ..Options::default()
    };

    let spec = ImageSpec {
        output_path: args.output,
        source,
        options,
    };

    espimg::write_image(&spec)?;
    Ok(())
}
