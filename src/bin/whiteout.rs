use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::info;

use whiteout::config::{
    DEFAULT_BLUR_RADIUS, DEFAULT_FULL_SPREAD, DEFAULT_FULL_WHITENESS, DEFAULT_PARTIAL_SPREAD,
    DEFAULT_PARTIAL_WHITENESS,
};
use whiteout::{default_output_path, ProcessResult, TransparencyConfig, TransparencyEngine};

#[derive(Parser)]
#[command(
    name = "whiteout",
    about = "Turn near-white image backgrounds into smooth PNG transparency",
    version,
    after_help = "Directory mode rewrites every PNG in place and keeps the originals in the backup directory.\n\
                  File mode writes a new PNG next to the input (or to --output)."
)]
struct Cli {
    /// Input image file or directory of PNGs
    #[arg(default_value = "original_pngs")]
    input: PathBuf,

    /// Output file for single-image mode (default: {name}_transparent.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where originals are copied before being rewritten (directory mode)
    #[arg(short, long, default_value = "used_pngs")]
    backup_dir: PathBuf,

    /// Whiteness (channel mean) at or above which neutral pixels become fully transparent
    #[arg(long, default_value_t = DEFAULT_FULL_WHITENESS)]
    full_whiteness: f32,

    /// Color spread below which a pixel is neutral enough to become fully transparent
    #[arg(long, default_value_t = DEFAULT_FULL_SPREAD)]
    full_spread: f32,

    /// Whiteness at or above which neutral pixels become partially transparent
    #[arg(long, default_value_t = DEFAULT_PARTIAL_WHITENESS)]
    partial_whiteness: f32,

    /// Color spread below which a pixel is neutral enough to become partially transparent
    #[arg(long, default_value_t = DEFAULT_PARTIAL_SPREAD)]
    partial_spread: f32,

    /// Gaussian blur radius applied to the alpha channel (0 disables smoothing)
    #[arg(long, default_value_t = DEFAULT_BLUR_RADIUS)]
    blur_radius: f32,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let config = TransparencyConfig {
        full_whiteness: cli.full_whiteness,
        full_spread: cli.full_spread,
        partial_whiteness: cli.partial_whiteness,
        partial_spread: cli.partial_spread,
        blur_radius: cli.blur_radius,
    };

    let engine = match TransparencyEngine::new(config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    info!("using {config:?}");

    let input_path = cli.input.as_path();
    let results = if input_path.is_dir() {
        if cli.output.is_some() {
            eprintln!("Error: --output only applies to a single input file");
            process::exit(1);
        }
        engine.process_directory(input_path, &cli.backup_dir)
    } else if input_path.exists() {
        let output_path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(input_path));
        vec![engine.process_file(input_path, &output_path)]
    } else {
        eprintln!(
            "Error: Input path does not exist: {}",
            input_path.display()
        );
        process::exit(1);
    };

    if results.is_empty() && !cli.quiet {
        eprintln!("No PNG files found in {}", input_path.display());
        return;
    }

    let mut success_count = 0u32;
    let mut restored_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, cli.quiet);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
            if r.restored {
                restored_count += 1;
            }
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        if restored_count > 0 {
            eprint!(", Restored: {restored_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, quiet: bool) {
    if quiet && result.success {
        return;
    }

    let filename = display_name(&result.path);
    if result.success {
        eprintln!("[OK] {filename} ({})", result.message);
    } else if result.restored {
        eprintln!("[FAIL] {filename}: {} (original restored)", result.message);
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
