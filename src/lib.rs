//! Turn near-white image backgrounds into smooth PNG transparency.
//!
//! Every pixel is classified by how white and how neutral it is. Bright,
//! neutral pixels become transparent, slightly darker ones fade in linearly,
//! and everything else stays opaque. The resulting alpha channel is then
//! softened with a small Gaussian blur so cut-out edges do not look jagged.
//! RGB channels are never modified.
//!
//! # Quick Start
//!
//! ```no_run
//! use whiteout::{TransparencyConfig, TransparencyEngine};
//!
//! let engine = TransparencyEngine::new(TransparencyConfig::default()).expect("valid config");
//! let img = image::open("logo.png").unwrap().to_rgba8();
//! let (transparent, stats) = engine.process(&img).unwrap();
//! whiteout::save_png(&transparent, "logo_transparent.png".as_ref()).unwrap();
//! println!("{} pixels made fully transparent", stats.transparent);
//! ```
//!
//! # Batch processing
//!
//! [`TransparencyEngine::process_directory`] rewrites every PNG in a
//! directory in place. Each original is first copied to a backup directory
//! and restored if anything goes wrong, so one bad file never damages the
//! rest of the batch.
//!
//! ```no_run
//! use whiteout::{TransparencyConfig, TransparencyEngine};
//!
//! let engine = TransparencyEngine::new(TransparencyConfig::default()).expect("valid config");
//! for result in engine.process_directory("original_pngs".as_ref(), "used_pngs".as_ref()) {
//!     println!("{}: {}", result.path.display(), result.message);
//! }
//! ```

#![deny(missing_docs)]

pub mod alpha;
mod backup;
pub mod config;
mod engine;
pub mod error;
pub mod smoothing;

pub use alpha::{AlphaMap, Tier, TransparencyStats};
pub use backup::BackupGuard;
pub use config::TransparencyConfig;
pub use engine::{
    default_output_path, is_png, is_supported_image, save_png, ProcessResult, TransparencyEngine,
};
pub use error::{Error, Result};
