//! Transparency engine and file/batch processing.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::{debug, error, info, warn};

use crate::alpha::{self, AlphaMap, TransparencyStats};
use crate::backup::BackupGuard;
use crate::config::TransparencyConfig;
use crate::error::{Error, Result};
use crate::smoothing;

/// Extension of the scratch file written next to an original during in-place
/// processing. Not `png`, so directory scans never pick it up.
const SCRATCH_EXTENSION: &str = "whiteout-tmp";

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the original was restored from its backup after a failure.
    pub restored: bool,
    /// Tier counts, present when the image was processed.
    pub stats: Option<TransparencyStats>,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failure(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            restored: false,
            stats: None,
            message,
        }
    }

    fn success(path: &Path, stats: TransparencyStats) -> Self {
        Self {
            path: path.to_path_buf(),
            success: true,
            restored: false,
            stats: Some(stats),
            message: format!(
                "{} transparent, {} partial, {} opaque",
                stats.transparent, stats.partial, stats.opaque
            ),
        }
    }
}

/// Converts near-white pixels to transparency and smooths the result.
///
/// Create once with [`TransparencyEngine::new()`] and reuse for many images.
/// The configuration is validated up front, so processing never fails on it.
#[derive(Debug, Clone)]
pub struct TransparencyEngine {
    config: TransparencyConfig,
}

impl TransparencyEngine {
    /// Create an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration fails
    /// [`TransparencyConfig::validate`].
    pub fn new(config: TransparencyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &TransparencyConfig {
        &self.config
    }

    /// Derive the raw (unsmoothed) alpha map for an image.
    #[must_use]
    pub fn derive(&self, image: &RgbaImage) -> AlphaMap {
        alpha::derive_alpha_map(image, &self.config)
    }

    /// Smooth an alpha map with the configured blur radius.
    #[must_use]
    pub fn smooth(&self, alpha: &AlphaMap) -> AlphaMap {
        smoothing::smooth_alpha(alpha, self.config.blur_radius)
    }

    /// Run derivation and smoothing, returning a new image whose RGB matches
    /// the input and whose alpha is the smoothed alpha map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPixelData`] if the image has no pixels.
    pub fn process(&self, image: &RgbaImage) -> Result<(RgbaImage, TransparencyStats)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::InvalidPixelData(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let (raw, stats) = alpha::derive_with_stats(image, &self.config);
        let smoothed = self.smooth(&raw);

        let mut output = image.clone();
        alpha::apply_alpha_map(&mut output, &smoothed)?;
        Ok((output, stats))
    }

    /// Decode `input` and process it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the extension is not one of
    /// [`is_supported_image`]'s, and propagates decode and processing failures.
    pub fn load(&self, input: &Path) -> Result<(RgbaImage, TransparencyStats)> {
        if !is_supported_image(input) {
            let ext = input
                .extension()
                .map_or_else(|| "(none)".to_string(), |e| e.to_string_lossy().into_owned());
            return Err(Error::UnsupportedFormat(ext));
        }

        let rgba = image::open(input)?.to_rgba8();
        debug!(
            "decoded {} ({}x{})",
            input.display(),
            rgba.width(),
            rgba.height()
        );
        self.process(&rgba)
    }

    /// Decode `input`, process it, and write a PNG to `output`.
    ///
    /// # Errors
    ///
    /// Propagates format, decode, processing, and encode failures.
    pub fn process_path(&self, input: &Path, output: &Path) -> Result<TransparencyStats> {
        let (result, stats) = self.load(input)?;
        save_png(&result, output)?;
        debug!(
            "wrote {}: {} transparent, {} partial, {} opaque",
            output.display(),
            stats.transparent,
            stats.partial,
            stats.opaque
        );
        Ok(stats)
    }

    /// Process a single image file: load, derive, smooth, save as PNG.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        info!("processing {}", input.display());

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return ProcessResult::failure(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        match self.process_path(input, output) {
            Ok(stats) => ProcessResult::success(input, stats),
            Err(e) => {
                error!("failed to process {}: {e}", input.display());
                ProcessResult::failure(input, format!("Failed to process: {e}"))
            }
        }
    }

    /// Rewrite every PNG in `input_dir` in place, keeping a copy of each
    /// original in `backup_dir`.
    ///
    /// A file that fails is restored from its backup and the batch moves on.
    /// Uses parallel iteration when the `parallel` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each PNG found.
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, backup_dir: &Path) -> Vec<ProcessResult> {
        for dir in [input_dir, backup_dir] {
            if !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    return vec![ProcessResult::failure(
                        dir,
                        format!("Failed to create directory: {e}"),
                    )];
                }
            }
        }

        let mut entries: Vec<PathBuf> = match fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_png(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failure(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };
        entries.sort();

        if entries.is_empty() {
            warn!("no PNG files found in {}", input_dir.display());
            return Vec::new();
        }
        info!(
            "found {} PNG file(s) in {}",
            entries.len(),
            input_dir.display()
        );

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|path| self.process_in_place(path, backup_dir))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries
                .iter()
                .map(|path| self.process_in_place(path, backup_dir))
                .collect()
        }
    }

    /// Back up `path`, process it into a scratch file, then swap the scratch file in.
    fn process_in_place(&self, path: &Path, backup_dir: &Path) -> ProcessResult {
        info!("processing {}", path.display());

        let guard = match BackupGuard::create(path, backup_dir) {
            Ok(g) => g,
            Err(e) => {
                error!("failed to back up {}: {e}", path.display());
                return ProcessResult::failure(path, format!("Failed to back up: {e}"));
            }
        };

        let scratch = scratch_path(path);
        let mut scratch_created = false;
        let outcome = self.replace_via_scratch(path, &scratch, &mut scratch_created);

        match outcome {
            Ok(stats) => {
                guard.commit();
                info!("finished {}", path.display());
                ProcessResult::success(path, stats)
            }
            Err(e) => {
                error!("failed to process {}: {e}", path.display());
                // Never delete a scratch path this run did not create.
                if scratch_created && scratch.exists() {
                    if let Err(rm) = fs::remove_file(&scratch) {
                        warn!("could not remove {}: {rm}", scratch.display());
                    }
                }

                let mut result = ProcessResult::failure(path, format!("Failed to process: {e}"));
                match guard.restore() {
                    Ok(()) => result.restored = true,
                    Err(re) => {
                        error!("failed to restore {}: {re}", path.display());
                        result.message = format!("{}; restore failed: {re}", result.message);
                    }
                }
                result
            }
        }
    }

    /// Write the processed image to `scratch` (which must not exist yet) and
    /// rename it over `path`.
    fn replace_via_scratch(
        &self,
        path: &Path,
        scratch: &Path,
        scratch_created: &mut bool,
    ) -> Result<TransparencyStats> {
        let (result, stats) = self.load(path)?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(scratch)?;
        *scratch_created = true;
        write_png(&result, file)?;

        fs::rename(scratch, path)?;
        Ok(stats)
    }
}

/// Hidden, per-process scratch path next to `path`, e.g. `.a.png.1234.whiteout-tmp`.
fn scratch_path(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!(
        ".{name}.{}.{SCRATCH_EXTENSION}",
        std::process::id()
    ))
}

/// Check if a file has an extension the decoder handles.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Check if a file has a `.png` extension (any case).
#[must_use]
pub fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Save an RGBA image as a PNG with maximum compression.
///
/// The output is always PNG, regardless of the extension of `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoding fails.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    write_png(img, File::create(path)?)
}

fn write_png(img: &RgbaImage, file: File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    let encoder =
        PngEncoder::new_with_quality(&mut writer, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_transparent.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_transparent.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn engine() -> TransparencyEngine {
        TransparencyEngine::new(TransparencyConfig::default()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_configuration() {
        let config = TransparencyConfig {
            full_whiteness: -1.0,
            ..TransparencyConfig::default()
        };
        assert!(matches!(
            TransparencyEngine::new(config),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn process_rejects_empty_image() {
        let err = engine().process(&RgbaImage::new(0, 4)).unwrap_err();
        assert!(matches!(err, Error::InvalidPixelData(_)));
    }

    #[test]
    fn process_keeps_rgb_and_counts_tiers() {
        let img = RgbaImage::from_fn(4, 3, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([12, 80, 200, 17])
            }
        });
        let (out, stats) = engine().process(&img).unwrap();

        assert_eq!(out.dimensions(), img.dimensions());
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a.0[..3], b.0[..3]);
        }
        assert_eq!(stats.transparent, 6);
        assert_eq!(stats.opaque, 6);
        assert_eq!(stats.partial, 0);
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("whiteout-engine-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn two_pixel_example_feathers_both_sides() {
        let img = RgbaImage::from_raw(2, 1, vec![255, 255, 255, 255, 0, 0, 0, 255]).unwrap();
        let engine = engine();

        let raw = engine.derive(&img);
        assert_eq!(raw.as_raw(), &[0, 255]);

        let (out, _) = engine.process(&img).unwrap();
        let (a, b) = (out.get_pixel(0, 0)[3], out.get_pixel(1, 0)[3]);
        assert!((8..=15).contains(&a), "transparent side became {a}");
        assert!((240..=247).contains(&b), "opaque side became {b}");
    }

    #[test]
    fn underflowing_blur_radius_keeps_opaque_pixels_opaque() {
        let engine = TransparencyEngine::new(TransparencyConfig {
            blur_radius: 1e-23,
            ..TransparencyConfig::default()
        })
        .unwrap();
        let img = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        let (out, stats) = engine.process(&img).unwrap();
        assert_eq!(stats.opaque, 3);
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn load_rejects_unsupported_extension() {
        let err = engine().load(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == "txt"));
        let err = engine().load(Path::new("README")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn process_file_reports_unsupported_format() {
        let dir = scratch_dir("unsupported");
        let input = dir.join("notes.txt");
        fs::write(&input, b"not an image").unwrap();

        let result = engine().process_file(&input, &dir.join("out.png"));
        assert!(!result.success);
        assert!(result.message.contains("unsupported image format"));
        assert!(!dir.join("out.png").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn scratch_path_is_hidden_and_never_a_png() {
        let scratch = scratch_path(Path::new("/data/pngs/a.png"));
        assert_eq!(scratch.parent(), Some(Path::new("/data/pngs")));
        let name = scratch.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".a.png."));
        assert!(!is_png(&scratch));
        assert_ne!(scratch_path(Path::new("a.png")), scratch_path(Path::new("temp_a.png")));
    }

    #[test]
    fn existing_scratch_file_is_left_alone_and_original_restored() {
        let dir = scratch_dir("stale");
        let input_dir = dir.join("in");
        let backup_dir = dir.join("backup");
        fs::create_dir_all(&input_dir).unwrap();

        let original = input_dir.join("a.png");
        RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]))
            .save(&original)
            .unwrap();
        let original_bytes = fs::read(&original).unwrap();
        let scratch = scratch_path(&original);
        fs::write(&scratch, b"someone else's file").unwrap();

        let results = engine().process_directory(&input_dir, &backup_dir);
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].restored);
        assert_eq!(fs::read(&original).unwrap(), original_bytes);
        assert_eq!(fs::read(&scratch).unwrap(), b"someone else's file");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_blur_radius_keeps_raw_alpha() {
        let engine = TransparencyEngine::new(TransparencyConfig {
            blur_radius: 0.0,
            ..TransparencyConfig::default()
        })
        .unwrap();
        let img = RgbaImage::from_raw(2, 1, vec![255, 255, 255, 255, 0, 0, 0, 255]).unwrap();
        let (out, _) = engine.process(&img).unwrap();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn default_output_path_appends_transparent_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_transparent.png"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_transparent.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn is_png_ignores_case() {
        assert!(is_png(Path::new("a.png")));
        assert!(is_png(Path::new("a.PNG")));
        assert!(!is_png(Path::new("a.jpg")));
        assert!(!is_png(Path::new("png")));
    }
}
