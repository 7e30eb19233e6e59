use crate::color_ranker::{background_candidates, rank};
use crate::color_sample::{ColorSample, GreenDominance};
use crate::logo_error::LogoError;
use crate::region_extractor::{composite, crop, extract_foreground, locate, BoundingBox};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How the backdrop region (the green circle in the restaurant logo) is found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BackgroundSelection {
    Fixed(ColorSample),
    /// Rank the image colors and try every green-dominant one among the
    /// `top_colors` most frequent; the candidate with the largest region wins.
    Discover {
        top_colors: usize,
        tolerance: u8,
        green_floor: u8,
    },
}

/// What ends up inside the backdrop-sized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ForegroundPlacement {
    /// Crop to the backdrop and make every backdrop-colored pixel transparent.
    KeyOut,
    /// Crop to the region of the given color and center it, unmodified, on a
    /// transparent canvas the size of the backdrop.
    Recenter(ColorSample),
}

/// Used when the backdrop cannot be located: a centered square whose side is
/// `height_fraction` of the image height, keyed with `key`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionFallback {
    pub height_fraction: f32,
    pub key: ColorSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoJob {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Also write the logo centered on a canvas the size of the source image.
    #[serde(default)]
    pub full_size_output_path: Option<PathBuf>,
    pub background: BackgroundSelection,
    pub placement: ForegroundPlacement,
    #[serde(default)]
    pub fallback: Option<RegionFallback>,
}

const LOGO_GREEN: [u8; 3] = [102, 187, 106];
const LOGO_RED: [u8; 3] = [239, 83, 80];

impl Default for LogoJob {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("image.png"),
            output_path: PathBuf::from("logo.png"),
            full_size_output_path: None,
            background: BackgroundSelection::Fixed(ColorSample::new(LOGO_GREEN, 40)),
            placement: ForegroundPlacement::Recenter(ColorSample::new(LOGO_RED, 40)),
            fallback: Some(RegionFallback {
                height_fraction: 0.75,
                key: ColorSample::new(LOGO_GREEN, 40),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub padding_factor: f32,
}

impl Default for PadJob {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("logo.png"),
            output_path: PathBuf::from("logo_padded.png"),
            padding_factor: 1.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedLogo {
    pub logo: RgbaImage,
    /// Backdrop region the output was sized from.
    pub region: BoundingBox,
    /// Transparency key used for `KeyOut`, or the backdrop sample that was matched.
    pub key: ColorSample,
    pub region_estimated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogoReport {
    pub region: BoundingBox,
    pub region_estimated: bool,
    pub logo_size: (u32, u32),
    pub written: Vec<PathBuf>,
}

pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, LogoError> {
    let image = image::load_from_memory(bytes).map_err(LogoError::Decode)?;
    Ok(image.to_rgba8())
}

pub fn load_rgba(path: &Path) -> Result<RgbaImage, LogoError> {
    let bytes = fs::read(path)?;
    decode_rgba(&bytes)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, LogoError> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(LogoError::Encode)?;
    Ok(encoded)
}

/// Writes `image` as PNG. The file appears at `path` only once it is complete.
pub fn persist_png(image: &RgbaImage, path: &Path) -> Result<(), LogoError> {
    let encoded = encode_png(image)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let partial_path = path.with_extension("png.partial");
    fs::write(&partial_path, encoded)?;
    if let Err(e) = fs::rename(&partial_path, path) {
        let _ = fs::remove_file(&partial_path);
        return Err(e.into());
    }
    Ok(())
}

/// Centered square of side `height * fraction`, clipped to the image.
pub fn estimate_region(width: u32, height: u32, fraction: f32) -> Result<BoundingBox, LogoError> {
    if width == 0 || height == 0 {
        return Err(LogoError::EmptyImage);
    }

    let side = ((height as f32 * fraction) as u32).max(1);
    let (center_x, center_y) = (width / 2, height / 2);
    let xmin = center_x.saturating_sub(side / 2);
    let ymin = center_y.saturating_sub(side / 2);

    Ok(BoundingBox {
        xmin,
        ymin,
        xmax: (xmin + side - 1).min(width - 1),
        ymax: (ymin + side - 1).min(height - 1),
    })
}

fn find_background(
    image: &RgbaImage,
    selection: &BackgroundSelection,
) -> Result<(ColorSample, BoundingBox), LogoError> {
    match selection {
        BackgroundSelection::Fixed(sample) => locate(image, sample)
            .map(|region| (*sample, region))
            .ok_or_else(|| LogoError::RegionNotFound {
                target: sample.to_string(),
            }),
        BackgroundSelection::Discover {
            top_colors,
            tolerance,
            green_floor,
        } => {
            let ranked = rank(image)?;
            let candidates =
                background_candidates(&ranked, *top_colors, GreenDominance { floor: *green_floor });
            debug!("Found {} potential background colors", candidates.len());

            let mut best: Option<(ColorSample, BoundingBox)> = None;
            for color in candidates {
                let sample = ColorSample::new(color, *tolerance);
                let Some(region) = locate(image, &sample) else {
                    continue;
                };
                if best.map_or(true, |(_, current)| region.area() > current.area()) {
                    debug!("Background candidate {} covers {}, area {}", sample, region, region.area());
                    best = Some((sample, region));
                }
            }

            best.ok_or_else(|| LogoError::RegionNotFound {
                target: format!(
                    "a green background among the top {} colors (floor {})",
                    top_colors, green_floor
                ),
            })
        }
    }
}

/// Extracts the logo from an in-memory screenshot.
pub fn extract_logo(image: &RgbaImage, job: &LogoJob) -> Result<ExtractedLogo, LogoError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(LogoError::EmptyImage);
    }

    let (key, region, region_estimated) = match find_background(image, &job.background) {
        Ok((sample, region)) => (sample, region, false),
        Err(LogoError::RegionNotFound { target }) => {
            let Some(fallback) = job.fallback else {
                return Err(LogoError::RegionNotFound { target });
            };
            let region = estimate_region(width, height, fallback.height_fraction)?;
            warn!("⚠ No pixels matched {}, using estimated region {}", target, region);
            (fallback.key, region, true)
        }
        Err(e) => return Err(e),
    };
    info!("Background region {} ({}x{})", region, region.width(), region.height());

    let logo = match &job.placement {
        ForegroundPlacement::KeyOut => extract_foreground(image, &region, &key)?,
        ForegroundPlacement::Recenter(mark) => {
            let mark_region = locate(image, mark).ok_or_else(|| LogoError::RegionNotFound {
                target: mark.to_string(),
            })?;
            info!("Foreground region {} ({}x{})", mark_region, mark_region.width(), mark_region.height());
            let content = crop(image, &mark_region)?;
            composite(&content, region.width(), region.height())?
        }
    };

    Ok(ExtractedLogo {
        logo,
        region,
        key,
        region_estimated,
    })
}

/// Loads the screenshot, extracts the logo and writes every configured output.
pub fn run(job: &LogoJob) -> Result<LogoReport, LogoError> {
    info!("📖 Loading {}", job.source_path.display());
    let source = load_rgba(&job.source_path)?;
    info!("Source dimensions: {}x{}", source.width(), source.height());

    let extracted = extract_logo(&source, job)?;
    let full_size = match &job.full_size_output_path {
        Some(path) => Some((composite(&extracted.logo, source.width(), source.height())?, path)),
        None => None,
    };

    let mut written = Vec::new();
    persist_png(&extracted.logo, &job.output_path)?;
    info!(
        "✅ Logo saved to {} ({}x{})",
        job.output_path.display(),
        extracted.logo.width(),
        extracted.logo.height()
    );
    written.push(job.output_path.clone());

    if let Some((image, path)) = full_size {
        persist_png(&image, path)?;
        info!("✅ Full-size logo saved to {} ({}x{})", path.display(), image.width(), image.height());
        written.push(path.clone());
    }

    Ok(LogoReport {
        region: extracted.region,
        region_estimated: extracted.region_estimated,
        logo_size: extracted.logo.dimensions(),
        written,
    })
}

/// Centers `image` on a transparent canvas `padding_factor` times its size.
pub fn pad(image: &RgbaImage, padding_factor: f32) -> Result<RgbaImage, LogoError> {
    let new_width = (image.width() as f32 * padding_factor) as u32;
    let new_height = (image.height() as f32 * padding_factor) as u32;
    composite(image, new_width, new_height)
}

pub fn run_pad(job: &PadJob) -> Result<(u32, u32), LogoError> {
    let original = load_rgba(&job.input_path)?;
    let padded = pad(&original, job.padding_factor)?;
    persist_png(&padded, &job.output_path)?;
    info!("Created padded logo at: {}", job.output_path.display());
    Ok(padded.dimensions())
}
