use crate::color_sample::ColorSample;
use crate::logo_error::LogoError;
use image::{imageops, Rgba, RgbaImage};
use std::fmt;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Inclusive pixel rectangle, `xmin <= xmax` and `ymin <= ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.xmax - self.xmin + 1
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax && self.xmax < width && self.ymax < height
    }

    fn expand_to(&mut self, x: u32, y: u32) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Finds the smallest rectangle holding every pixel that matches `sample`.
///
/// Matching pixels do not have to be connected; the box spans all of them.
/// Returns `None` when nothing matches.
pub fn locate(image: &RgbaImage, sample: &ColorSample) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        if !sample.matches(pixel) {
            continue;
        }
        match bbox.as_mut() {
            Some(found) => found.expand_to(x, y),
            None => {
                bbox = Some(BoundingBox {
                    xmin: x,
                    ymin: y,
                    xmax: x,
                    ymax: y,
                })
            }
        }
    }

    bbox
}

/// Copies the pixels inside `bbox` into a new image.
pub fn crop(image: &RgbaImage, bbox: &BoundingBox) -> Result<RgbaImage, LogoError> {
    check_bounds(image, bbox)?;
    Ok(imageops::crop_imm(image, bbox.xmin, bbox.ymin, bbox.width(), bbox.height()).to_image())
}

/// Crops `image` to `bbox` and keys out the background.
///
/// Every pixel matching `background` becomes `(0, 0, 0, 0)`; every other
/// pixel is copied untouched, alpha included. The decision is made pixel by
/// pixel, so background-colored specks inside the subject are cleared too.
pub fn extract_foreground(
    image: &RgbaImage,
    bbox: &BoundingBox,
    background: &ColorSample,
) -> Result<RgbaImage, LogoError> {
    let mut cropped = crop(image, bbox)?;

    for pixel in cropped.pixels_mut() {
        if background.matches(pixel) {
            *pixel = TRANSPARENT;
        }
    }

    Ok(cropped)
}

/// Centers `foreground` on a fully transparent canvas.
///
/// The paste replaces canvas pixels outright (no blending). A foreground
/// larger than the canvas gets a negative offset and is clipped to it.
pub fn composite(
    foreground: &RgbaImage,
    canvas_width: u32,
    canvas_height: u32,
) -> Result<RgbaImage, LogoError> {
    if canvas_width == 0 || canvas_height == 0 {
        return Err(LogoError::EmptyImage);
    }

    let (x_offset, y_offset) = centered_offset(
        (foreground.width(), foreground.height()),
        (canvas_width, canvas_height),
    );

    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, TRANSPARENT);
    imageops::replace(&mut canvas, foreground, x_offset, y_offset);
    Ok(canvas)
}

/// Top-left position that centers `inner` on `outer`, rounding toward negative infinity.
pub fn centered_offset(inner: (u32, u32), outer: (u32, u32)) -> (i64, i64) {
    let x = (outer.0 as i64 - inner.0 as i64).div_euclid(2);
    let y = (outer.1 as i64 - inner.1 as i64).div_euclid(2);
    (x, y)
}

fn check_bounds(image: &RgbaImage, bbox: &BoundingBox) -> Result<(), LogoError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(LogoError::EmptyImage);
    }
    if !bbox.fits_within(width, height) {
        return Err(LogoError::OutOfBounds {
            bbox: *bbox,
            width,
            height,
        });
    }
    Ok(())
}
