use crate::color_sample::GreenDominance;
use crate::logo_error::LogoError;
use image::RgbaImage;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedColor {
    pub color: [u8; 3],
    pub count: u64,
}

/// Tabulates every pixel's RGB value (alpha ignored) and returns the colors
/// ordered by pixel count, most frequent first. Equal counts keep the order
/// in which the colors were first seen while scanning row by row.
pub fn rank(image: &RgbaImage) -> Result<Vec<RankedColor>, LogoError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(LogoError::EmptyImage);
    }

    // color -> (count, first-seen index)
    let mut histogram: HashMap<[u8; 3], (u64, usize)> = HashMap::new();
    for pixel in image.pixels() {
        let next_index = histogram.len();
        let entry = histogram
            .entry([pixel[0], pixel[1], pixel[2]])
            .or_insert((0, next_index));
        entry.0 += 1;
    }

    let mut ranked: Vec<_> = histogram.into_iter().collect();
    ranked.sort_by_key(|&(_, (count, first_seen))| (Reverse(count), first_seen));

    Ok(ranked
        .into_iter()
        .map(|(color, (count, _))| RankedColor { color, count })
        .collect())
}

/// Picks background candidates out of the first `limit` ranked colors.
pub fn background_candidates(
    ranked: &[RankedColor],
    limit: usize,
    rule: GreenDominance,
) -> Vec<[u8; 3]> {
    ranked
        .iter()
        .take(limit)
        .filter(|entry| rule.accepts(entry.color))
        .map(|entry| entry.color)
        .collect()
}
