use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference color plus a per-channel tolerance.
///
/// A pixel matches when each of its R, G and B channels falls inside the
/// closed range `[c - tolerance, c + tolerance]`, clamped to `0..=255`.
/// Alpha never takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSample {
    pub color: [u8; 3],
    pub tolerance: u8,
}

impl ColorSample {
    pub fn new(color: [u8; 3], tolerance: u8) -> Self {
        Self { color, tolerance }
    }

    pub fn matches(&self, pixel: &Rgba<u8>) -> bool {
        self.matches_rgb([pixel[0], pixel[1], pixel[2]])
    }

    pub fn matches_rgb(&self, rgb: [u8; 3]) -> bool {
        self.color.iter().zip(rgb.iter()).all(|(&reference, &channel)| {
            let lower = reference.saturating_sub(self.tolerance);
            let upper = reference.saturating_add(self.tolerance);
            (lower..=upper).contains(&channel)
        })
    }
}

impl fmt::Display for ColorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [red, green, blue] = self.color;
        write!(f, "RGB({}, {}, {}) ±{}", red, green, blue, self.tolerance)
    }
}

/// Heuristic for "this looks like the green backdrop": green strictly above
/// red, blue and an absolute floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreenDominance {
    pub floor: u8,
}

impl Default for GreenDominance {
    fn default() -> Self {
        Self { floor: 100 }
    }
}

impl GreenDominance {
    pub fn accepts(&self, rgb: [u8; 3]) -> bool {
        let [red, green, blue] = rgb;
        green > red && green > blue && green > self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_cube_is_inclusive() {
        let sample = ColorSample::new([100, 100, 100], 10);
        assert!(sample.matches_rgb([90, 110, 100]));
        assert!(!sample.matches_rgb([89, 100, 100]));
        assert!(!sample.matches_rgb([100, 111, 100]));
    }

    #[test]
    fn test_tolerance_clamps_at_channel_limits() {
        let sample = ColorSample::new([250, 3, 128], 10);
        assert!(sample.matches_rgb([255, 0, 120]));
        assert!(!sample.matches_rgb([239, 0, 128]));
    }

    #[test]
    fn test_zero_tolerance_is_exact() {
        let sample = ColorSample::new([0, 0, 0], 0);
        assert!(sample.matches(&Rgba([0, 0, 0, 17])));
        assert!(!sample.matches(&Rgba([0, 0, 1, 255])));
    }

    #[test]
    fn test_green_dominance() {
        let rule = GreenDominance { floor: 100 };
        assert!(rule.accepts([102, 187, 106]));
        assert!(!rule.accepts([90, 100, 80])); // not above the floor
        assert!(!rule.accepts([200, 150, 10]));
        assert!(!rule.accepts([10, 150, 150])); // ties with blue
    }
}
