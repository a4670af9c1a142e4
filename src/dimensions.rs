//! Target-dimension resolution.
//!
//! Maps an export request (standard page size + orientation, an aspect ratio
//! on a fixed base edge, or custom pixels) to concrete pixel dimensions.
//! Resolution never fails: malformed numeric input is replaced by a default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fallback edge used when custom pixel input does not parse.
pub const DEFAULT_CUSTOM_EDGE: u32 = 800;

/// Width used for every ratio-mode export.
pub const RATIO_BASE_WIDTH: u32 = 1080;

/// Concrete output size in CSS pixels. Both edges are always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDimensions {
    pub width: u32,
    pub height: u32,
}

impl TargetDimensions {
    /// Build dimensions, clamping each edge to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Orientation implied by the edge lengths (square counts as portrait).
    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// The same dimensions with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl fmt::Display for TargetDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Page orientation for standard sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// A named standard page size, stored portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizeSpec {
    pub key: &'static str,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_name: &'static str,
    /// Paper format name a print pipeline would use for this size.
    pub print_format: &'static str,
}

/// The enumerated page sizes, at 96 DPI.
pub const PAGE_SIZES: &[PageSizeSpec] = &[
    PageSizeSpec {
        key: "a4",
        pixel_width: 794,
        pixel_height: 1123,
        display_name: "A4 (210 x 297 mm)",
        print_format: "a4",
    },
    PageSizeSpec {
        key: "letter",
        pixel_width: 816,
        pixel_height: 1056,
        display_name: "Letter (8.5 x 11 in)",
        print_format: "letter",
    },
    PageSizeSpec {
        key: "poster",
        pixel_width: 1587,
        pixel_height: 2245,
        display_name: "Poster (420 x 594 mm)",
        print_format: "a2",
    },
];

/// Page size selection in standard mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSize {
    /// One of [`PAGE_SIZES`], by key.
    Named(&'static PageSizeSpec),
    /// User-entered pixel edges, kept as raw text until resolution.
    Custom { width: String, height: String },
}

impl PageSize {
    /// Look up a named page size by key (case-insensitive).
    pub fn named(key: &str) -> Option<Self> {
        PAGE_SIZES
            .iter()
            .find(|spec| spec.key.eq_ignore_ascii_case(key))
            .map(PageSize::Named)
    }

    /// A4, the default page size.
    pub fn a4() -> Self {
        PageSize::Named(&PAGE_SIZES[0])
    }

    /// US Letter.
    pub fn letter() -> Self {
        PageSize::Named(&PAGE_SIZES[1])
    }

    /// Custom pixel size from raw user input.
    pub fn custom(width: impl Into<String>, height: impl Into<String>) -> Self {
        PageSize::Custom {
            width: width.into(),
            height: height.into(),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::a4()
    }
}

/// A named aspect ratio, expressed as width units over height units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatioSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub numerator: u32,
    pub denominator: u32,
}

impl AspectRatioSpec {
    fn ratio(&self) -> f64 {
        guarded_ratio(self.numerator as f64, self.denominator as f64)
    }
}

/// The enumerated digital aspect ratios.
pub const ASPECT_RATIOS: &[AspectRatioSpec] = &[
    AspectRatioSpec {
        key: "square",
        label: "Square (1:1)",
        numerator: 1,
        denominator: 1,
    },
    AspectRatioSpec {
        key: "portrait",
        label: "Portrait (4:5)",
        numerator: 4,
        denominator: 5,
    },
    AspectRatioSpec {
        key: "story",
        label: "Story (9:16)",
        numerator: 9,
        denominator: 16,
    },
    AspectRatioSpec {
        key: "landscape",
        label: "Landscape (16:9)",
        numerator: 16,
        denominator: 9,
    },
];

/// Aspect ratio selection in ratio mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectRatio {
    Named(&'static AspectRatioSpec),
    /// User-entered numerator/denominator, kept as raw text until resolution.
    Custom { numerator: String, denominator: String },
}

impl AspectRatio {
    /// Look up a named ratio by key (case-insensitive).
    pub fn named(key: &str) -> Option<Self> {
        ASPECT_RATIOS
            .iter()
            .find(|spec| spec.key.eq_ignore_ascii_case(key))
            .map(AspectRatio::Named)
    }

    pub fn square() -> Self {
        AspectRatio::Named(&ASPECT_RATIOS[0])
    }

    pub fn custom(numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        AspectRatio::Custom {
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }

    fn ratio(&self) -> f64 {
        match self {
            AspectRatio::Named(spec) => spec.ratio(),
            AspectRatio::Custom {
                numerator,
                denominator,
            } => guarded_ratio(
                parse_positive_f64(numerator).unwrap_or(1.0),
                parse_positive_f64(denominator).unwrap_or(1.0),
            ),
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::square()
    }
}

/// Which size-determining branch of a request is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionMode {
    Standard {
        page_size: PageSize,
        orientation: Orientation,
    },
    Ratio(AspectRatio),
}

impl Default for DimensionMode {
    fn default() -> Self {
        DimensionMode::Standard {
            page_size: PageSize::default(),
            orientation: Orientation::Portrait,
        }
    }
}

/// Resolve a dimension mode to pixels. Total: never fails, never returns 0.
pub fn resolve(mode: &DimensionMode) -> TargetDimensions {
    match mode {
        DimensionMode::Standard {
            page_size: PageSize::Named(spec),
            orientation,
        } => {
            let portrait = TargetDimensions::new(spec.pixel_width, spec.pixel_height);
            match orientation {
                Orientation::Portrait => portrait,
                Orientation::Landscape => portrait.swapped(),
            }
        }
        DimensionMode::Standard {
            page_size: PageSize::Custom { width, height },
            ..
        } => TargetDimensions::new(
            parse_positive_u32(width).unwrap_or(DEFAULT_CUSTOM_EDGE),
            parse_positive_u32(height).unwrap_or(DEFAULT_CUSTOM_EDGE),
        ),
        DimensionMode::Ratio(ratio) => {
            let height = (RATIO_BASE_WIDTH as f64 / ratio.ratio()).round();
            let height = if height.is_finite() && height >= 1.0 {
                height.min(u32::MAX as f64) as u32
            } else {
                1
            };
            TargetDimensions::new(RATIO_BASE_WIDTH, height)
        }
    }
}

/// Parse a leading integer the way a numeric form field would, rejecting
/// anything that is not strictly positive.
fn parse_positive_u32(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    let digits: &str = {
        let end = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };
    digits.parse::<u32>().ok().filter(|v| *v > 0)
}

fn parse_positive_f64(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// `num / den`, or 1 whenever that would not be a finite positive number.
fn guarded_ratio(num: f64, den: f64) -> f64 {
    let ratio = num / den;
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(key: &str, orientation: Orientation) -> DimensionMode {
        DimensionMode::Standard {
            page_size: PageSize::named(key).unwrap(),
            orientation,
        }
    }

    #[test]
    fn test_a4_landscape_swaps_edges() {
        let dims = resolve(&standard("a4", Orientation::Landscape));
        assert_eq!(dims, TargetDimensions::new(1123, 794));
    }

    #[test]
    fn test_orientation_swap_for_every_page_size() {
        for spec in PAGE_SIZES {
            let portrait = resolve(&standard(spec.key, Orientation::Portrait));
            let landscape = resolve(&standard(spec.key, Orientation::Landscape));
            assert_eq!(portrait.width, landscape.height, "{}", spec.key);
            assert_eq!(portrait.height, landscape.width, "{}", spec.key);
        }
    }

    #[test]
    fn test_square_ratio() {
        let dims = resolve(&DimensionMode::Ratio(AspectRatio::square()));
        assert_eq!(dims, TargetDimensions::new(1080, 1080));
    }

    #[test]
    fn test_named_ratios_round_height() {
        let story = resolve(&DimensionMode::Ratio(AspectRatio::named("story").unwrap()));
        assert_eq!(story, TargetDimensions::new(1080, 1920));

        let landscape = resolve(&DimensionMode::Ratio(
            AspectRatio::named("landscape").unwrap(),
        ));
        assert_eq!(landscape, TargetDimensions::new(1080, 608));

        let portrait = resolve(&DimensionMode::Ratio(AspectRatio::named("portrait").unwrap()));
        assert_eq!(portrait, TargetDimensions::new(1080, 1350));
    }

    #[test]
    fn test_custom_pixels_default_on_bad_input() {
        let mode = DimensionMode::Standard {
            page_size: PageSize::custom("abc", "-5"),
            orientation: Orientation::Landscape,
        };
        assert_eq!(resolve(&mode), TargetDimensions::new(800, 800));

        let mode = DimensionMode::Standard {
            page_size: PageSize::custom("", "0"),
            orientation: Orientation::Portrait,
        };
        assert_eq!(resolve(&mode), TargetDimensions::new(800, 800));
    }

    #[test]
    fn test_custom_pixels_ignore_orientation() {
        let mode = DimensionMode::Standard {
            page_size: PageSize::custom("1200", "600px"),
            orientation: Orientation::Portrait,
        };
        assert_eq!(resolve(&mode), TargetDimensions::new(1200, 600));
    }

    #[test]
    fn test_custom_ratio_guards_zero_and_garbage() {
        for (n, d) in [("0", "0"), ("3", "0"), ("x", "y"), ("", ""), ("-2", "3")] {
            let dims = resolve(&DimensionMode::Ratio(AspectRatio::custom(n, d)));
            assert!(dims.width > 0 && dims.height > 0, "{n}:{d}");
        }
        let dims = resolve(&DimensionMode::Ratio(AspectRatio::custom("3", "0")));
        assert_eq!(dims, TargetDimensions::new(1080, 1080));
    }

    #[test]
    fn test_custom_ratio() {
        let dims = resolve(&DimensionMode::Ratio(AspectRatio::custom("2", "1")));
        assert_eq!(dims, TargetDimensions::new(1080, 540));
    }

    #[test]
    fn test_extreme_ratio_stays_positive() {
        let dims = resolve(&DimensionMode::Ratio(AspectRatio::custom("100000", "1")));
        assert_eq!(dims.height, 1);
    }

    #[test]
    fn test_unknown_keys() {
        assert!(PageSize::named("tabloid").is_none());
        assert!(AspectRatio::named("cinema").is_none());
        assert_eq!(PageSize::named("A4"), Some(PageSize::a4()));
    }
}
