//! Fit-and-center transform.
//!
//! Places a natural (unscaled) content box inside the target dimensions with
//! a single uniform scale and centering offsets.

use std::fmt;

use crate::dimensions::TargetDimensions;

/// Natural size of laid-out content, before any fit scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContentBox {
    pub width: f32,
    pub height: f32,
}

impl ContentBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either edge is zero, negative or not a finite number.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Uniform scale followed by a translation, anchored at the top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl FitTransform {
    pub const IDENTITY: FitTransform = FitTransform {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Compute the transform that fits `content` into `target`.
    ///
    /// Degenerate content (an empty document) yields the identity transform.
    pub fn fit(content: ContentBox, target: TargetDimensions) -> Self {
        if content.is_degenerate() {
            return Self::IDENTITY;
        }

        let target_w = target.width as f32;
        let target_h = target.height as f32;

        let scale_x = target_w / content.width;
        let scale_y = target_h / content.height;
        let scale = scale_x.min(scale_y);

        let fit_w = content.width * scale;
        let fit_h = content.height * scale;

        Self {
            scale,
            offset_x: (target_w - fit_w) / 2.0,
            offset_y: (target_h - fit_h) / 2.0,
        }
    }

    /// Size the content occupies after scaling.
    pub fn fitted_size(&self, content: ContentBox) -> (f32, f32) {
        if content.is_degenerate() {
            return (0.0, 0.0);
        }
        (content.width * self.scale, content.height * self.scale)
    }

    /// Where the content's top-left corner goes in unscaled CSS pixels, so
    /// that painting at `scale` lands it on `(offset_x, offset_y)`.
    pub fn unscaled_origin(&self) -> (f32, f32) {
        if self.scale.is_finite() && self.scale > 0.0 {
            (self.offset_x / self.scale, self.offset_y / self.scale)
        } else {
            (self.offset_x, self.offset_y)
        }
    }
}

impl Default for FitTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for FitTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({}px, {}px) scale({})",
            self.offset_x, self.offset_y, self.scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.01;

    fn check_fit(content: ContentBox, target: TargetDimensions) {
        let t = FitTransform::fit(content, target);
        let (fit_w, fit_h) = t.fitted_size(content);
        let (w, h) = (target.width as f32, target.height as f32);

        let expected = (w / content.width).min(h / content.height);
        assert!((t.scale - expected).abs() < 1e-5);
        assert!(t.scale > 0.0);
        assert!(fit_w <= w + EPS, "{fit_w} > {w}");
        assert!(fit_h <= h + EPS, "{fit_h} > {h}");
        assert!((t.offset_x * 2.0 + fit_w - w).abs() <= 1.0);
        assert!((t.offset_y * 2.0 + fit_h - h).abs() <= 1.0);
    }

    #[test]
    fn test_fit_wide_content_into_portrait_page() {
        let content = ContentBox::new(1600.0, 400.0);
        let target = TargetDimensions::new(794, 1123);
        check_fit(content, target);

        let t = FitTransform::fit(content, target);
        assert_eq!(t.offset_x, 0.0);
        assert!(t.offset_y > 0.0);
    }

    #[test]
    fn test_fit_tall_content_centers_horizontally() {
        let content = ContentBox::new(300.0, 2000.0);
        let target = TargetDimensions::new(1080, 1080);
        check_fit(content, target);

        let t = FitTransform::fit(content, target);
        assert!(t.offset_x > 0.0);
        assert!(t.offset_y.abs() < EPS);
    }

    #[test]
    fn test_fit_upscales_small_content() {
        let content = ContentBox::new(100.0, 100.0);
        let t = FitTransform::fit(content, TargetDimensions::new(400, 200));
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.offset_x, 100.0);
        assert_eq!(t.offset_y, 0.0);
    }

    #[test]
    fn test_fit_grid() {
        let contents = [(1.0, 1.0), (794.0, 1123.0), (333.3, 77.7), (5000.0, 5001.0)];
        let targets = [(1, 1), (1080, 1920), (1123, 794), (816, 1056)];
        for (cw, ch) in contents {
            for (tw, th) in targets {
                check_fit(ContentBox::new(cw, ch), TargetDimensions::new(tw, th));
            }
        }
    }

    #[test]
    fn test_degenerate_content_is_identity() {
        let target = TargetDimensions::new(800, 600);
        for content in [
            ContentBox::new(0.0, 100.0),
            ContentBox::new(100.0, 0.0),
            ContentBox::new(0.0, 0.0),
            ContentBox::new(f32::NAN, 10.0),
            ContentBox::new(10.0, f32::INFINITY),
        ] {
            let t = FitTransform::fit(content, target);
            assert_eq!(t, FitTransform::IDENTITY);
            assert!(t.scale.is_finite() && t.offset_x.is_finite() && t.offset_y.is_finite());
        }
    }

    #[test]
    fn test_display_and_unscaled_origin() {
        let t = FitTransform {
            scale: 0.5,
            offset_x: 12.5,
            offset_y: 0.0,
        };
        assert_eq!(t.to_string(), "translate(12.5px, 0px) scale(0.5)");
        assert_eq!(t.unscaled_origin(), (25.0, 0.0));

        let up = FitTransform::fit(ContentBox::new(100.0, 50.0), TargetDimensions::new(200, 200));
        assert_eq!(up.unscaled_origin(), (0.0, 25.0));
        assert_eq!(FitTransform::IDENTITY.unscaled_origin(), (0.0, 0.0));
    }
}
