#![forbid(unsafe_code)]

//! Geometry shared by the index, the viewport and the navigator.
//!
//! Rectangles are kept as `left/top/right/bottom` boxes (the shape the pan/zoom engine works
//! with) in the coordinate space of the rendered SVG's `viewBox`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coordinates of the rendered diagram (SVG user units).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramSpace {}

/// Coordinates of the container the diagram is shown in (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenSpace {}

pub type DiagramBox = euclid::Box2D<f64, DiagramSpace>;
pub type DiagramTransform = euclid::Transform2D<f64, DiagramSpace, DiagramSpace>;
pub type ScreenSize = euclid::Size2D<f64, ScreenSpace>;

pub fn diagram_box(left: f64, top: f64, right: f64, bottom: f64) -> DiagramBox {
    euclid::Box2D::new(euclid::point2(left, top), euclid::point2(right, bottom))
}

/// Smallest box containing all four corners of `b` after applying `transform`.
pub fn transform_box(transform: &DiagramTransform, b: &DiagramBox) -> DiagramBox {
    let corners = [
        transform.transform_point(euclid::point2(b.min.x, b.min.y)),
        transform.transform_point(euclid::point2(b.max.x, b.min.y)),
        transform.transform_point(euclid::point2(b.min.x, b.max.y)),
        transform.transform_point(euclid::point2(b.max.x, b.max.y)),
    ];
    let mut out = diagram_box(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in corners {
        out.min.x = out.min.x.min(p.x);
        out.min.y = out.min.y.min(p.y);
        out.max.x = out.max.x.max(p.x);
        out.max.y = out.max.y.max(p.y);
    }
    out
}

/// Euclidean distance over the four edges of two boxes.
pub fn edge_distance(from: &DiagramBox, to: &DiagramBox) -> f64 {
    let top = from.min.y - to.min.y;
    let right = from.max.x - to.max.x;
    let bottom = from.max.y - to.max.y;
    let left = from.min.x - to.min.x;
    (top * top + right * right + bottom * bottom + left * left).sqrt()
}

/// Root `viewBox` of a rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn as_box(&self) -> DiagramBox {
        diagram_box(
            self.min_x,
            self.min_y,
            self.min_x + self.width,
            self.min_y + self.height,
        )
    }
}

/// Linear padding rule `padding = slope * dimension + intercept`, clamped to `[min, max]`.
///
/// Larger diagrams get less padding around a focused step so that more surrounding context
/// stays visible once zoomed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaddingRule {
    pub slope: f64,
    pub intercept: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for PaddingRule {
    fn default() -> Self {
        // 0 -> 600 (clamped from 700), 1000 -> 500, 2000 -> 300, 3000 -> 100
        Self {
            slope: -0.2,
            intercept: 700.0,
            min: 100.0,
            max: 600.0,
        }
    }
}

impl PaddingRule {
    pub fn apply(&self, dimension: f64) -> f64 {
        let dimension = if dimension.is_finite() {
            dimension.max(0.0)
        } else {
            0.0
        };
        let raw = self.slope * dimension + self.intercept;
        raw.max(self.min).min(self.max)
    }

    /// Padding around a focused step for a diagram whose view box is `width` x `height`.
    pub fn padding_for(&self, width: f64, height: f64) -> Padding {
        let padding = Padding {
            block: self.apply(height),
            inline: self.apply(width),
        };
        debug!(
            width,
            height,
            block = padding.block,
            inline = padding.inline,
            "padding calculated"
        );
        padding
    }
}

/// Padding added around a step rectangle before it is framed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    /// Vertical padding (top and bottom).
    pub block: f64,
    /// Horizontal padding (left and right).
    pub inline: f64,
}

impl Padding {
    pub fn expand(&self, rect: &DiagramBox) -> DiagramBox {
        diagram_box(
            rect.min.x - self.inline,
            rect.min.y - self.block,
            rect.max.x + self.inline,
            rect.max.y + self.block,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_follows_the_documented_samples() {
        let rule = PaddingRule::default();
        assert_eq!(rule.apply(500.0), 600.0);
        assert_eq!(rule.apply(1000.0), 500.0);
        assert_eq!(rule.apply(2000.0), 300.0);
        assert_eq!(rule.apply(3000.0), 100.0);
        assert_eq!(rule.apply(4500.0), 100.0);
    }

    #[test]
    fn padding_is_clamped_and_non_increasing() {
        let rule = PaddingRule::default();
        let mut prev = f64::INFINITY;
        let mut d = 0.0;
        while d <= 20_000.0 {
            let p = rule.apply(d);
            assert!((100.0..=600.0).contains(&p), "padding({d}) = {p}");
            assert!(p <= prev, "padding increased at {d}");
            prev = p;
            d += 37.5;
        }
        assert_eq!(rule.apply(0.0), 600.0);
        assert_eq!(rule.apply(1_000_000.0), 100.0);
    }

    #[test]
    fn padding_treats_unusable_dimensions_as_zero() {
        let rule = PaddingRule::default();
        assert_eq!(rule.apply(f64::NAN), 600.0);
        assert_eq!(rule.apply(-50.0), 600.0);
    }

    #[test]
    fn padding_expands_each_side() {
        let padding = PaddingRule::default().padding_for(1000.0, 2000.0);
        assert_eq!(padding.inline, 500.0);
        assert_eq!(padding.block, 300.0);

        let out = padding.expand(&diagram_box(10.0, 20.0, 30.0, 40.0));
        assert_eq!(out, diagram_box(-490.0, -280.0, 530.0, 340.0));
    }

    #[test]
    fn transform_box_applies_translation_and_scale() {
        let t = DiagramTransform::scale(2.0, 2.0).then_translate(euclid::vec2(5.0, -5.0));
        let out = transform_box(&t, &diagram_box(1.0, 1.0, 2.0, 3.0));
        assert_eq!(out, diagram_box(7.0, -3.0, 9.0, 1.0));
    }

    #[test]
    fn edge_distance_is_zero_for_identical_boxes() {
        let b = diagram_box(0.0, 0.0, 10.0, 10.0);
        assert_eq!(edge_distance(&b, &b), 0.0);
        let moved = diagram_box(5.0, 5.0, 15.0, 15.0);
        assert!((edge_distance(&b, &moved) - 10.0).abs() < 1e-9);
    }
}
