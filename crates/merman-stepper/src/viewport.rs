#![forbid(unsafe_code)]

//! Headless pan/zoom engine.
//!
//! The container shows the diagram's view box fitted and centred (`xMidYMid meet`); on top of
//! that sits a pan/zoom transform `{ x, y, scale }`. The identity transform is the "home" view.

use crate::easing::ease_out;
use crate::geom::{DiagramBox, ScreenSize, ViewBox, diagram_box};
use std::time::Duration;
use tracing::trace;

/// Computes how long a move from one rectangle to another should take.
pub type DurationFn<'a> = &'a dyn Fn(&DiagramBox, &DiagramBox) -> Duration;

/// What the navigator needs from a pan/zoom engine.
pub trait PanZoom {
    /// Frames `target` (diagram coordinates), animating from the current view.
    ///
    /// Degenerate rectangles are ignored.
    fn smooth_show_rectangle(&mut self, target: DiagramBox, duration: DurationFn<'_>);

    /// Animates back to the identity pan/zoom.
    fn smooth_reset(&mut self);

    /// Part of the diagram currently visible in the container.
    fn visible_box(&self) -> DiagramBox;
}

/// Pan/zoom state applied on top of the fitted diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A requested viewport animation, in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: DiagramBox,
    pub to: DiagramBox,
    pub duration: Duration,
}

impl Transition {
    /// Visible rectangle `elapsed` into the animation.
    pub fn sample(&self, elapsed: Duration) -> DiagramBox {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            ease_out(elapsed.as_secs_f64() / self.duration.as_secs_f64())
        };
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        diagram_box(
            lerp(self.from.min.x, self.to.min.x),
            lerp(self.from.min.y, self.to.min.y),
            lerp(self.from.max.x, self.to.max.x),
            lerp(self.from.max.y, self.to.max.y),
        )
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

const RESET_DURATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Viewport {
    container: ScreenSize,
    home: ViewBox,
    transform: ViewTransform,
    transition: Option<Transition>,
}

impl Viewport {
    /// A viewport over a diagram whose root view box is `home`.
    ///
    /// Without a view box the diagram is assumed to be drawn 1:1 into the container.
    pub fn new(container: ScreenSize, home: Option<ViewBox>) -> Self {
        let container = ScreenSize::new(container.width.max(1.0), container.height.max(1.0));
        let home = home.unwrap_or(ViewBox {
            min_x: 0.0,
            min_y: 0.0,
            width: container.width,
            height: container.height,
        });
        Self {
            container,
            home,
            transform: ViewTransform::IDENTITY,
            transition: None,
        }
    }

    pub fn container(&self) -> ScreenSize {
        self.container
    }

    pub fn home(&self) -> ViewBox {
        self.home
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    /// Diagram → container mapping at identity pan/zoom: `(scale, offset_x, offset_y)`.
    fn fit(&self) -> (f64, f64, f64) {
        let scale =
            (self.container.width / self.home.width).min(self.container.height / self.home.height);
        let off_x = (self.container.width - self.home.width * scale) / 2.0;
        let off_y = (self.container.height - self.home.height * scale) / 2.0;
        (scale, off_x, off_y)
    }

    fn to_client(&self, b: &DiagramBox) -> DiagramBox {
        let (s, ox, oy) = self.fit();
        diagram_box(
            (b.min.x - self.home.min_x) * s + ox,
            (b.min.y - self.home.min_y) * s + oy,
            (b.max.x - self.home.min_x) * s + ox,
            (b.max.y - self.home.min_y) * s + oy,
        )
    }

    fn from_client(&self, x: f64, y: f64) -> (f64, f64) {
        let (s, ox, oy) = self.fit();
        ((x - ox) / s + self.home.min_x, (y - oy) / s + self.home.min_y)
    }

    fn record(&mut self, from: DiagramBox, duration: Duration) {
        let to = self.visible_box();
        trace!(?from, ?to, ?duration, "viewport transition");
        self.transition = Some(Transition { from, to, duration });
    }
}

impl PanZoom for Viewport {
    fn smooth_show_rectangle(&mut self, target: DiagramBox, duration: DurationFn<'_>) {
        let client = self.to_client(&target);
        let width = client.max.x - client.min.x;
        let height = client.max.y - client.min.y;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return;
        }

        let from = self.visible_box();
        let cw = self.container.width;
        let ch = self.container.height;
        let scale = (cw / width).min(ch / height);
        self.transform = ViewTransform {
            x: -(client.min.x + width / 2.0) * scale + cw / 2.0,
            y: -(client.min.y + height / 2.0) * scale + ch / 2.0,
            scale,
        };
        self.record(from, duration(&from, &target));
    }

    fn smooth_reset(&mut self) {
        let from = self.visible_box();
        self.transform = ViewTransform::IDENTITY;
        self.record(from, RESET_DURATION);
    }

    fn visible_box(&self) -> DiagramBox {
        let t = self.transform;
        let (left, top) = self.from_client(-t.x / t.scale, -t.y / t.scale);
        let (right, bottom) = self.from_client(
            (self.container.width - t.x) / t.scale,
            (self.container.height - t.y) / t.scale,
        );
        diagram_box(left, top, right, bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &DiagramBox, b: &DiagramBox) -> bool {
        [
            (a.min.x, b.min.x),
            (a.min.y, b.min.y),
            (a.max.x, b.max.x),
            (a.max.y, b.max.y),
        ]
        .iter()
        .all(|(x, y)| (x - y).abs() < 1e-6)
    }

    fn fixed(_: &DiagramBox, _: &DiagramBox) -> Duration {
        Duration::from_millis(400)
    }

    #[test]
    fn home_view_shows_the_whole_view_box() {
        let vb = ViewBox {
            min_x: -50.0,
            min_y: 0.0,
            width: 1000.0,
            height: 500.0,
        };
        let vp = Viewport::new(ScreenSize::new(1000.0, 500.0), Some(vb));
        assert!(vp.transform().is_identity());
        assert!(close(&vp.visible_box(), &vb.as_box()));
    }

    #[test]
    fn showing_a_rectangle_frames_it_in_the_container() {
        let vb = ViewBox {
            min_x: 0.0,
            min_y: 0.0,
            width: 2000.0,
            height: 1000.0,
        };
        let mut vp = Viewport::new(ScreenSize::new(1000.0, 500.0), Some(vb));
        let target = diagram_box(200.0, 200.0, 600.0, 400.0);
        vp.smooth_show_rectangle(target, &fixed);

        assert!(close(&vp.visible_box(), &target));
        assert!((vp.transform().scale - 5.0).abs() < 1e-9);

        let transition = vp.last_transition().unwrap();
        assert!(close(&transition.from, &vb.as_box()));
        assert!(close(&transition.to, &target));
        assert_eq!(transition.duration, Duration::from_millis(400));
    }

    #[test]
    fn aspect_mismatch_keeps_the_target_fully_visible() {
        let mut vp = Viewport::new(ScreenSize::new(800.0, 800.0), None);
        let target = diagram_box(0.0, 0.0, 400.0, 100.0);
        vp.smooth_show_rectangle(target, &fixed);
        let visible = vp.visible_box();
        assert!(visible.min.x <= target.min.x && visible.max.x >= target.max.x);
        assert!(visible.min.y <= target.min.y && visible.max.y >= target.max.y);
        assert!((visible.width() - 400.0).abs() < 1e-9);
        assert!((visible.center().y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_rectangles_are_ignored() {
        let mut vp = Viewport::new(ScreenSize::new(800.0, 600.0), None);
        vp.smooth_show_rectangle(diagram_box(10.0, 10.0, 10.0, 50.0), &fixed);
        assert!(vp.transform().is_identity());
        assert!(vp.last_transition().is_none());
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut vp = Viewport::new(ScreenSize::new(800.0, 600.0), None);
        vp.smooth_show_rectangle(diagram_box(10.0, 10.0, 50.0, 50.0), &fixed);
        assert!(!vp.transform().is_identity());
        vp.smooth_reset();
        assert!(vp.transform().is_identity());
        assert!(close(&vp.last_transition().unwrap().to, &diagram_box(0.0, 0.0, 800.0, 600.0)));
    }

    #[test]
    fn transition_samples_between_endpoints() {
        let t = Transition {
            from: diagram_box(0.0, 0.0, 100.0, 100.0),
            to: diagram_box(100.0, 100.0, 200.0, 200.0),
            duration: Duration::from_millis(1000),
        };
        assert!(close(&t.sample(Duration::ZERO), &t.from));
        assert!(close(&t.sample(Duration::from_secs(2)), &t.to));
        let mid = t.sample(Duration::from_millis(500));
        assert!(mid.min.x > 50.0 && mid.min.x < 100.0);
        assert!(!t.is_finished(Duration::from_millis(999)));
        assert!(t.is_finished(Duration::from_millis(1000)));
    }
}
