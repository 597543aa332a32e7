use crate::easing::sigmoid_duration;
use crate::geom::{Padding, PaddingRule, ViewBox};
use crate::index::SequenceIndex;
use crate::viewport::PanZoom;

/// Step-by-step navigation over one rendered diagram.
///
/// Step `0` is the home view: it never maps to a marker rectangle, moving back to it resets the
/// viewport instead.
#[derive(Debug, Clone)]
pub struct Navigator {
    index: SequenceIndex,
    padding: Padding,
    current: u32,
}

impl Navigator {
    /// Padding is derived once from the diagram's view box (zero-sized when unknown).
    pub fn new(index: SequenceIndex, view_box: Option<ViewBox>, rule: &PaddingRule) -> Self {
        let (width, height) = view_box.map_or((0.0, 0.0), |vb| (vb.width, vb.height));
        Self {
            index,
            padding: rule.padding_for(width, height),
            current: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.index.generation()
    }

    pub fn index(&self) -> &SequenceIndex {
        &self.index
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> usize {
        self.index.len()
    }

    /// Frames `step`. Returns the new current step, or `None` when `step` is not in the index.
    pub fn move_to(&mut self, step: u32, viewport: &mut dyn PanZoom) -> Option<u32> {
        let rect = *self.index.get(step)?;
        viewport.smooth_show_rectangle(self.padding.expand(&rect), &sigmoid_duration);
        self.current = step;
        Some(step)
    }

    /// Moves one step forward; a no-op past the last step.
    pub fn move_next(&mut self, viewport: &mut dyn PanZoom) -> Option<u32> {
        let target = self.current.saturating_add(1);
        self.move_to(target, viewport)
    }

    /// Moves one step back; reaching step `0` resets the viewport to the home view.
    pub fn move_prev(&mut self, viewport: &mut dyn PanZoom) -> Option<u32> {
        let target = self.current.saturating_sub(1);
        if target == 0 {
            viewport.smooth_reset();
            self.current = 0;
            return Some(0);
        }
        self.move_to(target, viewport)
    }
}
