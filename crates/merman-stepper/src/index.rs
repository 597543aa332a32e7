use crate::geom::DiagramBox;
use crate::svg::{StepMarker, scan_step_markers};
use std::collections::BTreeMap;
use tracing::debug;

/// Snapshot of step rectangles for one rendered diagram.
///
/// Built eagerly right after a render: the rectangles are read once in diagram coordinates, so
/// later viewport moves never see them distorted by an in-flight pan/zoom transform. The index
/// is tied to the render `generation` that produced it and is replaced, never patched, when the
/// diagram changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceIndex {
    generation: u64,
    steps: BTreeMap<u32, DiagramBox>,
    markers: usize,
}

impl SequenceIndex {
    pub fn from_markers(generation: u64, markers: impl IntoIterator<Item = StepMarker>) -> Self {
        let mut steps = BTreeMap::new();
        let mut count = 0;
        for marker in markers {
            count += 1;
            // Keep the first marker carrying a given number.
            steps.entry(marker.step).or_insert(marker.rect);
        }
        Self {
            generation,
            steps,
            markers: count,
        }
    }

    pub fn build(generation: u64, svg: &str) -> Self {
        let index = Self::from_markers(generation, scan_step_markers(svg));
        debug!(generation, steps = index.len(), "sequence index built");
        index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, step: u32) -> Option<&DiagramBox> {
        self.steps.get(&step)
    }

    pub fn contains(&self, step: u32) -> bool {
        self.steps.contains_key(&step)
    }

    /// Number of numbered markers scanned, duplicate labels included.
    pub fn marker_count(&self) -> usize {
        self.markers
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DiagramBox)> + '_ {
        self.steps.iter().map(|(k, v)| (*k, v))
    }
}
