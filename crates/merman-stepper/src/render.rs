#![forbid(unsafe_code)]

use crate::config::StepperConfig;
use crate::error::RenderError;
use crate::geom::{ScreenSize, ViewBox};
use crate::svg::{parse_view_box, strip_max_width};
use crate::viewport::Viewport;
use merman::render::HeadlessRenderer;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

/// Turns diagram markup into SVG markup.
pub trait DiagramRenderer {
    /// Renders `text` into a standalone `<svg>` document whose root id is `svg_id`.
    fn render(&self, svg_id: &str, text: &str) -> Result<String, RenderError>;
}

/// [`DiagramRenderer`] backed by the headless `merman` pipeline.
#[derive(Clone, Default)]
pub struct MermanRenderer {
    inner: HeadlessRenderer,
}

impl MermanRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_headless(inner: HeadlessRenderer) -> Self {
        Self { inner }
    }
}

impl DiagramRenderer for MermanRenderer {
    fn render(&self, svg_id: &str, text: &str) -> Result<String, RenderError> {
        self.inner
            .render_svg_sync_with_diagram_id(text, svg_id)?
            .ok_or(RenderError::NoDiagram)
    }
}

/// Inserts an `autonumber` statement after the `sequenceDiagram` header when the diagram does
/// not already number its messages.
///
/// Other diagram types are returned untouched.
pub fn with_sequence_numbers(text: &str) -> Cow<'_, str> {
    let mut header = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("autonumber") {
            return Cow::Borrowed(text);
        }
        if header.is_none() && trimmed.starts_with("sequenceDiagram") {
            header = Some(offset + line.len());
        }
        offset += line.len();
    }

    let Some(end) = header else {
        return Cow::Borrowed(text);
    };
    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..end]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("autonumber\n");
    out.push_str(&text[end..]);
    Cow::Owned(out)
}

/// The rendered diagram currently mounted in the target element.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub svg: String,
    pub view_box: Option<ViewBox>,
}

/// Output of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub surface: Surface,
    pub viewport: Viewport,
}

#[derive(Debug, Clone)]
pub struct RenderPipeline<R> {
    renderer: R,
    svg_id: String,
    show_sequence_numbers: bool,
    settle: Duration,
    container: ScreenSize,
}

impl<R: DiagramRenderer> RenderPipeline<R> {
    pub fn new(renderer: R, config: &StepperConfig) -> Self {
        Self {
            renderer,
            svg_id: config.svg_id.clone(),
            show_sequence_numbers: config.show_sequence_numbers,
            settle: config.settle_delay(),
            container: config.container_size(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn svg_id(&self) -> &str {
        &self.svg_id
    }

    /// Renders `text`, then waits for the surface to settle.
    ///
    /// The returned viewport is fresh: it starts at the home view of the new surface.
    pub async fn render(&self, text: &str) -> Result<Rendered, RenderError> {
        let input = if self.show_sequence_numbers {
            with_sequence_numbers(text)
        } else {
            Cow::Borrowed(text)
        };

        let svg = self.renderer.render(&self.svg_id, &input)?;
        if !svg.contains("<svg") {
            return Err(RenderError::MissingSvgRoot);
        }
        let svg = strip_max_width(&svg);
        let view_box = parse_view_box(&svg);
        debug!(
            svg_id = %self.svg_id,
            bytes = svg.len(),
            ?view_box,
            "diagram rendered"
        );

        let viewport = Viewport::new(self.container, view_box);
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        Ok(Rendered {
            surface: Surface { svg, view_box },
            viewport,
        })
    }
}
