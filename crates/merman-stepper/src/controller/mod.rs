#![forbid(unsafe_code)]

//! The stepper widget: attributes in, rendered surface + step navigation + events out.

use crate::config::StepperConfig;
use crate::error::{Error, Result};
use crate::export;
use crate::index::SequenceIndex;
use crate::navigator::Navigator;
use crate::render::{DiagramRenderer, MermanRenderer, RenderPipeline, Rendered, Surface};
use crate::svg::with_view_box;
use crate::url_storage::UrlStorage;
use crate::viewport::{PanZoom, Viewport};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, trace};

/// Query parameter the current step is mirrored into.
pub const SEQUENCE_NUMBER_PARAM: &str = "sequence-number";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Text,
    SequenceNumber,
    DialogOpen,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [
        Attribute::Text,
        Attribute::SequenceNumber,
        Attribute::DialogOpen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Text => "text",
            Attribute::SequenceNumber => "sequence-number",
            Attribute::DialogOpen => "dialog-open",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribute `{0}`")]
pub struct UnknownAttribute(pub String);

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

/// Attribute values as last set on the widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub text: Option<String>,
    pub sequence_number: Option<String>,
    pub dialog_open: Option<String>,
}

impl Attributes {
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        match attribute {
            Attribute::Text => self.text.as_deref(),
            Attribute::SequenceNumber => self.sequence_number.as_deref(),
            Attribute::DialogOpen => self.dialog_open.as_deref(),
        }
    }
}

/// State of the step controls shown next to the diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    /// The panel is only shown for sequence diagrams.
    pub panel_visible: bool,
    pub stepper_value: u32,
    pub stepper_max: usize,
    pub label: String,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            panel_visible: false,
            stepper_value: 0,
            stepper_max: 0,
            label: "0".to_string(),
        }
    }
}

/// The modal text editor used to change the diagram source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDialog {
    pub open: bool,
    pub input: String,
    pub focused: bool,
}

/// User interaction with the step controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlInput {
    Next,
    Prev,
    /// Raw value typed into the numeric stepper.
    Stepper(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepperEvent {
    TextChanged { text: String },
    SequenceChanged { step: u32 },
    Alert { message: String },
}

/// Resolves once a render has been committed.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<Option<u64>>,
}

impl ReadySignal {
    /// Generation of the latest committed render, if any.
    pub fn generation(&self) -> Option<u64> {
        *self.rx.borrow()
    }

    /// Waits for the first committed render and returns its generation.
    ///
    /// Returns `None` if the stepper is dropped before anything was rendered.
    pub async fn wait(mut self) -> Option<u64> {
        self.rx.wait_for(Option::is_some).await.ok().and_then(|g| *g)
    }
}

pub struct Stepper<R = MermanRenderer> {
    config: StepperConfig,
    pipeline: RenderPipeline<R>,
    attributes: Attributes,
    controls: Controls,
    dialog: InputDialog,
    surface: Option<Surface>,
    viewport: Option<Viewport>,
    navigator: Option<Navigator>,
    generation: u64,
    pending_step: Option<u32>,
    url: Option<UrlStorage>,
    events: broadcast::Sender<StepperEvent>,
    ready: watch::Sender<Option<u64>>,
}

impl Stepper<MermanRenderer> {
    pub fn with_config(config: StepperConfig) -> Self {
        Self::new(MermanRenderer::new(), config)
    }

    /// Start-up attributes carried by a page URL.
    pub fn attributes_from_url(url: &UrlStorage) -> Attributes {
        Attributes {
            text: url.text(),
            sequence_number: url.get(SEQUENCE_NUMBER_PARAM),
            dialog_open: None,
        }
    }
}

impl<R: DiagramRenderer> Stepper<R> {
    pub fn new(renderer: R, config: StepperConfig) -> Self {
        let pipeline = RenderPipeline::new(renderer, &config);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (ready, _) = watch::channel(None);
        Self {
            config,
            pipeline,
            attributes: Attributes::default(),
            controls: Controls::default(),
            dialog: InputDialog::default(),
            surface: None,
            viewport: None,
            navigator: None,
            generation: 0,
            pending_step: None,
            url: None,
            events,
            ready,
        }
    }

    /// Mirrors text and step changes into `url` from now on.
    pub fn with_url_storage(mut self, url: UrlStorage) -> Self {
        self.url = Some(url);
        self
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn dialog(&self) -> &InputDialog {
        &self.dialog
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.navigator.as_ref()
    }

    pub fn url(&self) -> Option<&UrlStorage> {
        self.url.as_ref()
    }

    /// Generation of the committed render; `0` before the first one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_step(&self) -> u32 {
        self.navigator.as_ref().map_or(0, Navigator::current)
    }

    pub fn total_steps(&self) -> usize {
        self.navigator.as_ref().map_or(0, Navigator::total)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StepperEvent> {
        self.events.subscribe()
    }

    pub fn when_ready(&self) -> ReadySignal {
        ReadySignal {
            rx: self.ready.subscribe(),
        }
    }

    /// Applies initial attributes in the order text, sequence number, dialog state.
    pub async fn mount(&mut self, initial: Attributes) {
        for attribute in Attribute::ALL {
            if let Some(value) = initial.get(attribute) {
                self.apply(attribute, value).await;
            }
        }
    }

    /// Sets an attribute by name. Unknown names are ignored.
    pub async fn set_attribute(&mut self, name: &str, value: &str) {
        match name.parse::<Attribute>() {
            Ok(attribute) => self.apply(attribute, value).await,
            Err(err) => trace!(%err, "attribute ignored"),
        }
    }

    async fn apply(&mut self, attribute: Attribute, value: &str) {
        match attribute {
            Attribute::Text => self.render_text(value).await,
            Attribute::SequenceNumber => {
                self.attributes.sequence_number = Some(value.to_string());
                self.request_step(value);
            }
            Attribute::DialogOpen => {
                self.attributes.dialog_open = Some(value.to_string());
                if value == "true" {
                    self.open_input_dialog();
                } else {
                    self.close_input_dialog().await;
                }
            }
        }
    }

    /// Sets the `text` attribute and renders it, returning the committed generation.
    ///
    /// Empty text is ignored (`Ok(None)`). On failure the previous diagram stays in place.
    pub async fn load_text(&mut self, text: &str) -> Result<Option<u64>> {
        self.attributes.text = Some(text.to_string());
        if text.is_empty() {
            return Ok(None);
        }
        let rendered = self.pipeline.render(text).await?;
        self.commit(text, rendered);
        Ok(Some(self.generation))
    }

    async fn render_text(&mut self, text: &str) {
        if let Err(err) = self.load_text(text).await {
            error!(error = %err, "failed to render diagram");
            self.emit(StepperEvent::Alert {
                message: format!("Fail to render: {err}"),
            });
        }
    }

    fn commit(&mut self, text: &str, rendered: Rendered) {
        self.generation += 1;
        let generation = self.generation;
        let Rendered { surface, viewport } = rendered;
        let index = SequenceIndex::build(generation, &surface.svg);
        let navigator = Navigator::new(index, surface.view_box, &self.config.padding);
        debug!(
            generation,
            steps = navigator.total(),
            "render committed"
        );

        self.controls.panel_visible = text.contains("sequenceDiagram");
        self.controls.stepper_max = navigator.index().marker_count();
        self.surface = Some(surface);
        self.viewport = Some(viewport);
        self.navigator = Some(navigator);

        self.update_sequence_number(0);
        self.dialog.input = text.to_string();
        if let Some(url) = self.url.as_mut() {
            if let Err(err) = url.set_text(text) {
                error!(error = %err, "failed to store diagram text in url");
            }
        }
        self.emit(StepperEvent::TextChanged {
            text: text.to_string(),
        });
        self.ready.send_replace(Some(generation));

        if let Some(step) = self.pending_step.take() {
            self.move_to(step);
        }
    }

    fn request_step(&mut self, value: &str) {
        let Ok(step) = value.trim().parse::<u32>() else {
            trace!(value, "sequence number ignored");
            return;
        };
        if self.navigator.is_some() {
            self.move_to(step);
        } else {
            debug!(step, "sequence jump deferred until the first render");
            self.pending_step = Some(step);
        }
    }

    fn update_sequence_number(&mut self, step: u32) {
        self.controls.stepper_value = step;
        self.controls.label = step.to_string();
        if let Some(url) = self.url.as_mut() {
            url.set(SEQUENCE_NUMBER_PARAM, &step.to_string());
        }
        self.emit(StepperEvent::SequenceChanged { step });
    }

    fn emit(&self, event: StepperEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn navigate(
        &mut self,
        f: impl FnOnce(&mut Navigator, &mut dyn PanZoom) -> Option<u32>,
    ) -> Option<u32> {
        let (Some(navigator), Some(viewport)) = (self.navigator.as_mut(), self.viewport.as_mut())
        else {
            return None;
        };
        let step = f(navigator, viewport)?;
        self.update_sequence_number(step);
        Some(step)
    }

    pub fn move_to(&mut self, step: u32) -> Option<u32> {
        self.navigate(|nav, vp| nav.move_to(step, vp))
    }

    pub fn move_next(&mut self) -> Option<u32> {
        self.navigate(|nav, vp| nav.move_next(vp))
    }

    pub fn move_prev(&mut self) -> Option<u32> {
        self.navigate(|nav, vp| nav.move_prev(vp))
    }

    /// Like [`Stepper::move_to`], but only against the render `generation` the caller observed.
    pub fn move_to_in(&mut self, generation: u64, step: u32) -> Result<Option<u32>> {
        if generation != self.generation {
            return Err(Error::StaleGeneration {
                generation,
                current: self.generation,
            });
        }
        Ok(self.move_to(step))
    }

    pub fn dispatch(&mut self, input: ControlInput) -> Option<u32> {
        match input {
            ControlInput::Next => self.move_next(),
            ControlInput::Prev => self.move_prev(),
            ControlInput::Stepper(value) => {
                let step = value.trim().parse::<u32>().ok()?;
                self.move_to(step)
            }
        }
    }

    pub fn open_input_dialog(&mut self) {
        self.dialog.open = true;
        self.dialog.focused = true;
    }

    /// Closes the dialog and renders whatever was typed into it.
    ///
    /// Closing a dialog that is not open commits nothing.
    pub async fn close_input_dialog(&mut self) {
        if !self.dialog.open {
            trace!("input dialog already closed");
            return;
        }
        self.dialog.open = false;
        self.dialog.focused = false;
        let text = self.dialog.input.clone();
        self.render_text(&text).await;
    }

    pub fn edit_input(&mut self, text: impl Into<String>) {
        self.dialog.input = text.into();
    }

    /// The surface with its view box narrowed to what the viewport currently shows.
    pub fn framed_svg(&self) -> Option<String> {
        let surface = self.surface.as_ref()?;
        let viewport = self.viewport.as_ref()?;
        Some(with_view_box(&surface.svg, &viewport.visible_box()))
    }

    /// PNG of the whole surface; `None` before the first render.
    pub fn export_png(&self) -> Result<Option<Vec<u8>>> {
        let Some(surface) = self.surface.as_ref() else {
            return Ok(None);
        };
        Ok(Some(export::export_png(surface, &self.config.export)?))
    }

    pub fn export_png_to(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(surface) = self.surface.as_ref() else {
            return Ok(None);
        };
        Ok(Some(export::write_png(surface, &self.config.export, dir)?))
    }
}
