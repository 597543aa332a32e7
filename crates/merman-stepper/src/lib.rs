#![forbid(unsafe_code)]

//! `merman-stepper` is a headless step-through viewer for Mermaid sequence diagrams.
//!
//! A [`Stepper`] renders diagram text through `merman`, indexes the numbered messages of the
//! resulting SVG and frames them one at a time in a pan/zoom [`Viewport`]. Text and the current
//! step can be mirrored into a page URL ([`UrlStorage`]) and the diagram exported as PNG.
//!
//! ```no_run
//! # async fn demo() {
//! use merman_stepper::{Stepper, StepperConfig};
//!
//! let mut stepper = Stepper::with_config(StepperConfig::default());
//! stepper
//!     .set_attribute("text", "sequenceDiagram\n  Alice->>Bob: hi\n  Bob-->>Alice: hey")
//!     .await;
//! assert_eq!(stepper.total_steps(), 2);
//! stepper.move_next();
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod export;
pub mod geom;
pub mod index;
pub mod navigator;
pub mod render;
pub mod svg;
pub mod url_storage;
pub mod viewport;

pub use config::{ContainerSize, ExportOptions, StepperConfig, load_config};
pub use controller::{
    Attribute, Attributes, ControlInput, Controls, InputDialog, ReadySignal,
    SEQUENCE_NUMBER_PARAM, Stepper, StepperEvent, UnknownAttribute,
};
pub use error::{ConfigError, Error, ExportError, RenderError, Result, UrlError};
pub use export::EXPORT_FILE_NAME;
pub use geom::{DiagramBox, Padding, PaddingRule, ViewBox};
pub use index::SequenceIndex;
pub use navigator::Navigator;
pub use render::{DiagramRenderer, MermanRenderer, RenderPipeline, Surface};
pub use url_storage::UrlStorage;
pub use viewport::{PanZoom, Transition, ViewTransform, Viewport};
