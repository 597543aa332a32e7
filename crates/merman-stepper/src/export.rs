#![forbid(unsafe_code)]

use crate::config::ExportOptions;
use crate::error::ExportError;
use crate::render::Surface;
use merman::render::foreign_object_label_fallback_svg_text;
use merman::render::raster::{RasterOptions, svg_to_png};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EXPORT_FILE_NAME: &str = "diagram.png";

/// Rasterizes `surface` to PNG bytes.
///
/// The image is sized from the surface's view box (times `options.scale`). HTML labels inside
/// `<foreignObject>` are overlaid as plain SVG text first, since the rasterizer cannot draw them.
pub fn export_png(surface: &Surface, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let svg = foreign_object_label_fallback_svg_text(&surface.svg);
    let raster = RasterOptions {
        scale: options.scale,
        background: options.background.clone(),
        ..RasterOptions::default()
    };
    let png = svg_to_png(&svg, &raster)?;
    debug!(bytes = png.len(), scale = options.scale, "png exported");
    Ok(png)
}

/// Writes the PNG export into `dir` under the configured file name.
pub fn write_png(
    surface: &Surface,
    options: &ExportOptions,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let png = export_png(surface, options)?;
    let path = dir.join(&options.file_name);
    std::fs::write(&path, png).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}
