use merman::render::HeadlessError;
use merman::render::raster::RasterError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("render generation {generation} is stale (current: {current})")]
    StaleGeneration { generation: u64, current: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No diagram detected in the input text")]
    NoDiagram,

    #[error(transparent)]
    Headless(#[from] HeadlessError),

    #[error("Rendered output has no <svg> root element")]
    MissingSvgRoot,
}

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to inflate payload: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("failed to deflate payload: {0}")]
    Deflate(#[source] std::io::Error),

    #[error("decompressed payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },
}
