use merman_stepper::export::export_png;
use merman_stepper::svg::parse_view_box;
use merman_stepper::{
    ControlInput, RenderError, SEQUENCE_NUMBER_PARAM, Stepper, StepperConfig, StepperEvent,
    Surface, UrlStorage, load_config,
};
use serde::Serialize;
use std::io::{BufRead, Read, Write};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL_BASE: &str = "http://localhost/";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Stepper(merman_stepper::Error),
    StepNotFound(u32),
    NoDiagram,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Stepper(err) => write!(f, "{err}"),
            CliError::StepNotFound(step) => write!(f, "Step {step} not found in diagram"),
            CliError::NoDiagram => write!(f, "No Mermaid diagram detected"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<merman_stepper::Error> for CliError {
    fn from(value: merman_stepper::Error) -> Self {
        match value {
            merman_stepper::Error::Render(RenderError::NoDiagram) => Self::NoDiagram,
            other => Self::Stepper(other),
        }
    }
}

impl From<merman_stepper::ConfigError> for CliError {
    fn from(value: merman_stepper::ConfigError) -> Self {
        Self::Stepper(value.into())
    }
}

impl From<merman_stepper::UrlError> for CliError {
    fn from(value: merman_stepper::UrlError) -> Self {
        Self::Stepper(value.into())
    }
}

impl From<merman_stepper::ExportError> for CliError {
    fn from(value: merman_stepper::ExportError) -> Self {
        Self::Stepper(value.into())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Command {
    #[default]
    Render,
    Steps,
    Walk,
    UrlEncode,
    UrlDecode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    render_format: RenderFormat,
    step: Option<u32>,
    scale: Option<f32>,
    background: Option<String>,
    config: Option<String>,
    out: Option<String>,
    base: Option<String>,
}

fn usage() -> &'static str {
    "merman-stepper\n\
\n\
USAGE:\n\
  merman-stepper [render] [--format svg|png] [--step <n>] [--scale <n>] [--background <css-color>] [--config <path>] [--out <path>] [<path>|-]\n\
  merman-stepper steps [--pretty] [--config <path>] [<path>|-]\n\
  merman-stepper walk [--config <path>] <path>\n\
  merman-stepper url-encode [--base <url>] [--step <n>] [<path>|-]\n\
  merman-stepper url-decode [--pretty] <url>\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - render --step <n> narrows the SVG viewBox to the framed step.\n\
  - PNG output defaults to the configured file name (diagram.png); use --out - for stdout.\n\
  - walk reads commands from stdin (next, prev, <n>, quit) and prints events as JSON lines.\n\
  - Set RUST_LOG (e.g. RUST_LOG=merman_stepper=debug) for diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "steps" => args.command = Command::Steps,
            "walk" => args.command = Command::Walk,
            "url-encode" => args.command = Command::UrlEncode,
            "url-decode" => args.command = Command::UrlDecode,
            "--pretty" => args.pretty = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--step" => {
                let Some(step) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.step = Some(step.parse::<u32>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let scale = scale.parse::<f32>().map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.scale = Some(scale);
            }
            "--background" => {
                let Some(bg) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--base" => {
                let Some(base) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.base = Some(base.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    match args.command {
        Command::UrlDecode if args.input.is_none() => Err(CliError::Usage(usage())),
        Command::Walk if matches!(args.input.as_deref(), None | Some("-")) => {
            Err(CliError::Usage(usage()))
        }
        _ => Ok(args),
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn load_stepper_config(args: &Args) -> Result<StepperConfig, CliError> {
    let mut config = load_config(args.config.as_deref().map(Path::new))?;
    if let Some(scale) = args.scale {
        config.export.scale = scale;
    }
    if let Some(bg) = &args.background {
        config.export.background = Some(bg.clone());
    }
    Ok(config)
}

async fn open_stepper(args: &Args, text: &str) -> Result<Stepper, CliError> {
    let mut stepper = Stepper::with_config(load_stepper_config(args)?);
    if stepper.load_text(text).await?.is_none() {
        return Err(CliError::NoDiagram);
    }
    Ok(stepper)
}

#[derive(Serialize)]
struct StepOut {
    step: u32,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Serialize)]
struct StepsOut {
    total: usize,
    steps: Vec<StepOut>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlOut {
    text: Option<String>,
    sequence_number: Option<String>,
}

fn print_events(rx: &mut broadcast::Receiver<StepperEvent>) -> Result<(), CliError> {
    while let Ok(event) = rx.try_recv() {
        write_json(&event, false)?;
    }
    Ok(())
}

async fn render(args: &Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut stepper = open_stepper(args, &text).await?;

    let svg = match args.step {
        Some(step) => {
            if stepper.move_to(step).is_none() {
                return Err(CliError::StepNotFound(step));
            }
            stepper.framed_svg()
        }
        None => stepper.surface().map(|s| s.svg.clone()),
    }
    .ok_or(CliError::NoDiagram)?;

    match args.render_format {
        RenderFormat::Svg => match args.out.as_deref() {
            None | Some("-") => print!("{svg}"),
            Some(path) => std::fs::write(path, svg)?,
        },
        RenderFormat::Png => {
            let surface = Surface {
                view_box: parse_view_box(&svg),
                svg,
            };
            let bytes = export_png(&surface, &stepper.config().export)?;
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| stepper.config().export.file_name.clone());
            if out == "-" {
                std::io::stdout().lock().write_all(&bytes)?;
            } else {
                std::fs::write(out, bytes)?;
            }
        }
    }
    Ok(())
}

async fn steps(args: &Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let stepper = open_stepper(args, &text).await?;
    let steps = stepper
        .navigator()
        .map(|nav| {
            nav.index()
                .iter()
                .map(|(step, rect)| StepOut {
                    step,
                    x: rect.min.x,
                    y: rect.min.y,
                    width: rect.width(),
                    height: rect.height(),
                })
                .collect()
        })
        .unwrap_or_default();
    write_json(
        &StepsOut {
            total: stepper.total_steps(),
            steps,
        },
        args.pretty,
    )
}

async fn walk(args: &Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut stepper = Stepper::with_config(load_stepper_config(args)?);
    let mut events = stepper.subscribe();
    if stepper.load_text(&text).await?.is_none() {
        return Err(CliError::NoDiagram);
    }
    print_events(&mut events)?;

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let command = line.trim();
        match command {
            "" => continue,
            "quit" | "q" => break,
            "next" | "n" => {
                stepper.dispatch(ControlInput::Next);
            }
            "prev" | "p" => {
                stepper.dispatch(ControlInput::Prev);
            }
            value if value.parse::<u32>().is_ok() => {
                stepper.dispatch(ControlInput::Stepper(value.to_string()));
            }
            other => tracing::warn!(command = other, "unknown walk command"),
        }
        print_events(&mut events)?;
    }
    Ok(())
}

fn url_encode(args: &Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut url = UrlStorage::parse(args.base.as_deref().unwrap_or(DEFAULT_URL_BASE))?;
    url.set_text(&text)?;
    if let Some(step) = args.step {
        url.set(SEQUENCE_NUMBER_PARAM, &step.to_string());
    }
    println!("{}", url.as_str());
    Ok(())
}

fn url_decode(args: &Args) -> Result<(), CliError> {
    let Some(input) = args.input.as_deref() else {
        return Err(CliError::Usage(usage()));
    };
    let url = UrlStorage::parse(input)?;
    let attributes = Stepper::attributes_from_url(&url);
    write_json(
        &UrlOut {
            text: attributes.text,
            sequence_number: attributes.sequence_number,
        },
        args.pretty,
    )
}

async fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Render => render(&args).await,
        Command::Steps => steps(&args).await,
        Command::Walk => walk(&args).await,
        Command::UrlEncode => url_encode(&args),
        Command::UrlDecode => url_decode(&args),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args).await {
        Ok(()) => {}
        Err(CliError::NoDiagram) => {
            eprintln!("{}", CliError::NoDiagram);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("merman-stepper")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn render_is_the_default_command() {
        let args = parse_args(&argv(&["diagram.mmd"])).unwrap();
        assert_eq!(args.command, Command::Render);
        assert_eq!(args.render_format, RenderFormat::Svg);
        assert_eq!(args.input.as_deref(), Some("diagram.mmd"));
    }

    #[test]
    fn render_options_are_parsed() {
        let args = parse_args(&argv(&[
            "render", "--format", "PNG", "--step", "2", "--scale", "2", "--background", "#fff",
            "-",
        ]))
        .unwrap();
        assert_eq!(args.render_format, RenderFormat::Png);
        assert_eq!(args.step, Some(2));
        assert_eq!(args.scale, Some(2.0));
        assert_eq!(args.background.as_deref(), Some("#fff"));
        assert_eq!(args.input.as_deref(), Some("-"));
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        for bad in [
            &["--format", "gif"][..],
            &["--step", "-1"],
            &["--scale", "0"],
            &["--unknown"],
            &["a.mmd", "b.mmd"],
            &["url-decode"],
            &["walk"],
            &["walk", "-"],
        ] {
            assert!(
                matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn no_diagram_errors_map_to_their_own_variant() {
        let err: CliError = merman_stepper::Error::from(RenderError::NoDiagram).into();
        assert!(matches!(err, CliError::NoDiagram));
        let err: CliError = merman_stepper::Error::StaleGeneration {
            generation: 1,
            current: 2,
        }
        .into();
        assert!(matches!(err, CliError::Stepper(_)));
    }
}
