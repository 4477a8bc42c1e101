//! printform – command-line print-form paginator.
//!
//! Usage:
//!   printform <input.html> [output.html] [--config overrides.json]
//!             [--globals legacy.json] [--report report.json]
//!             [--viewport-width PX] [--debug]
//!
//! Without `output.html` the result goes next to the input, e.g.
//! `invoice.html` → `invoice.paged.html`.

use std::{env, fs, path::Path, path::PathBuf, process};

use serde_json::{Map, Value};

use printform::config::ConfigLayers;
use printform::error::PrintFormError;
use printform::measure::LayoutMeasurer;
use printform::pipeline::format_html_with;

/// Exit status when at least one form was left unformatted.
const EXIT_FORM_FAILURES: i32 = 2;

#[derive(Debug, Default)]
struct CliArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    overrides: Option<PathBuf>,
    globals: Option<PathBuf>,
    report: Option<PathBuf>,
    viewport_width: Option<f32>,
    debug: bool,
}

enum Command {
    Run(CliArgs),
    Help,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Command, String> {
        let mut parsed = CliArgs::default();
        let mut paths: Vec<PathBuf> = Vec::new();

        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| format!("{arg} expects a value"));
            match arg.as_str() {
                "--config" | "-c" => parsed.overrides = Some(value()?.into()),
                "--globals" | "-g" => parsed.globals = Some(value()?.into()),
                "--report" | "-r" => parsed.report = Some(value()?.into()),
                "--viewport-width" => {
                    let raw = value()?;
                    match raw.parse::<f32>() {
                        Ok(w) if w.is_finite() && w > 0.0 => parsed.viewport_width = Some(w),
                        _ => return Err(format!("invalid viewport width '{raw}'")),
                    }
                }
                "--debug" | "-d" => parsed.debug = true,
                "--help" | "-h" => return Ok(Command::Help),
                flag if flag.starts_with('-') => return Err(format!("unknown flag '{flag}'")),
                _ => paths.push(PathBuf::from(&arg)),
            }
        }

        let mut paths = paths.into_iter();
        parsed.input = paths.next().ok_or("no input file given")?;
        parsed.output = paths.next();
        if let Some(extra) = paths.next() {
            return Err(format!("unexpected argument '{}'", extra.display()));
        }
        Ok(Command::Run(parsed))
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("paged.html"))
    }

    fn config_layers(&self) -> Result<ConfigLayers, PrintFormError> {
        let mut layers = ConfigLayers::new();
        if let Some(path) = &self.overrides {
            layers.overrides = read_json_object(path)?;
        }
        if let Some(path) = &self.globals {
            layers.legacy = read_json_object(path)?;
        }
        if self.debug {
            layers.set_override("debug", true);
        }
        Ok(layers)
    }
}

fn main() {
    env_logger::init();

    let prog = env::args().next().unwrap_or_else(|| "printform".to_string());
    let cli = match CliArgs::parse(env::args().skip(1)) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            print_usage(&prog);
            return;
        }
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_usage(&prog);
            process::exit(1);
        }
    };

    match run(&cli) {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{failed} form(s) could not be formatted and were left unchanged");
            process::exit(EXIT_FORM_FAILURES);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Formats the input file and returns the number of forms that failed.
fn run(cli: &CliArgs) -> Result<usize, PrintFormError> {
    let layers = cli.config_layers()?;
    let html = fs::read_to_string(&cli.input)?;

    let mut measurer = LayoutMeasurer::default();
    if let Some(width) = cli.viewport_width {
        measurer = measurer.with_viewport_width(width);
    }
    let (formatted, report) = format_html_with(&html, &layers, &measurer);

    let output = cli.output_path();
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(&output, formatted)?;
    if let Some(path) = &cli.report {
        fs::write(path, report.to_json()?)?;
    }

    let (forms, pages) = (report.forms.len(), report.total_pages());
    eprintln!(
        "Wrote '{}' ({forms} form{}, {pages} page{})",
        output.display(),
        plural(forms),
        plural(pages)
    );
    Ok(report.failures().count())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>, PrintFormError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_usage(prog: &str) {
    eprintln!(
        "printform – paginate HTML print forms into fixed-size pages

Usage: {prog} <input.html> [output.html] [flags]

  <input.html>          Document holding one or more .printform elements
  [output.html]         Output path (default: input stem with .paged.html)

  --config, -c FILE     JSON object of camelCase option overrides
  --globals, -g FILE    JSON object of snake_case legacy globals
  --report, -r FILE     Write the pagination report as JSON
  --viewport-width PX   Width used when no ancestor sets one (default 750)
  --debug, -d           Log page and row decisions (set RUST_LOG=debug)
  --help, -h            Print this message"
    );
}
