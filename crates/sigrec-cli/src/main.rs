// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::Serialize;
use serde::de::DeserializeOwned;
use sigrec_breaks::{BreakConfig, KSelection};
use sigrec_cli::{
    parse_series_document, parse_values_document, run_breaks, run_breaks_report, run_range,
    run_windows,
};
use sigrec_core::{AlignmentPolicy, AnalysisError};
use sigrec_range::RangeConfig;
use sigrec_window::TrainingWindowConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SIGREC_LOG";

struct Cli {
    command: Command,
}

enum Command {
    Windows(WindowsArgs),
    Breaks(BreaksArgs),
    Range(RangeArgs),
}

#[derive(Debug, Default)]
struct WindowsArgs {
    win: Option<usize>,
    k_start: Option<usize>,
    k_stop: Option<usize>,
    nan_thr: Option<f64>,
    strict_alignment: bool,
    config: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct BreaksArgs {
    selection: Option<KSelection>,
    seed: Option<u64>,
    report: bool,
    config: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RangeArgs {
    components: Option<usize>,
    std_scale: Option<f64>,
    weight_threshold: Option<f64>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
}

fn parse_selection(raw: &str) -> Result<KSelection, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "knee" => Ok(KSelection::Knee),
        "bic" => Ok(KSelection::Bic),
        _ => Err(CliError::invalid_input(format!(
            "invalid --selection '{raw}'; expected one of: knee, bic"
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Analysis(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // a subscriber may already be installed when embedded; keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some(cli) = parse_cli(&args)? else {
        return Ok(());
    };

    match cli.command {
        Command::Windows(args) => handle_windows(args),
        Command::Breaks(args) => handle_breaks(args),
        Command::Range(args) => handle_range(args),
    }
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].as_str();
    let rest = &args[1..];
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name)?;
        return Ok(None);
    }

    let command = match command_name {
        "windows" => Command::Windows(parse_windows_args(rest)?),
        "breaks" => Command::Breaks(parse_breaks_args(rest)?),
        "range" => Command::Range(parse_range_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: windows, breaks, range"
            )));
        }
    };
    Ok(Some(Cli { command }))
}

fn parse_windows_args(tokens: &[String]) -> Result<WindowsArgs, CliError> {
    let mut args = WindowsArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--win" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.win = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--k-start" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.k_start = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--k-stop" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.k_stop = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--nan-thr" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.nan_thr = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--strict-alignment" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.strict_alignment = true;
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown windows option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("windows requires --input <path>"));
    }
    Ok(args)
}

fn parse_breaks_args(tokens: &[String]) -> Result<BreaksArgs, CliError> {
    let mut args = BreaksArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--selection" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.selection = Some(parse_selection(raw.as_str())?);
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--report" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.report = true;
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown breaks option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("breaks requires --input <path>"));
    }
    Ok(args)
}

fn parse_range_args(tokens: &[String]) -> Result<RangeArgs, CliError> {
    let mut args = RangeArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--components" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.components = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--std-scale" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.std_scale = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--weight-threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.weight_threshold = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown range option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("range requires --input <path>"));
    }
    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<(), CliError> {
    if inline_value.is_some() {
        return Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        )));
    }
    Ok(())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_u64_arg(raw: &str, flag: &str) -> Result<u64, CliError> {
    raw.parse::<u64>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn print_version() {
    println!("sigrec {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "sigrec {}\n\nUSAGE:\n  sigrec <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  windows   Recommend high-information training windows\n  breaks    Natural-break classification of a 1-D variable\n  range     Typical operating range of a 1-D variable\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nLogging goes to stderr; set {LOG_ENV} (e.g. {LOG_ENV}=debug) to change the level.\nRun 'sigrec <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

const WINDOWS_HELP: &str = "USAGE:\n  sigrec windows --input <series.json> [OPTIONS]\n\nOPTIONS:\n  --win <usize>              Entropy window length. Default: 300\n  --k-start <usize>          Consecutive qualifying samples that open a segment. Default: 3\n  --k-stop <usize>           Consecutive disqualifying samples that close a segment. Default: 3\n  --nan-thr <float>          Max missing fraction per timestep. Default: 0.05\n  --strict-alignment         Require identical timestamps on every channel\n  --config <path>            JSON TrainingWindowConfig; flags override it\n  --input <path>             Required {\"channels\": [{\"name\", \"timestamps\", \"values\"}]}\n  --output <path>            Write JSON output to file";

const BREAKS_HELP: &str = "USAGE:\n  sigrec breaks --input <values.json> [OPTIONS]\n\nOPTIONS:\n  --selection <knee|bic>     Class-count selection. Default: knee\n  --seed <u64>               Sampling seed. Default: 0\n  --report                   Emit per-class-count scores instead of the boundaries\n  --config <path>            JSON BreakConfig; flags override it\n  --input <path>             Required JSON array or {\"values\": [...]}\n  --output <path>            Write JSON output to file";

const RANGE_HELP: &str = "USAGE:\n  sigrec range --input <values.json> [OPTIONS]\n\nOPTIONS:\n  --components <usize>       Mixture components. Default: 3\n  --std-scale <float>        Envelope half-width in std. Default: 3.0\n  --weight-threshold <float> Minimum component weight. Default: 0.05\n  --seed <u64>               Initialization seed. Default: 0\n  --config <path>            JSON RangeConfig; flags override it\n  --input <path>             Required JSON array or {\"values\": [...]}\n  --output <path>            Write JSON output to file";

fn command_help(command: &str) -> Option<&'static str> {
    match command {
        "windows" => Some(WINDOWS_HELP),
        "breaks" => Some(BREAKS_HELP),
        "range" => Some(RANGE_HELP),
        _ => None,
    }
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    let help = command_help(command).ok_or_else(|| {
        CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: windows, breaks, range"
        ))
    })?;
    println!("{help}");
    Ok(())
}

fn handle_windows(args: WindowsArgs) -> Result<(), CliError> {
    let config = build_windows_config(&args)?;
    let raw = read_text(args.input.as_path())?;
    let doc = parse_series_document(raw.as_str()).map_err(|source| {
        CliError::json(format!("invalid series JSON in '{}'", args.input.display()), source)
    })?;
    let output = run_windows(doc, config)?;
    write_json_output(&output, args.output.as_deref())
}

fn handle_breaks(args: BreaksArgs) -> Result<(), CliError> {
    let config = build_breaks_config(&args)?;
    let values = load_values(args.input.as_path())?;
    if args.report {
        let output = run_breaks_report(&values, config)?;
        write_json_output(&output, args.output.as_deref())
    } else {
        let output = run_breaks(&values, config)?;
        write_json_output(&output, args.output.as_deref())
    }
}

fn handle_range(args: RangeArgs) -> Result<(), CliError> {
    let config = build_range_config(&args)?;
    let values = load_values(args.input.as_path())?;
    let output = run_range(&values, config)?;
    write_json_output(&output, args.output.as_deref())
}

fn build_windows_config(args: &WindowsArgs) -> Result<TrainingWindowConfig, CliError> {
    let mut config: TrainingWindowConfig = load_config(args.config.as_deref())?;
    if let Some(win) = args.win {
        config.entropy.window = win;
    }
    if let Some(k_start) = args.k_start {
        config.segment.k_start = k_start;
    }
    if let Some(k_stop) = args.k_stop {
        config.segment.k_stop = k_stop;
    }
    if let Some(nan_thr) = args.nan_thr {
        config.segment.nan_thr = nan_thr;
    }
    if args.strict_alignment {
        config.alignment = AlignmentPolicy::Strict;
    }
    tracing::debug!(?config, "windows config");
    Ok(config)
}

fn build_breaks_config(args: &BreaksArgs) -> Result<BreakConfig, CliError> {
    let mut config: BreakConfig = load_config(args.config.as_deref())?;
    if let Some(selection) = args.selection {
        config.selection = selection;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    tracing::debug!(?config, "breaks config");
    Ok(config)
}

fn build_range_config(args: &RangeArgs) -> Result<RangeConfig, CliError> {
    let mut config: RangeConfig = load_config(args.config.as_deref())?;
    if let Some(components) = args.components {
        config.n_components = components;
    }
    if let Some(std_scale) = args.std_scale {
        config.std_scale = std_scale;
    }
    if let Some(weight_threshold) = args.weight_threshold {
        config.weight_threshold = weight_threshold;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    tracing::debug!(?config, "range config");
    Ok(config)
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, CliError> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let raw = read_text(path)?;
    serde_json::from_str(raw.as_str()).map_err(|source| {
        CliError::json(format!("invalid config JSON in '{}'", path.display()), source)
    })
}

fn load_values(path: &Path) -> Result<Vec<f64>, CliError> {
    let raw = read_text(path)?;
    parse_values_document(raw.as_str()).map_err(|source| {
        CliError::json(format!("invalid values JSON in '{}'", path.display()), source)
    })
}

fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    tracing::error!(code = err.code(), "{err}");
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CliError, Command, build_breaks_config, command_help, build_range_config, build_windows_config,
        parse_breaks_args, parse_cli, parse_range_args, parse_windows_args,
    };
    use sigrec_breaks::KSelection;
    use sigrec_core::{AlignmentPolicy, AnalysisError};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn windows_flags_override_defaults() {
        let args = parse_windows_args(&tokens(&[
            "--input",
            "series.json",
            "--win=50",
            "--k-start",
            "2",
            "--nan-thr",
            "0.1",
            "--strict-alignment",
        ]))
        .expect("windows args should parse");
        let config = build_windows_config(&args).expect("config should build");
        assert_eq!(config.entropy.window, 50);
        assert_eq!(config.segment.k_start, 2);
        assert_eq!(config.segment.k_stop, 3);
        assert_eq!(config.segment.nan_thr, 0.1);
        assert_eq!(config.alignment, AlignmentPolicy::Strict);
    }

    #[test]
    fn breaks_selection_and_seed_parse() {
        let args = parse_breaks_args(&tokens(&[
            "--input",
            "values.json",
            "--selection",
            "BIC",
            "--seed",
            "9",
            "--report",
        ]))
        .expect("breaks args should parse");
        assert!(args.report);
        let config = build_breaks_config(&args).expect("config should build");
        assert_eq!(config.selection, KSelection::Bic);
        assert_eq!(config.seed, 9);
        assert!(
            parse_breaks_args(&tokens(&["--input", "v.json", "--selection", "elbow"])).is_err()
        );
    }

    #[test]
    fn range_flags_override_defaults() {
        let args = parse_range_args(&tokens(&[
            "--input",
            "values.json",
            "--components",
            "4",
            "--std-scale",
            "2.5",
            "--weight-threshold=0.1",
        ]))
        .expect("range args should parse");
        let config = build_range_config(&args).expect("config should build");
        assert_eq!(config.n_components, 4);
        assert_eq!(config.std_scale, 2.5);
        assert_eq!(config.weight_threshold, 0.1);
        assert_eq!(config.n_init, 5);
    }

    #[test]
    fn missing_input_and_bad_flags_are_rejected() {
        assert!(parse_windows_args(&tokens(&["--win", "10"])).is_err());
        assert!(parse_range_args(&tokens(&["--input", "v.json", "--bogus", "1"])).is_err());
        assert!(parse_breaks_args(&tokens(&["--input"])).is_err());
        assert!(
            parse_windows_args(&tokens(&["--input", "s.json", "--strict-alignment=yes"])).is_err()
        );
        assert!(parse_range_args(&tokens(&["positional"])).is_err());
    }

    #[test]
    fn commands_dispatch_and_unknown_commands_fail() {
        let cli = parse_cli(&tokens(&["range", "--input", "v.json"]))
            .expect("range should parse")
            .expect("range is a runnable command");
        assert!(matches!(cli.command, Command::Range(_)));
        let err = parse_cli(&tokens(&["cluster"])).err().expect("unknown command must fail");
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn windows_help_describes_dwell_counts() {
        let help = command_help("windows").expect("windows has help");
        assert!(help.contains("--k-start <usize>          Consecutive qualifying samples"));
        assert!(help.contains("--k-stop <usize>           Consecutive disqualifying samples"));
        assert!(!help.contains("backdated"));
        assert!(command_help("breaks").is_some_and(|h| h.contains("--report")));
        assert!(command_help("range").is_some_and(|h| h.contains("--weight-threshold")));
        assert!(command_help("cluster").is_none());
    }

    #[test]
    fn error_codes_follow_analysis_errors() {
        let err = CliError::from(AnalysisError::numerical_issue("fit failed"));
        assert_eq!(err.code(), "numerical_issue");
        assert_eq!(err.to_string(), AnalysisError::numerical_issue("fit failed").to_string());
        let io = CliError::io(
            "failed to read 'x'",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(io.code(), "io_error");
        assert_eq!(io.to_string(), "failed to read 'x': missing");
    }
}
