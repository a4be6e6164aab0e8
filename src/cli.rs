use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::Value;

use crate::acquire::config::{ConfigSchema, OptionKind, SourceConfig};
use crate::acquire::factory;

/// Session-level settings shared by every source subcommand.
#[derive(Clone, Debug)]
pub struct SessionArgs {
    pub seconds: f64,
    pub history_seconds: f64,
    pub refresh_ms: u64,
    pub out: PathBuf,
    pub plot: Option<PathBuf>,
    pub fft: Option<PathBuf>,
    pub fft_size: usize,
}

/// Build the command line: session flags plus one subcommand per registered
/// source, generated from the schema the factory exposes.
pub fn build_command() -> Command {
    let mut cmd = Command::new("sigscope")
        .about("Oscilloscope-style data acquisition harness")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("seconds")
                .long("seconds")
                .value_name("SECS")
                .value_parser(value_parser!(f64))
                .default_value("10")
                .global(true)
                .help("How long to acquire before stopping"),
        )
        .arg(
            Arg::new("history-secs")
                .long("history-secs")
                .value_name("SECS")
                .value_parser(value_parser!(f64))
                .default_value("30")
                .global(true)
                .help("Depth of the rolling capture buffer"),
        )
        .arg(
            Arg::new("refresh-ms")
                .long("refresh-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64))
                .default_value("34")
                .global(true)
                .help("Consumer refresh cadence"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("CSV")
                .value_parser(value_parser!(PathBuf))
                .default_value("capture.csv")
                .global(true)
                .help("Where to save the captured data"),
        )
        .arg(
            Arg::new("plot")
                .long("plot")
                .value_name("PNG")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Also render the final time-domain trace"),
        )
        .arg(
            Arg::new("fft")
                .long("fft")
                .value_name("PNG")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Also render the final dBFS spectrum"),
        )
        .arg(
            Arg::new("fft-size")
                .long("fft-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("1024")
                .global(true)
                .help("Transform size for --fft"),
        );

    for registration in factory::registered_sources() {
        let mut sub = Command::new(registration.name).about(registration.summary);
        for option in &registration.schema.options {
            let value_name = match option.kind {
                OptionKind::Float => "NUM",
                OptionKind::Int => "N",
            };
            sub = sub.arg(
                Arg::new(option.key)
                    .long(option.key)
                    .value_name(value_name)
                    .allow_hyphen_values(true)
                    .help(option.help),
            );
        }
        cmd = cmd.subcommand(sub);
    }
    cmd
}

pub fn session_args(matches: &ArgMatches) -> SessionArgs {
    SessionArgs {
        seconds: matches.get_one::<f64>("seconds").copied().unwrap_or(10.0),
        history_seconds: matches
            .get_one::<f64>("history-secs")
            .copied()
            .unwrap_or(30.0),
        refresh_ms: matches.get_one::<u64>("refresh-ms").copied().unwrap_or(34),
        out: matches
            .get_one::<PathBuf>("out")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("capture.csv")),
        plot: matches.get_one::<PathBuf>("plot").cloned(),
        fft: matches.get_one::<PathBuf>("fft").cloned(),
        fft_size: matches.get_one::<usize>("fft-size").copied().unwrap_or(1024),
    }
}

/// Collect a subcommand's flags into the option bag the factory resolves.
/// Values stay text here; the schema coerces them by kind.
pub fn source_config_from_matches(schema: &ConfigSchema, matches: &ArgMatches) -> SourceConfig {
    let mut config = SourceConfig::new();
    for option in &schema.options {
        if let Some(raw) = matches.get_one::<String>(option.key) {
            config.insert(option.key, Value::String(raw.clone()));
        }
    }
    config
}
