// File: ./src/cli.rs
//! Command-line parsing and help text shared by the binary.
use crate::controller::{ConvertRequest, OutputSink};
use crate::reconstruct::Layout;
use anyhow::{Result, anyhow, bail};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Debug, Clone)]
pub enum Command {
    Help,
    Convert(ConvertRequest),
    Inspect(PathBuf),
    ConfigPath,
    ConfigInit,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: Command,
    pub root: Option<PathBuf>,
    pub verbosity: u8,
}

/// Parses `args` (without the program name).
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut root = None;
    let mut verbosity = 0u8;
    let mut layout = None;
    let mut timezone = None;
    let mut output = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |name: &str| -> Result<String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| anyhow!("Missing value for {}", name))
        };
        match arg {
            "-h" | "--help" | "help" => {
                return Ok(Invocation {
                    command: Command::Help,
                    root,
                    verbosity,
                });
            }
            "-r" | "--root" => root = Some(PathBuf::from(value(arg)?)),
            "-o" | "--output" => output = Some(PathBuf::from(value(arg)?)),
            "-t" | "--timezone" => timezone = Some(value(arg)?),
            "-l" | "--layout" => {
                let raw = value(arg)?;
                layout = Some(
                    Layout::from_str(&raw).map_err(|_| anyhow!("Unknown layout '{}'", raw))?,
                );
            }
            "-v" => verbosity = verbosity.saturating_add(1),
            "-vv" => verbosity = verbosity.saturating_add(2),
            flag if flag.starts_with('-') && flag.len() > 1 => bail!("Unknown option '{}'", flag),
            _ => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        None => Command::Help,
        Some("convert") => {
            let input = positional
                .get(1)
                .ok_or_else(|| anyhow!("convert needs an input file"))?;
            Command::Convert(ConvertRequest {
                input: PathBuf::from(input),
                layout,
                timezone,
                output: output.map_or(OutputSink::Stdout, OutputSink::File),
            })
        }
        Some("inspect") => {
            let file = positional
                .get(1)
                .ok_or_else(|| anyhow!("inspect needs an .ics file"))?;
            Command::Inspect(PathBuf::from(file))
        }
        Some("config") => match positional.get(1).map(String::as_str) {
            Some("path") | None => Command::ConfigPath,
            Some("init") => Command::ConfigInit,
            Some(other) => bail!("Unknown config action '{}'", other),
        },
        Some(other) => bail!("Unknown command '{}'", other),
    };

    Ok(Invocation {
        command,
        root,
        verbosity,
    })
}

pub fn print_help(binary_name: &str) {
    let layouts: Vec<String> = Layout::iter().map(|l| l.to_string()).collect();

    println!(
        "Timetable-ics v{} - Turn an exported school timetable into an iCalendar file",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!(
        "    {} convert <timetable.txt> [--layout <{}>] [--timezone <tz>] [-o <file.ics>]",
        binary_name,
        layouts.join("|")
    );
    println!("    {} inspect <file.ics>", binary_name);
    println!("    {} config [path|init]", binary_name);
    println!("    {} --help", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -l, --layout <name>   Shape of the extracted text (default from config: columns)");
    println!("    -t, --timezone <tz>   IANA timezone for lesson times (config, $TZ, then UTC)");
    println!("    -o, --output <file>   Write the calendar to a file instead of stdout");
    println!("    -r, --root <path>     Use a different directory for the config.");
    println!("    -v, -vv               More log output on stderr");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("INPUT:");
    println!("    columns   First line is the page header ending in '- DD.MM.YYYY',");
    println!("              then one column per weekday separated by form feeds.");
    println!("    stream    All lessons in one text; the last line holding a");
    println!("              DD.MM.YYYY date gives the first day.");
    println!();
    println!("EXAMPLES:");
    println!(
        "    {} convert week36.txt --timezone Europe/Oslo -o week36.ics",
        binary_name
    );
    println!("    {} convert export.txt --layout stream > week.ics", binary_name);
    println!("    {} inspect week36.ics", binary_name);
}

pub fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Installs the stderr logger. Fails if a logger is already set.
pub fn init_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // stdout may carry the calendar, so logs always go to stderr
    TermLogger::init(
        log_level(verbosity),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_convert_with_options() {
        let inv = parse_args(&args(&[
            "convert",
            "week.txt",
            "--layout",
            "stream",
            "-t",
            "Europe/Oslo",
            "-o",
            "out.ics",
            "-v",
        ]))
        .unwrap();
        assert_eq!(inv.verbosity, 1);
        let Command::Convert(req) = inv.command else {
            panic!("expected convert");
        };
        assert_eq!(req.input, PathBuf::from("week.txt"));
        assert_eq!(req.layout, Some(Layout::Stream));
        assert_eq!(req.timezone.as_deref(), Some("Europe/Oslo"));
        assert_eq!(req.output, OutputSink::File(PathBuf::from("out.ics")));
    }

    #[test]
    fn test_convert_defaults_to_stdout() {
        let inv = parse_args(&args(&["convert", "week.txt"])).unwrap();
        let Command::Convert(req) = inv.command else {
            panic!("expected convert");
        };
        assert_eq!(req.output, OutputSink::Stdout);
        assert!(req.layout.is_none());
    }

    #[test]
    fn test_errors() {
        assert!(parse_args(&args(&["convert"])).is_err());
        assert!(parse_args(&args(&["convert", "a.txt", "--layout", "grid"])).is_err());
        assert!(parse_args(&args(&["convert", "a.txt", "--timezone"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["convert", "a.txt", "--bogus"])).is_err());
    }

    #[test]
    fn test_help_and_config() {
        assert!(matches!(parse_args(&[]).unwrap().command, Command::Help));
        assert!(matches!(
            parse_args(&args(&["convert", "-h"])).unwrap().command,
            Command::Help
        ));
        let inv = parse_args(&args(&["config", "init", "--root", "/tmp/x"])).unwrap();
        assert!(matches!(inv.command, Command::ConfigInit));
        assert_eq!(inv.root, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            parse_args(&args(&["config"])).unwrap().command,
            Command::ConfigPath
        ));
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(7), LevelFilter::Debug);
    }

    #[test]
    fn test_second_logger_init_reports_error() {
        // the first call may already fail if another test installed a logger
        let _ = init_logging(0);
        assert!(init_logging(0).is_err());
    }
}
