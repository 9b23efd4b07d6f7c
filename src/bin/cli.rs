// Binary entry point for the command-line converter.
use anyhow::Result;
use std::env;
use std::io::Write;
use timetable_ics::cli::{self, Command};
use timetable_ics::config::Config;
use timetable_ics::context::{AppContext, StandardContext};
use timetable_ics::controller;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = cli::parse_args(&args)?;
    if let Err(e) = cli::init_logging(invocation.verbosity) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let ctx = StandardContext::new(invocation.root.clone());

    match invocation.command {
        Command::Help => cli::print_help("timetable-ics"),
        Command::Convert(request) => {
            let config = Config::load_or_default(&ctx)?;
            let (report, ics) = controller::convert(&request, &config)?;
            if let Some(ics) = ics {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(ics.as_bytes())?;
                stdout.flush()?;
            }
            log::info!(
                "{} events ({} with reminders) in {}",
                report.events,
                report.reminders,
                report.timezone
            );
        }
        Command::Inspect(path) => {
            for event in controller::inspect(&path)? {
                let fmt = |dt: Option<chrono::NaiveDateTime>, pattern: &str| {
                    dt.map(|d| d.format(pattern).to_string())
                        .unwrap_or_else(|| "?".to_string())
                };
                print!(
                    "{}  {}-{}  {}",
                    fmt(event.start, "%a %Y-%m-%d"),
                    fmt(event.start, "%H:%M"),
                    fmt(event.end, "%H:%M"),
                    event.summary
                );
                if let Some(loc) = &event.location {
                    print!("  [{}]", loc);
                }
                println!("{}", if event.has_alarm { "  (reminder)" } else { "" });
            }
        }
        Command::ConfigPath => println!("{}", Config::get_path_string(&ctx)?),
        Command::ConfigInit => {
            let path = ctx.get_config_file_path()?;
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                Config::default().save(&ctx)?;
                println!("Wrote default config to {}", path.display());
            }
        }
    }
    Ok(())
}
