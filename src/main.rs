// Entry point and high-level CLI flow.
//
// By default the binary loads both tables, applies any --city/--month
// selection, prints the dashboard and optionally exports it. With
// --interactive it stays in a menu loop so the filters can be changed
// without reloading the files.
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use fleet_efficiency::config::{self, Config};
use fleet_efficiency::filter::ALL;
use fleet_efficiency::output;
use fleet_efficiency::util::format_int;
use fleet_efficiency::Session;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet_efficiency")]
#[command(about = "Operational efficiency analytics for a delivery fleet", long_about = None)]
struct Cli {
    /// Delivery events CSV (overrides DELIVERIES_CSV)
    #[arg(long, value_name = "FILE")]
    deliveries: Option<PathBuf>,

    /// Vehicle registry CSV (overrides FLEET_CSV)
    #[arg(long, value_name = "FILE")]
    fleet: Option<PathBuf>,

    /// Delivery city to filter on
    #[arg(long, default_value = ALL)]
    city: String,

    /// Month label to filter on, e.g. "Mar 2024"
    #[arg(long, default_value = ALL)]
    month: String,

    /// Write CSV and JSON reports after printing the dashboard
    #[arg(short, long, default_value_t = false)]
    export: bool,

    /// Export directory (overrides REPORT_DIR)
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Stay in a menu loop to change filters
    #[arg(short, long, default_value_t = false)]
    interactive: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = config::load_from_env()?;
    if let Some(p) = cli.deliveries.clone() {
        cfg.deliveries_path = p;
    }
    if let Some(p) = cli.fleet.clone() {
        cfg.fleet_path = p;
    }
    if let Some(p) = cli.report_dir.clone() {
        cfg.report_dir = p;
    }
    cfg.log_config();

    let mut session = match Session::open(&cfg.deliveries_path, &cfg.fleet_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "Missing data files. Ensure '{}' and '{}' are readable.",
                cfg.deliveries_path.display(),
                cfg.fleet_path.display()
            );
            return Err(e.into());
        }
    };

    let report = session.load_report();
    println!(
        "Processing dataset... ({} deliveries, {} vehicles loaded)",
        format_int(report.delivery_rows),
        format_int(report.vehicle_rows)
    );
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped because their date could not be read.",
            format_int(report.parse_errors)
        );
    }
    if report.missing_cells > 0 {
        println!(
            "Note: {} blank or unreadable cells kept as missing values.",
            format_int(report.missing_cells)
        );
    }
    println!();

    session.set_city_filter(&cli.city);
    session.set_month_filter(&cli.month);

    if cli.interactive {
        run_menu(&mut session, &cfg);
        return Ok(());
    }

    let dashboard = session.dashboard();
    println!(
        "{}",
        output::render_dashboard(dashboard, &cfg.currency_symbol, cfg.preview_rows)
    );
    if cli.export {
        let files = output::export_dashboard(&cfg.report_dir, dashboard, &cfg.currency_symbol)?;
        println!("(Full tables exported to {})", cfg.report_dir.display());
        for f in files {
            println!("  {}", f.display());
        }
    }
    Ok(())
}

/// Print `prompt` and read one trimmed line.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Offer numbered options and return the chosen one; `All` on blank input.
fn pick(title: &str, options: &[String]) -> String {
    println!("{}:", title);
    for (i, o) in options.iter().enumerate() {
        println!("[{}] {}", i, o);
    }
    let choice = read_line("Enter choice: ");
    match choice.parse::<usize>().ok().and_then(|i| options.get(i)) {
        Some(o) => o.clone(),
        None if choice.is_empty() => ALL.to_string(),
        None => choice,
    }
}

fn run_menu(session: &mut Session, cfg: &Config) {
    loop {
        println!("Current filters: {}", session.selection().describe());
        println!("[1] Select city");
        println!("[2] Select month");
        println!("[3] Show dashboard");
        println!("[4] Export reports");
        println!("[5] Reload data files");
        println!("[6] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => {
                let cities = session.filter_options().cities.clone();
                let city = pick("Select City", &cities);
                session.set_city_filter(&city);
            }
            "2" => {
                let months = session.filter_options().months.clone();
                let month = pick("Select Month", &months);
                session.set_month_filter(&month);
            }
            "3" => {
                let text = output::render_dashboard(
                    session.dashboard(),
                    &cfg.currency_symbol,
                    cfg.preview_rows,
                );
                println!("\n{}", text);
            }
            "4" => {
                let result = output::export_dashboard(
                    &cfg.report_dir,
                    session.dashboard(),
                    &cfg.currency_symbol,
                );
                match result {
                    Ok(files) => println!("Exported {} files to {}\n", files.len(), cfg.report_dir.display()),
                    Err(e) => eprintln!("Write error: {}\n", e),
                }
            }
            "5" => match session.reload() {
                Ok(()) => println!("Reloaded {} deliveries.\n", format_int(session.records().len())),
                Err(e) => eprintln!("Reload failed, keeping previous data: {}\n", e),
            },
            "6" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1 to 6.\n"),
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `FLEET_LOG_LEVEL` picks the level
/// (default `info`). Colour follows `FORCE_COLOR`, then TTY detection.
fn init_tracing() {
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => io::stderr().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("FLEET_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .with_writer(io::stderr)
        .compact()
        .init();
}
