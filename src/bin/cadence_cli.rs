use std::{env, path::PathBuf, process};

use cadence_core::{init, DetectionConfig, ScheduleSearch, SearchOptions};
use chrono::{Local, NaiveDate};

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut today = Local::now().date_naive();
    let mut config_path: Option<PathBuf> = None;
    let mut single = false;
    let mut dates = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--today" => {
                let value = args.next().ok_or("--today requires a date")?;
                today = parse_date(&value)?;
            }
            "--config" => {
                let value = args.next().ok_or("--config requires a path")?;
                config_path = Some(PathBuf::from(value));
            }
            "--single" => single = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other if other.starts_with("--") => {
                print_usage();
                return Err(format!("unknown option {other}").into());
            }
            other => dates.push(parse_date(other)?),
        }
    }

    if dates.is_empty() {
        print_usage();
        return Err("at least one observation date is required".into());
    }

    let config = DetectionConfig::load(&config_path.unwrap_or_else(DetectionConfig::default_path))?;
    let mut options = SearchOptions::new(today);
    if single {
        options = options.allow_single_observation();
    }

    let results = ScheduleSearch::with_config(config, options).run(&dates)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("invalid date '{value}': {err}"))
}

fn print_usage() {
    eprintln!(
        "Usage: cadence_cli [--today YYYY-MM-DD] [--config PATH] [--single] DATE...\n\
         Prints the ranked recurring schedules that fit the given dates as JSON."
    );
}
