use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;

use flora::commands::today;
use flora::storage::Store;
use flora::*;

#[derive(Parser)]
#[command(name = "flora")]
#[command(about = "Private, on-device cycle tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Passphrase sealing the state file
    #[arg(long, global = true, env = "FLORA_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Evaluate everything as of this date instead of the system clock
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record cycle basics and mark onboarding complete
    Onboard {
        #[arg(long)]
        cycle_length: Option<u32>,
        #[arg(long)]
        period_length: Option<u32>,
        /// Start date of the most recent period
        #[arg(long)]
        last_period: Option<NaiveDate>,
        /// track, conceive or pregnancy
        #[arg(long, value_parser = parse_enum::<Goal>)]
        goal: Option<Goal>,
    },

    /// Show the current cycle day, phase and projections
    Status,

    /// Show the phase a date falls in
    Phase { date: NaiveDate },

    /// Show a month calendar with phases and period days
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },

    /// Save the log for a day, replacing any earlier log for that date
    Log {
        date: NaiveDate,
        #[arg(long)]
        period: bool,
        /// spotting, light, medium or heavy
        #[arg(long, value_parser = parse_enum::<FlowIntensity>)]
        flow: Option<FlowIntensity>,
        #[arg(long = "mood", value_parser = parse_enum::<Mood>)]
        moods: Vec<Mood>,
        #[arg(long = "symptom", value_parser = parse_enum::<PhysicalSymptom>)]
        symptoms: Vec<PhysicalSymptom>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        sleep: Option<f32>,
        #[arg(long)]
        water: Option<u32>,
    },

    /// Show the log saved for a day
    Show { date: NaiveDate },

    /// Mark a period as started (defaults to today)
    Start { date: Option<NaiveDate> },

    /// Mark the open period as ended (defaults to today)
    End { date: Option<NaiveDate> },

    /// Summarise patterns across cycles and logs
    Insights,

    /// Change settings
    Settings {
        #[arg(long)]
        cycle_length: Option<u32>,
        #[arg(long)]
        period_length: Option<u32>,
        #[arg(long)]
        last_period: Option<NaiveDate>,
        #[arg(long, value_parser = parse_enum::<Goal>)]
        goal: Option<Goal>,
        #[arg(long)]
        notifications: Option<bool>,
    },

    /// Print all stored data as JSON
    Export,

    /// Delete all stored data
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Parse a snake_case enum value the same way it is stored.
fn parse_enum<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| format!("unknown value `{s}`"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let log = flora::logging::init();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    log.set_default_level(&config.logging.level);

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };
    if config.storage.encrypt && cli.passphrase.is_none() {
        return Err(Error::Config(
            "encryption is enabled; pass --passphrase or set FLORA_PASSPHRASE".into(),
        ));
    }

    let today = cli.today.unwrap_or_else(today);
    let mut tracker = Tracker::load(Store::new(data_dir, cli.passphrase), today)?;
    let json = cli.json;

    match cli.command {
        Commands::Onboard {
            cycle_length,
            period_length,
            last_period,
            goal,
        } => {
            tracker.complete_onboarding(SettingsPatch {
                average_cycle_length: cycle_length,
                average_period_length: period_length,
                last_period_date: last_period,
                goal,
                notifications_enabled: None,
            })?;
            print_settings(tracker.settings(), json)
        }
        Commands::Status => cmd_status(&tracker, json),
        Commands::Phase { date } => {
            let phase = tracker.phase_for_date(date)?;
            if json {
                print_json(&phase)
            } else {
                println!("{date}: {}", phase.label());
                Ok(())
            }
        }
        Commands::Calendar { year, month } => {
            let month = tracker.month(
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
            )?;
            if json {
                print_json(&month)
            } else {
                print_month(&month);
                Ok(())
            }
        }
        Commands::Log {
            date,
            period,
            flow,
            moods,
            symptoms,
            notes,
            sleep,
            water,
        } => {
            let log = DayLog {
                date,
                is_period: period || flow.is_some(),
                flow_intensity: flow,
                moods: moods.into_iter().collect::<BTreeSet<_>>(),
                symptoms: symptoms.into_iter().collect::<BTreeSet<_>>(),
                notes,
                sleep_hours: sleep,
                water_intake: water,
            };
            tracker.save_day_log(log)?;
            if json {
                return print_json(&tracker.day_log(date));
            }
            println!("Saved log for {date}");
            Ok(())
        }
        Commands::Show { date } => match tracker.day_log(date) {
            _ if json => print_json(&tracker.day_log(date)),
            Some(log) => {
                print_day_log(log);
                Ok(())
            }
            None => {
                println!("No log for {date}");
                Ok(())
            }
        },
        Commands::Start { date } => {
            let date = date.unwrap_or(today);
            let before = tracker.cycles().len();
            tracker.start_period(Some(date))?;
            let started = tracker.cycles().len() > before;
            if json {
                return print_json(&serde_json::json!({
                    "started": started,
                    "cycle": tracker.cycles().last(),
                    "day_log": tracker.day_log(date),
                }));
            }
            if started {
                println!("Period started {date}");
            } else {
                println!("Logged {date} as a period day, period already in progress");
            }
            Ok(())
        }
        Commands::End { date } => {
            let closed = tracker.end_period(date)?;
            let cycle = tracker.cycles().last().filter(|_| closed);
            if json {
                return print_json(&serde_json::json!({
                    "closed": closed,
                    "cycle": cycle,
                }));
            }
            match cycle.and_then(|c| c.end_date.zip(c.length)) {
                Some((end, length)) => println!("Period ended {end} after {length} days"),
                None => println!("No period in progress"),
            }
            Ok(())
        }
        Commands::Insights => cmd_insights(&tracker, json),
        Commands::Settings {
            cycle_length,
            period_length,
            last_period,
            goal,
            notifications,
        } => {
            tracker.update_settings(SettingsPatch {
                average_cycle_length: cycle_length,
                average_period_length: period_length,
                last_period_date: last_period,
                goal,
                notifications_enabled: notifications,
            })?;
            print_settings(tracker.settings(), json)
        }
        Commands::Export => {
            println!("{}", tracker.export_json()?);
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err(Error::InvalidArgument(
                    "refusing to delete data without --yes".into(),
                ));
            }
            tracker.clear_all_data()?;
            println!("All data cleared");
            Ok(())
        }
    }
}

fn cmd_status(tracker: &Tracker, json: bool) -> Result<()> {
    let stats = tracker.stats()?;
    let upcoming = tracker.upcoming()?;

    if json {
        return print_json(&serde_json::json!({
            "stats": stats,
            "upcoming": upcoming,
        }));
    }

    if !tracker.is_onboarded() {
        eprintln!("Not set up yet, run `flora onboard` to enter your cycle details");
    }
    println!(
        "Day {} of {} ({})",
        stats.day_in_cycle,
        stats.average_cycle_length,
        stats.current_phase.label()
    );
    println!(
        "Next period:    {} (in {} days)",
        stats.next_period_date, upcoming.days_until_period
    );
    if upcoming.in_fertile_window {
        println!("Fertile window: now, until {}", stats.fertile_window_end);
    } else {
        println!(
            "Ovulation:      {} (in {} days)",
            stats.ovulation_date, upcoming.days_until_ovulation
        );
        println!(
            "Fertile window: {} to {}",
            stats.fertile_window_start, stats.fertile_window_end
        );
    }
    Ok(())
}

fn cmd_insights(tracker: &Tracker, json: bool) -> Result<()> {
    let insights = tracker.insights()?;
    if json {
        return print_json(&insights);
    }

    println!("Avg cycle:      {} days", insights.avg_cycle_length);
    println!("Cycles tracked: {}", insights.total_cycles);
    println!("Days logged:    {}", insights.total_logs);
    if insights.total_logs == 0 {
        println!("Start logging to see your patterns");
        return Ok(());
    }
    if let Some(mood) = insights.top_mood {
        println!("Top mood:       {}", enum_name(&mood));
    }
    if let Some(symptom) = insights.top_symptom {
        println!("Top symptom:    {}", enum_name(&symptom).replace('_', " "));
    }
    println!("Next period in: {} days", insights.days_until_next_period);
    Ok(())
}

fn print_settings(settings: &UserSettings, json: bool) -> Result<()> {
    if json {
        return print_json(settings);
    }
    println!("Cycle length:   {} days", settings.average_cycle_length);
    println!("Period length:  {} days", settings.average_period_length);
    println!("Last period:    {}", settings.last_period_date);
    println!("Goal:           {}", enum_name(&settings.goal));
    println!(
        "Reminders:      {}",
        if settings.notifications_enabled { "on" } else { "off" }
    );
    Ok(())
}

fn print_day_log(log: &DayLog) {
    println!("{}", log.date);
    if log.is_period {
        let flow = log.flow_intensity.map(|f| enum_name(&f)).unwrap_or_default();
        println!("  period {flow}");
    }
    let names = |items: Vec<String>| items.join(", ");
    if !log.moods.is_empty() {
        println!("  moods: {}", names(log.moods.iter().map(enum_name).collect()));
    }
    if !log.symptoms.is_empty() {
        println!(
            "  symptoms: {}",
            names(log.symptoms.iter().map(enum_name).collect())
        );
    }
    if let Some(sleep) = log.sleep_hours {
        println!("  sleep: {sleep} h");
    }
    if let Some(water) = log.water_intake {
        println!("  water: {water}");
    }
    if let Some(notes) = &log.notes {
        println!("  notes: {notes}");
    }
}

fn print_month(month: &MonthData) {
    let title = NaiveDate::from_ymd_opt(month.year, month.month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    println!("{title:^28}");
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");
    for week in month.weeks() {
        let line: String = week
            .iter()
            .map(|day| {
                if !day.in_month {
                    return "    ".to_string();
                }
                let mark = if day.is_period { '*' } else { ' ' };
                let phase = day.phase.label().chars().next().unwrap_or(' ');
                format!("{:>2}{}{}", day.date.day(), phase, mark)
            })
            .collect();
        println!("{}", line.trim_end());
    }
    println!("P period  F follicular  O ovulation  L luteal  * logged period");
}

/// Stored (snake_case) name of an enum value.
fn enum_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
