// Command-line front end: month availability and booking submission

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use workout_booking::{
    telemetry, BookingApiClient, FormConfig, HolidaySource, SubmissionStatus, TimeSlot,
};

#[derive(Parser, Debug)]
#[command(
    name = "workout-booking",
    about = "Check workout availability and submit bookings from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print which days of a month can be booked
    Calendar(CalendarArgs),
    /// Fill in the booking form and submit it
    Book(BookArgs),
}

#[derive(Args, Debug)]
struct CalendarArgs {
    /// Month to show (YYYY-MM)
    #[arg(long, value_parser = parse_month, default_value = "2024-11")]
    month: NaiveDate,
}

#[derive(Args, Debug)]
struct BookArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    /// Age; snapped onto the configured slider range
    #[arg(long)]
    age: Option<u32>,
    /// Name of the photo file to attach
    #[arg(long)]
    photo: String,
    /// Workout date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,
    /// Start time, one of 12:00, 14:00, 16:30, 18:30, 20:00
    #[arg(long)]
    time: TimeSlot,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| err.to_string())
}

fn parse_month(value: &str) -> Result<NaiveDate, String> {
    parse_date(&format!("{value}-01"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FormConfig::load().context("loading configuration")?;
    telemetry::init(&config.log_level).context("initialising logging")?;

    let client = Arc::new(BookingApiClient::new(config.client.clone())?);

    match cli.command {
        Command::Calendar(args) => show_calendar(&config, client, args).await,
        Command::Book(args) => book(&config, client, args).await,
    }
}

async fn show_calendar(
    config: &FormConfig,
    client: Arc<BookingApiClient>,
    args: CalendarArgs,
) -> Result<()> {
    let directory = config.new_directory();
    let holidays = directory
        .load(client.as_ref(), &config.country, config.year)
        .await;

    let engine = config.engine();
    for day in engine.month_view(args.month.year(), args.month.month(), &holidays) {
        let status = if day.disabled { "closed" } else { "open" };
        match day.observance {
            Some(name) => println!("{}  {}  {:<6}  It is {}", day.date, day.date.weekday(), status, name),
            None => println!("{}  {}  {}", day.date, day.date.weekday(), status),
        }
    }
    Ok(())
}

async fn book(config: &FormConfig, client: Arc<BookingApiClient>, args: BookArgs) -> Result<()> {
    let directory = config.new_directory();
    let source: Arc<dyn HolidaySource> = client.clone();
    let loading = directory.spawn_load(source, config.country.clone(), config.year);

    let mut form = config.new_form(directory);
    form.set_first_name(args.first_name);
    form.set_last_name(args.last_name);
    form.set_email(args.email);
    if let Some(age) = args.age {
        form.set_age(age);
    }
    form.choose_files([args.photo]);

    // Wait for holidays so the date is checked against them when picked.
    loading.await.context("holiday load task")?;

    form.pick_date(args.date)?;
    if let Some(observance) = form.picker().observance() {
        bail!("It is {observance}: no time slots are offered on {}", args.date);
    }
    form.pick_time(args.time)?;

    info!(ready = form.is_ready(), "Form filled in");
    match form.submit(client.as_ref()).await {
        Ok(SubmissionStatus::Sent(receipt)) => {
            println!("Booking sent (HTTP {})", receipt.status_code);
            Ok(())
        }
        Ok(SubmissionStatus::TransportFailed { reason }) => bail!("Booking not sent: {reason}"),
        Err(err) => {
            if let Some(message) = form.email_error() {
                eprintln!("{message}");
            }
            Err(err.into())
        }
    }
}
