use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medicover_api::endpoints::appointments::FilterCriteria;
use medicover_api::endpoints::filters::FilterKind;
use std::num::NonZeroU32;

use crate::notifier::Channel;

#[derive(Debug, Parser)]
#[command(name = "medichaser", version, about = "Watch Medicover for free appointment slots")]
pub struct Cli {
    /// Medicover account login
    #[arg(long, env = "MEDICOVER_USER")]
    pub username: String,

    #[arg(long, env = "MEDICOVER_PASS", hide_env_values = true)]
    pub password: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search for appointments, optionally repeating and notifying
    FindAppointment(FindAppointment),
    /// Print the ids accepted by the search filters
    ListFilters(ListFilters),
}

#[derive(Debug, Clone, clap::Args)]
pub struct FindAppointment {
    #[arg(short, long)]
    pub region: u64,

    /// Repeat for several specialties
    #[arg(short, long, required = true)]
    pub specialty: Vec<u64>,

    #[arg(short, long)]
    pub clinic: Option<u64>,

    #[arg(short, long)]
    pub doctor: Option<u64>,

    #[arg(short, long)]
    pub language: Option<u64>,

    /// YYYY-MM-DD, defaults to today
    #[arg(short = 'f', long)]
    pub start_date: Option<NaiveDate>,

    /// YYYY-MM-DD, inclusive
    #[arg(short, long)]
    pub end_date: Option<NaiveDate>,

    /// Minutes between searches; search once when omitted
    #[arg(short, long)]
    pub interval: Option<NonZeroU32>,

    /// pushbullet, pushover, telegram, xmpp or gotify
    #[arg(short, long)]
    pub notification: Option<Channel>,

    #[arg(short, long)]
    pub title: Option<String>,
}

impl FindAppointment {
    pub fn criteria(&self, today: NaiveDate) -> FilterCriteria {
        FilterCriteria {
            region: self.region,
            specialty: self.specialty.iter().copied().collect(),
            clinic: self.clinic,
            start_date: self.start_date.unwrap_or(today),
            end_date: self.end_date,
            language: self.language,
            doctor: self.doctor,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ListFilters {
    #[arg(short, long)]
    pub region: Option<u64>,

    #[arg(short, long)]
    pub specialty: Option<u64>,

    /// regions, specialties, clinics, doctors or languages
    pub kind: FilterKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["medichaser", "--username", "patient", "--password", "secret"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_find_appointment() {
        let cli = parse(&[
            "find-appointment",
            "-r", "204",
            "-s", "132",
            "-s", "9",
            "--end-date", "2025-02-01",
            "-i", "15",
            "-n", "gotify",
            "-t", "Kardiolog",
        ])
        .unwrap();

        let Command::FindAppointment(find) = cli.command else {
            panic!("expected find-appointment");
        };
        assert_eq!(find.interval.map(NonZeroU32::get), Some(15));
        assert_eq!(find.notification, Some(Channel::Gotify));
        assert_eq!(find.title.as_deref(), Some("Kardiolog"));

        let criteria = find.criteria(day(2025, 1, 10));
        assert_eq!(criteria.region, 204);
        assert_eq!(criteria.specialty.iter().copied().collect::<Vec<_>>(), vec![9, 132]);
        assert_eq!(criteria.start_date, day(2025, 1, 10));
        assert_eq!(criteria.end_date, Some(day(2025, 2, 1)));
    }

    #[test]
    fn explicit_start_date_wins_over_today() {
        let cli = parse(&["find-appointment", "-r", "1", "-s", "2", "-f", "2025-03-01"]).unwrap();
        let Command::FindAppointment(find) = cli.command else {
            panic!("expected find-appointment");
        };

        assert_eq!(find.criteria(day(2025, 1, 1)).start_date, day(2025, 3, 1));
        assert!(find.interval.is_none());
    }

    #[test]
    fn rejects_unknown_channel() {
        let err = parse(&["find-appointment", "-r", "1", "-s", "2", "-n", "fax"]).unwrap_err();
        assert!(err.to_string().contains("fax"));
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(parse(&["find-appointment", "-r", "1", "-s", "2", "-i", "0"]).is_err());
    }

    #[test]
    fn specialty_is_required() {
        assert!(parse(&["find-appointment", "-r", "1"]).is_err());
    }

    #[test]
    fn parses_list_filters() {
        let cli = parse(&["list-filters", "-r", "204", "doctors"]).unwrap();
        let Command::ListFilters(list) = cli.command else {
            panic!("expected list-filters");
        };

        assert_eq!(list.region, Some(204));
        assert_eq!(list.specialty, None);
        assert_eq!(list.kind, FilterKind::Doctors);
    }
}
