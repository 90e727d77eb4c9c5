use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use donation_core::Amount;
use donation_engine::{PollSettings, RedditCredentials, RedditSettings};
use log::LevelFilter;
use url::Url;

use crate::logging::LogDestination;

/// Watches a fundraiser page and stickies a reddit reply for every new
/// donation above the minimum.
///
/// Every option can also be given through the environment variable named
/// alongside it.
#[derive(Clone, Parser)]
#[command(name = "donation_sticky", version, about)]
pub struct Config {
    /// Fundraiser page to poll.
    #[arg(long, env = "amf_url", value_parser = parse_source_url)]
    pub amf_url: Url,

    /// Subreddit holding the discussion thread, without the `r/`.
    #[arg(long, env = "subreddit")]
    pub subreddit: String,

    /// Text the discussion thread's title must contain.
    #[arg(long, env = "dt_title", default_value = "Discussion Thread")]
    pub dt_title: String,

    /// Account that posts the discussion thread.
    #[arg(long, env = "dt_author")]
    pub dt_author: String,

    #[arg(long, env = "client_id", hide_env_values = true)]
    pub client_id: String,

    #[arg(long, env = "client_secret", hide_env_values = true)]
    pub client_secret: String,

    #[arg(long, env = "refresh_token", hide_env_values = true)]
    pub refresh_token: String,

    /// Donations must be strictly above this to be announced.
    #[arg(long, env = "minimum_amount", default_value = "24")]
    pub minimum_amount: Amount,

    /// Seconds between polls.
    #[arg(
        long,
        env = "interval_secs",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: u64,

    /// Where tracked donations are kept between runs.
    #[arg(long, env = "state_file", default_value = "tracked_donations.json")]
    pub state_file: PathBuf,

    #[arg(
        long = "log",
        env = "log_destination",
        value_enum,
        default_value_t = LogDestination::Terminal
    )]
    pub log_destination: LogDestination,

    #[arg(long, env = "log_level", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
}

impl Config {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.interval_secs),
            minimum_amount: self.minimum_amount,
        }
    }

    pub fn reddit_settings(&self) -> RedditSettings {
        RedditSettings::new(
            self.subreddit.trim_start_matches("r/"),
            &self.dt_title,
            &self.dt_author,
            self.amf_url.as_str(),
            self.minimum_amount,
        )
    }

    pub fn reddit_credentials(&self) -> RedditCredentials {
        RedditCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    raw.parse().map_err(|_| {
        format!("unknown log level {raw:?}, expected off, error, warn, info, debug or trace")
    })
}

fn parse_source_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|err| format!("invalid url: {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {other:?}, expected http or https")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REQUIRED: [&str; 13] = [
        "donation_sticky",
        "--amf-url",
        "https://www.againstmalaria.com/Fundraiser.aspx?FundraiserID=1",
        "--subreddit",
        "r/charity",
        "--dt-author",
        "drive_bot",
        "--client-id",
        "id",
        "--client-secret",
        "secret",
        "--refresh-token",
        "refresh",
    ];

    fn parse_with(extra: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(REQUIRED.iter().chain(extra).copied())
    }

    #[test]
    fn defaults_apply_when_only_required_options_are_given() {
        let config = parse_with(&[]).unwrap();

        assert_eq!(config.dt_title, "Discussion Thread");
        assert_eq!(config.minimum_amount, Amount::from_dollars(24));
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.state_file, PathBuf::from("tracked_donations.json"));
        assert_eq!(config.log_destination, LogDestination::Terminal);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn derived_settings_carry_the_options() {
        let config = parse_with(&["--minimum-amount", "49.99", "--interval-secs", "5"]).unwrap();

        let poll = config.poll_settings();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.minimum_amount, Amount::from_cents(4_999));

        let reddit = config.reddit_settings();
        assert_eq!(reddit.subreddit, "charity");
        assert_eq!(reddit.thread_author, "drive_bot");
        assert_eq!(reddit.minimum, Amount::from_cents(4_999));
        assert_eq!(
            reddit.source_url,
            "https://www.againstmalaria.com/Fundraiser.aspx?FundraiserID=1"
        );
        assert_eq!(config.reddit_credentials().refresh_token, "refresh");
    }

    #[test]
    fn log_options_parse() {
        let config = parse_with(&["--log", "both", "--log-level", "debug"]).unwrap();
        assert_eq!(config.log_destination, LogDestination::Both);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn non_http_source_url_is_rejected() {
        let mut args = REQUIRED.to_vec();
        args[2] = "ftp://example.org/page";
        assert!(Config::try_parse_from(args).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(parse_with(&["--interval-secs", "0"]).is_err());
    }

    #[test]
    fn malformed_minimum_is_rejected() {
        assert!(parse_with(&["--minimum-amount", "lots"]).is_err());
        assert!(parse_with(&["--minimum-amount", "24.001"]).is_err());
    }
}
