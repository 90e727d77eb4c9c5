mod config;
mod logging;
mod shutdown;

use anyhow::Context;
use clap::Parser;
use donation_engine::{
    DonorTableParser, FetchSettings, JsonStateStore, PageSnapshotSource, PersistPolicy, Poller,
    RedditNotifier, ReqwestFetcher, TrackedState,
};
use engine_logging::engine_info;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::initialize(config.log_destination, config.log_level);
    engine_info!("donation_sticky v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown::cancel_on_signal(shutdown.clone()));

    let notifier = RedditNotifier::new(config.reddit_settings(), config.reddit_credentials())
        .context("building reddit client")?;
    let source = PageSnapshotSource::new(
        ReqwestFetcher::new(FetchSettings::default()),
        config.amf_url.as_str(),
        DonorTableParser::default(),
    );
    let state = TrackedState::open(
        JsonStateStore::new(&config.state_file),
        PersistPolicy::default(),
    );

    let tracked = Poller::new(source, notifier, state, config.poll_settings())
        .run(shutdown)
        .await
        .with_context(|| format!("saving tracked donations to {:?}", config.state_file))?;

    engine_info!("Stopped with {} tracked donations", tracked.len());
    Ok(())
}
