//! One complete run: fetch unseen mail, then publish the feed.

use crate::config::FeedConfig;
use crate::connection::ImapStream;
use crate::error::Result;
use crate::feed::{self, FeedChannel, FeedStatus};
use crate::fetcher::MailFetcher;
use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::instrument;

/// What a successful run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Outcome of the feed update.
    pub status: FeedStatus,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    /// Formats as the log line, e.g. ` 3s OK (You got 2 new messages.)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:2.0}s {}", self.elapsed.as_secs_f64(), self.status)
    }
}

/// Collects unseen messages and rewrites the feed when there are any.
///
/// The feed is written before the session is closed. If anything fails
/// after login, the session is logged out on a best-effort basis and the
/// original error is returned.
///
/// # Errors
///
/// Returns the first connection, IMAP, parse or feed-write error.
#[instrument(name = "runner::run", skip_all, fields(rss_base = %config.main.rss_base))]
pub async fn run(config: &FeedConfig) -> Result<RunReport> {
    let started = Instant::now();

    let fetcher = MailFetcher::connect(&config.imap).await?;

    publish(fetcher, config, started).await
}

/// Runs a logged-in fetcher to completion: fetch, write the feed, close.
async fn publish<T: ImapStream>(
    mut fetcher: MailFetcher<T>,
    config: &FeedConfig,
    started: Instant,
) -> Result<RunReport> {
    let items = match fetcher.fetch_unseen().await {
        Ok(items) => items,
        Err(e) => {
            fetcher.abandon().await;
            return Err(e);
        }
    };

    let channel = FeedChannel::from_config(config);
    let status = match feed::write_feed(&config.main.feed_dir, &channel, &items, Utc::now()) {
        Ok(status) => status,
        Err(e) => {
            fetcher.abandon().await;
            return Err(e);
        }
    };

    fetcher.close().await?;

    Ok(RunReport {
        status,
        elapsed: started.elapsed(),
    })
}
