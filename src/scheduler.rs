//! Periodic feed polling.
//!
//! Each tick takes the least-recently-fetched feeds from the store, fetches
//! them one after another, prints a few items per feed and stamps every feed
//! as fetched whether or not the fetch worked. A broken feed therefore moves
//! to the back of the queue like any other.

use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::feed::{Fetcher, RssFeed};
use crate::storage::{Database, DatabaseError};
use crate::util::strip_control_chars;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Feeds taken from the queue (and marked fetched)
    pub processed: usize,
    /// Of those, how many could not be fetched or parsed
    pub failed: usize,
}

pub struct Scheduler {
    db: Database,
    fetcher: Fetcher,
    feeds_per_tick: u32,
    items_per_feed: usize,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(db: Database, fetcher: Fetcher, settings: &Settings) -> Self {
        Self {
            db,
            fetcher,
            feeds_per_tick: settings.feeds_per_tick,
            items_per_feed: settings.items_per_feed,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Poll every `period` until `cancel` fires.
    ///
    /// The first tick happens one full period after the call. A fetch still
    /// in flight when the token is cancelled is dropped.
    ///
    /// # Errors
    ///
    /// Store failures end the loop; fetch failures never do.
    pub async fn run<W>(
        &mut self,
        period: Duration,
        cancel: CancellationToken,
        out: &mut W,
    ) -> Result<(), SchedulerError>
    where
        W: Write + ?Sized,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, stopping scheduler");
                    return Ok(());
                }

                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::info!("Shutdown requested during tick, abandoning fetch");
                            self.state = SchedulerState::Idle;
                            return Ok(());
                        }
                        report = self.tick(out) => {
                            let report = report?;
                            tracing::debug!(
                                processed = report.processed,
                                failed = report.failed,
                                "Tick complete"
                            );
                        }
                    }
                }
            }
        }
    }

    /// One polling pass over the next due batch.
    pub async fn tick<W>(&mut self, out: &mut W) -> Result<TickReport, SchedulerError>
    where
        W: Write + ?Sized,
    {
        self.state = SchedulerState::Fetching;
        let result = self.scrape(out).await;
        self.state = SchedulerState::Idle;
        result
    }

    async fn scrape<W>(&self, out: &mut W) -> Result<TickReport, SchedulerError>
    where
        W: Write + ?Sized,
    {
        let due = self.db.get_next_feeds_to_fetch(self.feeds_per_tick).await?;
        if due.is_empty() {
            tracing::debug!("No feeds to fetch");
        }

        let mut report = TickReport::default();
        for feed in &due {
            writeln!(out, "Processing feed: {}", strip_control_chars(&feed.name))?;

            match self.fetcher.fetch(&feed.url).await {
                Ok(rss) => self.print_items(out, &rss)?,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Feed fetch failed");
                    writeln!(out, "  Failed to fetch {}: {}", feed.url, e)?;
                }
            }

            self.db.mark_feed_fetched(feed.id).await?;
            report.processed += 1;
        }
        out.flush()?;
        Ok(report)
    }

    fn print_items<W>(&self, out: &mut W, rss: &RssFeed) -> std::io::Result<()>
    where
        W: Write + ?Sized,
    {
        if rss.items.is_empty() {
            writeln!(out, "  (no items)")?;
        }
        // Feeds list newest first; document order is kept.
        for item in rss.items.iter().take(self.items_per_feed) {
            writeln!(out, "  * {}", strip_control_chars(&item.title))?;
            writeln!(out, "    {}", strip_control_chars(&item.link))?;
        }
        Ok(())
    }
}
