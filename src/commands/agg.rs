//! `agg <interval>`: run the scheduler until shutdown.
use std::io::Write;
use std::time::Duration;

use super::{Command, CommandError, State};
use crate::feed::Fetcher;
use crate::scheduler::Scheduler;

/// Parse a human duration such as `30s`, `1m` or `1h 30m`.
///
/// Zero is rejected since it would spin without pause.
pub fn parse_interval(input: &str) -> Result<Duration, CommandError> {
    let interval =
        humantime::parse_duration(input).map_err(|e| CommandError::InvalidInterval {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
    if interval.is_zero() {
        return Err(CommandError::InvalidInterval {
            input: input.to_string(),
            reason: "interval must be greater than zero".to_string(),
        });
    }
    Ok(interval)
}

pub(super) async fn agg(state: &mut State, cmd: &Command) -> Result<(), CommandError> {
    let interval = parse_interval(cmd.arg(0, "interval")?)?;
    let fetcher = Fetcher::new(&state.settings)?;
    let mut scheduler = Scheduler::new(state.db.clone(), fetcher, &state.settings);

    writeln!(
        state.out,
        "Collecting feeds every {}",
        humantime::format_duration(interval)
    )?;
    state.out.flush()?;

    scheduler
        .run(interval, state.shutdown.clone(), &mut *state.out)
        .await?;
    tracing::info!("Aggregator stopped");
    Ok(())
}
