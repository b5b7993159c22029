//! gator: a multi-user command-line RSS/Atom aggregator.
//!
//! Users register, add feeds and follow each other's feeds; `agg` polls the
//! stored feeds on an interval, least recently fetched first.

pub mod commands;
pub mod config;
pub mod feed;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod util;
