//! Goodput arithmetic over recorded event intervals
//!
//! Goodput is completed step time over job wall time. Badput categories are
//! the non-step events (accelerator init, data loading, ...), each reported
//! as a share of job wall time.

use crate::backend::error::{BackendError, BackendResult};
use crate::measurement::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One start/end pair; `end` is `None` while the event is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    /// Length in seconds, measuring open intervals up to `now`.
    pub fn seconds(&self, now: DateTime<Utc>) -> f64 {
        let end = self.end.unwrap_or(now);
        seconds_between(self.start, end)
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part * 100.0 / whole).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Cumulative goodput for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodputSummary {
    pub job_name: String,
    pub computed_at: DateTime<Utc>,
    pub job_elapsed_seconds: f64,
    pub productive_seconds: f64,
    pub goodput_percent: f64,
    pub steps_completed: usize,
    /// Badput share per event name; empty when the breakdown is disabled
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub badput_percent: BTreeMap<String, f64>,
}

/// Goodput over the most recent `window_size` completed steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowGoodput {
    pub window_size: u32,
    pub steps_in_window: usize,
    pub window_seconds: f64,
    pub goodput_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowReport {
    pub job_name: String,
    pub computed_at: DateTime<Utc>,
    pub windows: Vec<RollingWindowGoodput>,
}

/// Recorded intervals for a single job.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    intervals: HashMap<Event, Vec<Interval>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&mut self, event: Event, at: DateTime<Utc>) {
        self.intervals
            .entry(event)
            .or_default()
            .push(Interval { start: at, end: None });
    }

    /// Close the most recently opened interval of `event`.
    pub fn record_end(&mut self, event: Event, at: DateTime<Utc>) -> BackendResult<()> {
        let open = self
            .intervals
            .get_mut(&event)
            .and_then(|list| list.iter_mut().rev().find(|i| i.is_open()))
            .ok_or_else(|| BackendError::EventNotStarted(event.to_string()))?;
        open.end = Some(at);
        Ok(())
    }

    pub fn intervals(&self, event: Event) -> &[Interval] {
        self.intervals.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    fn completed(&self, event: Event) -> impl Iterator<Item = &Interval> {
        self.intervals(event).iter().filter(|i| !i.is_open())
    }

    /// Wall time from the first job start to the last job end (or `now`
    /// while any job interval is still open).
    pub fn job_elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        let jobs = self.intervals(Event::Job);
        let Some(first) = jobs.iter().map(|i| i.start).min() else {
            return 0.0;
        };
        let last = if jobs.iter().any(Interval::is_open) {
            now
        } else {
            jobs.iter().filter_map(|i| i.end).max().unwrap_or(now)
        };
        seconds_between(first, last)
    }

    pub fn summary(
        &self,
        job_name: &str,
        now: DateTime<Utc>,
        include_badput_breakdown: bool,
    ) -> GoodputSummary {
        let elapsed = self.job_elapsed_seconds(now);
        let productive: f64 = self.completed(Event::Step).map(|i| i.seconds(now)).sum();

        let badput_percent = if include_badput_breakdown {
            Event::ALL
                .into_iter()
                .filter(Event::is_badput)
                .filter(|event| !self.intervals(*event).is_empty())
                .map(|event| {
                    let spent: f64 = self.intervals(event).iter().map(|i| i.seconds(now)).sum();
                    (event.to_string(), percent(spent, elapsed))
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        GoodputSummary {
            job_name: job_name.to_string(),
            computed_at: now,
            job_elapsed_seconds: elapsed,
            productive_seconds: productive,
            goodput_percent: percent(productive, elapsed),
            steps_completed: self.completed(Event::Step).count(),
            badput_percent,
        }
    }

    pub fn rolling_window(
        &self,
        job_name: &str,
        window_sizes: &[u32],
        now: DateTime<Utc>,
    ) -> RollingWindowReport {
        let steps: Vec<&Interval> = self.completed(Event::Step).collect();

        let windows = window_sizes
            .iter()
            .map(|&size| {
                let take = (size as usize).min(steps.len());
                let window = &steps[steps.len() - take..];
                let (span, productive) = match (window.first(), window.last()) {
                    (Some(first), Some(last)) => (
                        seconds_between(first.start, last.end.unwrap_or(now)),
                        window.iter().map(|i| i.seconds(now)).sum::<f64>(),
                    ),
                    _ => (0.0, 0.0),
                };
                RollingWindowGoodput {
                    window_size: size,
                    steps_in_window: take,
                    window_seconds: span,
                    goodput_percent: percent(productive, span),
                }
            })
            .collect();

        RollingWindowReport {
            job_name: job_name.to_string(),
            computed_at: now,
            windows,
        }
    }
}
