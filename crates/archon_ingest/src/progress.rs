//! Progress object (spec §4.6, §9): an in-memory record, owned by its
//! pipeline task, that the progress endpoint reads through a snapshot
//! method. Log lines are an append-only bounded ring of the last 200
//! entries.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LOG_RING_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressId(pub Uuid);

impl ProgressId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProgressId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProgressId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Crawl,
    ChunkAndStore,
    CodeExtraction,
    Finalize,
}

impl Phase {
    /// Weight of each phase in the blended percent computation
    /// (spec §4.6: "a weighted blend of phase progress").
    fn weight(self) -> f64 {
        match self {
            Phase::Discovery => 0.05,
            Phase::Crawl => 0.35,
            Phase::ChunkAndStore => 0.35,
            Phase::CodeExtraction => 0.20,
            Phase::Finalize => 0.05,
        }
    }

    fn order(self) -> usize {
        match self {
            Phase::Discovery => 0,
            Phase::Crawl => 1,
            Phase::ChunkAndStore => 2,
            Phase::CodeExtraction => 3,
            Phase::Finalize => 4,
        }
    }

    const ALL: [Phase; 5] = [
        Phase::Discovery,
        Phase::Crawl,
        Phase::ChunkAndStore,
        Phase::CodeExtraction,
        Phase::Finalize,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub pages_fetched: u64,
    pub pages_failed: u64,
    pub chunks_stored: u64,
    pub code_examples: u64,
    pub total_words: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub progress_id: ProgressId,
    pub phase: Phase,
    /// Fraction `[0, 1]` of the current phase's own work.
    pub phase_fraction: f64,
    pub percent: f64,
    pub counters: Counters,
    pub log: Vec<String>,
    pub terminal_status: Option<TerminalStatus>,
    pub last_error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

struct Inner {
    phase: Phase,
    phase_fraction: f64,
    counters: Counters,
    log: VecDeque<String>,
    terminal_status: Option<TerminalStatus>,
    last_error: Option<String>,
    started_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// Single-writer (the owning pipeline task) / many-readers progress
/// record, keyed by `progress_id` in the orchestrator's `DashMap`.
pub struct Progress {
    id: ProgressId,
    inner: Mutex<Inner>,
}

impl Progress {
    pub fn new(id: ProgressId, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner {
                phase: Phase::Discovery,
                phase_fraction: 0.0,
                counters: Counters::default(),
                log: VecDeque::with_capacity(LOG_RING_CAPACITY),
                terminal_status: None,
                last_error: None,
                started_at: now,
                updated_at: now,
            }),
        }
    }

    pub fn set_phase(&self, phase: Phase, now: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap();
        inner.phase = phase;
        inner.phase_fraction = 0.0;
        inner.updated_at = now;
    }

    pub fn set_phase_fraction(&self, fraction: f64, now: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap();
        inner.phase_fraction = fraction.clamp(0.0, 1.0);
        inner.updated_at = now;
    }

    pub fn log(&self, line: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.log.len() >= LOG_RING_CAPACITY {
            inner.log.pop_front();
        }
        inner.log.push_back(line.into());
        inner.updated_at = now;
    }

    pub fn with_counters(&self, f: impl FnOnce(&mut Counters), now: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner.counters);
        inner.updated_at = now;
    }

    pub fn finish(
        &self,
        status: TerminalStatus,
        error: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.terminal_status = Some(status);
        inner.last_error = error;
        inner.phase_fraction = 1.0;
        inner.updated_at = now;
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.lock().unwrap().terminal_status.is_some()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.inner.lock().unwrap();
        let percent = if inner.terminal_status == Some(TerminalStatus::Completed) {
            100.0
        } else {
            blended_percent(inner.phase, inner.phase_fraction)
        };
        ProgressSnapshot {
            progress_id: self.id,
            phase: inner.phase,
            phase_fraction: inner.phase_fraction,
            percent,
            counters: inner.counters.clone(),
            log: inner.log.iter().cloned().collect(),
            terminal_status: inner.terminal_status,
            last_error: inner.last_error.clone(),
            started_at: inner.started_at,
            updated_at: inner.updated_at,
        }
    }
}

/// Weighted blend: full credit for every phase strictly before `phase`,
/// plus `fraction` of `phase`'s own weight.
fn blended_percent(phase: Phase, fraction: f64) -> f64 {
    let mut percent = 0.0;
    for p in Phase::ALL {
        if p.order() < phase.order() {
            percent += p.weight();
        } else if p == phase {
            percent += p.weight() * fraction;
        }
    }
    (percent * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_monotonic_across_phases() {
        let a = blended_percent(Phase::Discovery, 1.0);
        let b = blended_percent(Phase::Crawl, 0.0);
        assert!(b >= a);
        let c = blended_percent(Phase::Finalize, 1.0);
        assert!((c - 100.0).abs() < 1e-9);
    }

    #[test]
    fn log_ring_drops_oldest_past_capacity() {
        let now = chrono::Utc::now();
        let progress = Progress::new(ProgressId::new(), now);
        for i in 0..(LOG_RING_CAPACITY + 10) {
            progress.log(format!("line {i}"), now);
        }
        let snap = progress.snapshot();
        assert_eq!(snap.log.len(), LOG_RING_CAPACITY);
        assert_eq!(snap.log[0], "line 10");
    }

    #[test]
    fn completed_status_forces_full_percent() {
        let now = chrono::Utc::now();
        let progress = Progress::new(ProgressId::new(), now);
        progress.set_phase(Phase::CodeExtraction, now);
        progress.finish(TerminalStatus::Completed, None, now);
        assert_eq!(progress.snapshot().percent, 100.0);
    }
}
