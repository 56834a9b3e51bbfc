//! Batch position pipeline.
//!
//! Per position: sample the top-K moves, score each resulting position,
//! compute the dispersion of the present scores. Engine failures and empty
//! score sets skip the position; the batch always continues. With more than
//! one worker, each worker owns its own engine session and claims positions
//! from a shared cursor; results are re-ordered by position index.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use evalspread_stats::{Dispersion, Metric, compute};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::SearchSettings;
use crate::engine::{Engine, EngineFactory};
use crate::error::{PipelineError, SkipReason};
use crate::position::Position;
use crate::sampler::sample_top_moves;
use crate::scorer::{present_scores, score_moves};

/// Dispersion of one successfully analysed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionRecord {
    /// 1-based index of the position in its input.
    pub position: usize,
    pub fen: String,
    /// Present scores the statistics were computed from, in candidate order.
    pub scores: Vec<i32>,
    pub dispersion: Dispersion,
}

/// A position that produced no record.
#[derive(Debug)]
pub struct SkippedPosition {
    pub position: usize,
    pub fen: String,
    pub reason: SkipReason,
}

/// Everything a batch produced, in position order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<DispersionRecord>,
    pub skipped: Vec<SkippedPosition>,
    /// The stop flag was raised before every position was analysed.
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn sequences(&self) -> MetricSequences {
        MetricSequences::from_records(&self.records)
    }
}

/// The four metric sequences of a batch. Entry `i` of every sequence belongs
/// to `positions()[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSequences {
    positions: Vec<usize>,
    range: Vec<f64>,
    iqr: Vec<f64>,
    std_dev: Vec<f64>,
    mad: Vec<f64>,
}

impl MetricSequences {
    pub fn from_records(records: &[DispersionRecord]) -> Self {
        let mut seq = Self::default();
        for r in records {
            seq.push(r.position, &r.dispersion);
        }
        seq
    }

    pub fn push(&mut self, position: usize, d: &Dispersion) {
        self.positions.push(position);
        self.range.push(d.range);
        self.iqr.push(d.iqr);
        self.std_dev.push(d.std_dev);
        self.mad.push(d.mad);
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn get(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Range => &self.range,
            Metric::Iqr => &self.iqr,
            Metric::StdDev => &self.std_dev,
            Metric::Mad => &self.mad,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Analyse a single position with an open session.
pub fn analyse_position<E: Engine + ?Sized>(
    engine: &mut E,
    position: &Position,
    settings: SearchSettings,
) -> Result<DispersionRecord, SkipReason> {
    let candidates = sample_top_moves(engine, position, settings.candidates, settings.depth)?;
    let scored = score_moves(engine, position, &candidates, settings.depth)?;
    let scores = present_scores(&scored);
    let dispersion = compute(&scores).ok_or(SkipReason::EmptyScoreSet)?;
    Ok(DispersionRecord {
        position: position.index(),
        fen: position.fen().to_string(),
        scores,
        dispersion,
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

type Slot = (usize, Result<DispersionRecord, SkipReason>);

pub struct Pipeline<'a, F: EngineFactory> {
    factory: &'a F,
    settings: SearchSettings,
    workers: usize,
    stop: Arc<AtomicBool>,
}

impl<'a, F: EngineFactory> Pipeline<'a, F> {
    pub fn new(factory: &'a F, settings: SearchSettings) -> Self {
        Self {
            factory,
            settings,
            workers: 1,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of concurrent workers, each with its own engine session.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Share a stop flag. Raising it prevents new positions from starting.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Analyse `positions`.
    ///
    /// Fails only if the first engine session cannot be opened.
    pub fn run(&self, positions: &[Position]) -> Result<BatchOutcome, PipelineError> {
        if positions.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let t0 = Instant::now();
        let first = self.factory.open().map_err(PipelineError::EngineUnavailable)?;
        let workers = self.workers.min(positions.len());
        let cursor = AtomicUsize::new(0);

        let mut slots: Vec<Slot> = if workers == 1 {
            self.work(positions, &cursor, Some(first))
        } else {
            std::thread::scope(|s| {
                let mut first = Some(first);
                let handles: Vec<_> = (0..workers)
                    .map(|_| {
                        let session = first.take();
                        let cursor = &cursor;
                        s.spawn(move || self.work(positions, cursor, session))
                    })
                    .collect();

                let mut slots = Vec::with_capacity(positions.len());
                for handle in handles {
                    match handle.join() {
                        Ok(mut part) => slots.append(&mut part),
                        Err(_) => warn!("pipeline worker panicked; its positions are lost"),
                    }
                }
                slots
            })
        };
        slots.sort_by_key(|(i, _)| *i);

        let mut outcome = BatchOutcome {
            cancelled: self.is_stopped(),
            ..BatchOutcome::default()
        };
        let mut slots = slots.into_iter().peekable();
        for (i, position) in positions.iter().enumerate() {
            let result = match slots.next_if(|(j, _)| *j == i) {
                Some((_, result)) => result,
                None => Err(SkipReason::Cancelled),
            };
            match result {
                Ok(record) => outcome.records.push(record),
                Err(reason) => outcome.skipped.push(SkippedPosition {
                    position: position.index(),
                    fen: position.fen().to_string(),
                    reason,
                }),
            }
        }

        info!(
            "analysed {} positions in {:.1}s: {} records, {} skipped{}",
            positions.len(),
            t0.elapsed().as_secs_f64(),
            outcome.records.len(),
            outcome.skipped.len(),
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        Ok(outcome)
    }

    /// Worker loop: claim positions until none are left or the batch stops.
    fn work(
        &self,
        positions: &[Position],
        cursor: &AtomicUsize,
        mut session: Option<F::Session>,
    ) -> Vec<Slot> {
        let mut slots = Vec::new();
        loop {
            if self.is_stopped() {
                break;
            }
            let i = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(position) = positions.get(i) else {
                break;
            };

            if session.is_none() {
                match self.factory.open() {
                    Ok(engine) => session = Some(engine),
                    Err(e) => {
                        warn!("position {}: engine re-open failed: {e}", position.index());
                        slots.push((i, Err(SkipReason::Engine(e))));
                        continue;
                    }
                }
            }
            let Some(engine) = session.as_mut() else {
                continue;
            };

            let result = analyse_position(engine, position, self.settings);
            match &result {
                Ok(r) => info!(
                    "[{}/{}] position {}: range={:?} sd={:.2} mad={:?} iqr={:?} ({} scores)",
                    i + 1,
                    positions.len(),
                    r.position,
                    r.dispersion.range,
                    r.dispersion.std_dev,
                    r.dispersion.mad,
                    r.dispersion.iqr,
                    r.scores.len()
                ),
                Err(reason) => {
                    warn!("position {} skipped: {reason}", position.index());
                    if matches!(reason, SkipReason::Engine(_)) {
                        debug!("dropping engine session after error");
                        session = None;
                    }
                }
            }
            slots.push((i, result));
        }
        slots
    }
}
