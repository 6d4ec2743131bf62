//! Log driver: pulls run attempts off a line stream until it runs dry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::markers::MarkerTable;
use crate::models::{RelativeRun, RunOutcome, ShieldEvent};
use crate::parser::{FirstShieldHook, LogLine, RunAssembler};

/// What a followed log has to report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowUpdate<'a> {
    /// Its element hints early whether the run is worth going on with
    FirstShield { run_nr: u32, shield: &'a ShieldEvent },
    Outcome {
        latest: &'a RunOutcome,
        outcomes: &'a [RunOutcome],
    },
}

pub struct Analyzer {
    assembler: RunAssembler,
    outcomes: Vec<RunOutcome>,
    require_heist_start: bool,
    best_time: Option<f64>,
}

impl Analyzer {
    pub fn new(markers: MarkerTable) -> Self {
        Self {
            assembler: RunAssembler::new(markers),
            outcomes: Vec::new(),
            require_heist_start: true,
            best_time: None,
        }
    }

    /// Assemble the next run attempt and keep its outcome.
    ///
    /// Run numbers count every attempt, aborted and bugged ones included.
    pub fn next_outcome<I>(&mut self, lines: &mut I) -> Option<&RunOutcome>
    where
        I: Iterator<Item = LogLine>,
    {
        self.next_outcome_with(lines, &mut |_: u32, _: &ShieldEvent| {})
    }

    fn next_outcome_with<I>(
        &mut self,
        lines: &mut I,
        on_first_shield: &mut FirstShieldHook<'_>,
    ) -> Option<&RunOutcome>
    where
        I: Iterator<Item = LogLine>,
    {
        let run_nr = self.outcomes.len() as u32 + 1;
        let mut outcome =
            self.assembler
                .read_run_with(lines, run_nr, self.require_heist_start, on_first_shield)?;

        self.require_heist_start = match &outcome {
            RunOutcome::Aborted(aborted) => aborted.require_heist_start,
            RunOutcome::Completed(_) | RunOutcome::Bugged(_) => true,
        };

        if let RunOutcome::Completed(run) = &mut outcome {
            if self.best_time.map_or(true, |best| run.length() < best) {
                self.best_time = Some(run.length());
                run.best_run_yet = true;
            }
        }

        self.outcomes.push(outcome);
        self.outcomes.last()
    }

    /// Batch mode: consume the whole stream and mark the overall best run
    pub fn analyze_log<I>(mut self, lines: I) -> Vec<RunOutcome>
    where
        I: Iterator<Item = LogLine>,
    {
        let mut lines = lines;
        while self.next_outcome(&mut lines).is_some() {}

        // best_run_yet only means something while a log is being followed
        for run in self.outcomes.iter_mut().filter_map(completed_mut) {
            run.best_run_yet = false;
        }
        mark_best_run(&mut self.outcomes);
        info!(attempts = self.outcomes.len(), "Log analysed");
        self.outcomes
    }

    /// Follow mode: hand every first shield and every outcome to `on_update`
    /// as soon as it exists. Returns only if the line source ends.
    pub fn follow_log<I, F>(&mut self, lines: I, mut on_update: F)
    where
        I: Iterator<Item = LogLine>,
        F: FnMut(FollowUpdate<'_>),
    {
        let mut lines = lines;
        loop {
            let mut first_shield = |run_nr: u32, shield: &ShieldEvent| {
                on_update(FollowUpdate::FirstShield { run_nr, shield });
            };
            if self.next_outcome_with(&mut lines, &mut first_shield).is_none() {
                return;
            }
            if let Some(latest) = self.outcomes.last() {
                on_update(FollowUpdate::Outcome {
                    latest,
                    outcomes: &self.outcomes,
                });
            }
        }
    }
}

fn completed_mut(outcome: &mut RunOutcome) -> Option<&mut RelativeRun> {
    match outcome {
        RunOutcome::Completed(run) => Some(run),
        _ => None,
    }
}

/// Index of the shortest completed run; the earliest one wins a tie
pub fn best_run_index(outcomes: &[RunOutcome]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, outcome) in outcomes.iter().enumerate() {
        if let Some(run) = outcome.as_completed() {
            if best.map_or(true, |(_, length)| run.length() < length) {
                best = Some((index, run.length()));
            }
        }
    }
    best.map(|(index, _)| index)
}

/// Flag the shortest completed run as the best one, and only that one
pub fn mark_best_run(outcomes: &mut [RunOutcome]) {
    let best = best_run_index(outcomes);
    for (index, outcome) in outcomes.iter_mut().enumerate() {
        if let Some(run) = completed_mut(outcome) {
            run.best_run = Some(index) == best;
        }
    }
}

/// Medians over every completed run of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub completed_runs: usize,
    pub best_run_nr: u32,
    pub best_length: f64,
    pub median_length: f64,
    pub median_fight_duration: f64,
    pub median_sum_of_parts: f64,
    pub median_shield_sum: f64,
    pub median_leg_sum: f64,
    pub median_body_sum: f64,
    pub median_pylon_sum: f64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Option<Self> {
        let runs: Vec<&RelativeRun> =
            outcomes.iter().filter_map(RunOutcome::as_completed).collect();
        let best = outcomes.get(best_run_index(outcomes)?)?.as_completed()?;
        let median_of =
            |f: fn(&RelativeRun) -> f64| median(runs.iter().map(|run| f(run)).collect());

        Some(Self {
            completed_runs: runs.len(),
            best_run_nr: best.run_nr,
            best_length: best.length(),
            median_length: median_of(RelativeRun::length),
            median_fight_duration: median_of(RelativeRun::fight_duration),
            median_sum_of_parts: median_of(RelativeRun::sum_of_parts),
            median_shield_sum: median_of(RelativeRun::shield_sum),
            median_leg_sum: median_of(RelativeRun::leg_sum),
            median_body_sum: median_of(RelativeRun::body_sum),
            median_pylon_sum: median_of(RelativeRun::pylon_sum),
        })
    }
}

/// Median of a non-empty sample; even counts average the middle pair
fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    match values.len() {
        0 => 0.0,
        n if n % 2 == 0 => (values[mid - 1] + values[mid]) / 2.0,
        _ => values[mid],
    }
}

/// Everything known about one analysed log, as served and printed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<RunOutcome>,
    /// Run number of the shortest completed run
    pub best_run: Option<u32>,
    pub summary: Option<RunSummary>,
}

impl SessionReport {
    pub fn new(source: impl Into<String>, outcomes: Vec<RunOutcome>) -> Self {
        let best_run = best_run_index(&outcomes).map(|index| outcomes[index].run_nr());
        let summary = RunSummary::from_outcomes(&outcomes);
        Self {
            source: source.into(),
            generated_at: Utc::now(),
            outcomes,
            best_run,
            summary,
        }
    }

    pub fn best(&self) -> Option<&RelativeRun> {
        let run_nr = self.best_run?;
        self.run(run_nr)?.as_completed()
    }

    pub fn run(&self, run_nr: u32) -> Option<&RunOutcome> {
        self.outcomes.iter().find(|outcome| outcome.run_nr() == run_nr)
    }
}
