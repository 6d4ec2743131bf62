//! Completeness checks that decide whether a finished run can be timed.

use tracing::warn;

use crate::models::{AbsoluteRun, PhaseId};

/// Shield elements per shield phase never drop below this
const MIN_SHIELDS: usize = 3;
/// Every phase has four legs to destroy
const MIN_LEGS: usize = 4;
/// Leg respawns can double the count; more than this points at a broken fight
const MAX_EXPECTED_LEGS: usize = 8;

/// Per-phase markers that a validated run is guaranteed to carry
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPhase {
    pub id: PhaseId,
    /// Present for phases with a shield sub-phase
    pub shield_phase_end: Option<f64>,
    pub body_vulnerable: f64,
    pub body_kill: f64,
    /// Pylon start and end, present for phases with a pylon sub-phase
    pub pylon: Option<(f64, f64)>,
}

/// A run that passed [`check_run_integrity`]. Read-only from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRun {
    run: AbsoluteRun,
    heist_start: f64,
    boss_sighted: f64,
    phases: Vec<ValidatedPhase>,
}

impl ValidatedRun {
    pub fn run(&self) -> &AbsoluteRun {
        &self.run
    }

    pub fn heist_start(&self) -> f64 {
        self.heist_start
    }

    pub fn boss_sighted(&self) -> f64 {
        self.boss_sighted
    }

    /// Phases 1 to 4, in order
    pub fn phases(&self) -> &[ValidatedPhase] {
        &self.phases
    }
}

/// Check that everything needed to convert `run` to relative time is present.
///
/// All problems are collected; on failure the returned list holds one
/// human-readable reason per problem.
pub fn check_run_integrity(run: AbsoluteRun) -> Result<ValidatedRun, (AbsoluteRun, Vec<String>)> {
    let mut reasons = Vec::new();
    let mut phases = Vec::with_capacity(PhaseId::SEQUENCE.len());

    if run.heist_start.is_none() {
        reasons.push("No departure from the elevator was recorded.".to_string());
    }
    if run.boss_sighted.is_none() {
        reasons.push("The Profit-Taker was never sighted.".to_string());
    }

    for id in PhaseId::SEQUENCE {
        let record = run.phase(id);

        if id.has_shield_phase() {
            if record.shields.len() < MIN_SHIELDS {
                let found = record.shields.len();
                reasons.push(format!(
                    "Phase {id} recorded {found} shield elements, but at least {MIN_SHIELDS} \
                     were expected."
                ));
            }
            if record.shield_phase_end.is_none() {
                reasons.push(format!("Phase {id} recorded no end of its shield phase."));
            }
        }

        if record.legs.len() < MIN_LEGS {
            reasons.push(format!(
                "Phase {id} recorded {} legs, but at least {MIN_LEGS} were expected.",
                record.legs.len()
            ));
        }
        if record.legs.len() > MAX_EXPECTED_LEGS {
            warn!(
                run_nr = run.run_nr,
                phase = %id,
                legs = record.legs.len(),
                "More leg kills than one respawn explains; the fight may be bugged"
            );
        }

        if record.body_vulnerable.is_none() {
            reasons.push(format!("Phase {id} recorded no body vulnerability."));
        }
        if record.body_kill.is_none() {
            reasons.push(format!("Phase {id} recorded no body kill."));
        }

        let pylon = if id.has_pylon_phase() {
            if record.pylon_start.is_none() {
                reasons.push(format!("Phase {id} recorded no pylon phase start."));
            }
            if record.pylon_end.is_none() {
                reasons.push(format!("Phase {id} recorded no pylon phase end."));
            }
            record.pylon_start.zip(record.pylon_end)
        } else {
            None
        };

        if let (Some(body_vulnerable), Some(body_kill)) =
            (record.body_vulnerable, record.body_kill)
        {
            phases.push(ValidatedPhase {
                id,
                shield_phase_end: record.shield_phase_end.filter(|_| id.has_shield_phase()),
                body_vulnerable,
                body_kill,
                pylon,
            });
        }
    }

    match (run.heist_start, run.boss_sighted) {
        (Some(heist_start), Some(boss_sighted)) if reasons.is_empty() => Ok(ValidatedRun {
            run,
            heist_start,
            boss_sighted,
            phases,
        }),
        _ => Err((run, reasons)),
    }
}
