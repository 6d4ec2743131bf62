use tracing::trace;

use crate::classifier::RawEvent;
use crate::models::{AbortCause, AbsoluteRun, PhaseId, ShieldEvent};

/// Number of `BodyVulnerable` markers that make up one body kill
const KILL_SEQUENCE_HITS: u8 = 3;

/// Reasons for leaving a phase (and the run) before it is complete
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    Abort {
        cause: AbortCause,
        require_heist_start: bool,
    },
    /// No more input; unwinds every open phase and run
    LogEnd,
}

impl Interrupt {
    pub fn abort(cause: AbortCause, require_heist_start: bool) -> Self {
        Interrupt::Abort {
            cause,
            require_heist_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseProgress {
    Continue,
    Complete,
}

/// Accumulates the events of one phase into a run
pub struct PhaseRecorder<'a> {
    phase: PhaseId,
    kill_states: &'a [u32],
    kill_sequence: u8,
}

impl<'a> PhaseRecorder<'a> {
    pub fn new(phase: PhaseId, kill_states: &'a [u32]) -> Self {
        Self {
            phase,
            kill_states,
            kill_sequence: 0,
        }
    }

    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    /// Record one event. Returns whether the phase is complete now, or the
    /// interrupt that ends the whole run attempt.
    pub fn record(
        &mut self,
        run: &mut AbsoluteRun,
        event: RawEvent,
    ) -> Result<PhaseProgress, Interrupt> {
        trace!(run_nr = run.run_nr, phase = %self.phase, ?event, "event");

        if let Some(time) = event.time() {
            run.final_time = Some(time);
        }

        let phase = self.phase;
        match event {
            RawEvent::ShieldRemoved { damage_type, time } => {
                // Shield switches while the phase 3 pylons are up go to the
                // interstitial bucket; one of them is moved to phase 4 later.
                let bucket = if phase == PhaseId::Phase3 && run.phase_3.pylon_start.is_some() {
                    PhaseId::Phase3Interstitial
                } else {
                    phase
                };
                run.phase_mut(bucket)
                    .shields
                    .push(ShieldEvent { damage_type, time });
            }
            RawEvent::ShieldPhaseEnded(time) => {
                run.phase_mut(phase).shield_phase_end = Some(time);
            }
            RawEvent::LegDestroyed(time) => {
                run.phase_mut(phase).legs.push(time);
            }
            RawEvent::BodyVulnerable(time) => {
                if self.kill_sequence == 0 {
                    run.phase_mut(phase).body_vulnerable = Some(time);
                }
                self.kill_sequence += 1;
                if self.kill_sequence == KILL_SEQUENCE_HITS {
                    run.phase_mut(phase).body_kill = Some(time);
                    return Ok(PhaseProgress::Complete);
                }
            }
            RawEvent::StateChanged { state, time } => {
                // Phase 4 is only over after the third vulnerability marker.
                if phase != PhaseId::Phase4 && self.kill_states.contains(&state) {
                    run.phase_mut(phase).body_kill = Some(time);
                }
            }
            RawEvent::PylonsLaunched(time) => {
                run.phase_mut(phase).pylon_start = Some(time);
            }
            RawEvent::BossSighted(time) => {
                run.boss_sighted = Some(time);
            }
            RawEvent::PhaseBoundary { phase: ended, time } => {
                if phase != PhaseId::Phase4 && ended == phase.number() {
                    // Phase 2 has no pylons; its kill came from the state change.
                    if phase.has_pylon_phase() {
                        run.phase_mut(phase).pylon_end = Some(time);
                    }
                    return Ok(PhaseProgress::Complete);
                }
            }
            RawEvent::PlayerNickname(name) => {
                if run.nickname.is_none() {
                    run.nickname = Some(name);
                }
            }
            RawEvent::SquadMemberJoined(name) => {
                run.squad_members.insert(name);
            }
            RawEvent::ExtractionZoneLeft(time) => {
                if run.heist_start.is_none() {
                    run.heist_start = Some(time);
                }
            }
            RawEvent::NewRunStarted => {
                return Err(Interrupt::abort(AbortCause::NewRunStarted, false));
            }
            RawEvent::ReturnedToTown => {
                return Err(Interrupt::abort(AbortCause::ReturnedToTown, true));
            }
            RawEvent::MissionAborted => {
                return Err(Interrupt::abort(AbortCause::MissionAborted, true));
            }
            RawEvent::HostMigration => {
                return Err(Interrupt::abort(AbortCause::HostMigration, true));
            }
        }

        Ok(PhaseProgress::Continue)
    }
}
