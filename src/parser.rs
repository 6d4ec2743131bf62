use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, info};

use crate::classifier::{classify, is_heist_start, RawEvent};
use crate::convert::to_relative;
use crate::error::{AnalyzerError, LineError};
use crate::markers::MarkerTable;
use crate::models::*;
use crate::recorder::{Interrupt, PhaseProgress, PhaseRecorder};
use crate::validate::check_run_integrity;

/// One item of the log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Text(String),
    /// The followed file shrank and was re-read from the start
    Restarted,
}

/// Open a log file for batch analysis
pub fn read_log_file(path: &Path) -> Result<impl Iterator<Item = LogLine>, AnalyzerError> {
    let file = File::open(path).map_err(|source| AnalyzerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(lines_from_reader(BufReader::with_capacity(1024 * 1024, file)))
}

/// Split a reader into log lines. Invalid UTF-8 is replaced rather than
/// rejected; the markers are plain ASCII.
pub fn lines_from_reader<R: BufRead>(reader: R) -> impl Iterator<Item = LogLine> {
    reader.split(b'\n').map_while(|chunk| match chunk {
        Ok(bytes) => Some(LogLine::Text(decode_line(&bytes))),
        Err(e) => {
            error!(error = %e, "Stopped reading log");
            None
        }
    })
}

pub(crate) fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.trim_end_matches(['\r', '\n']).to_string()
}

/// Called with the run number and the first shield of phase 1
pub type FirstShieldHook<'h> = dyn FnMut(u32, &ShieldEvent) + 'h;

/// Reads whole runs off a log stream
pub struct RunAssembler {
    markers: MarkerTable,
}

impl RunAssembler {
    pub fn new(markers: MarkerTable) -> Self {
        Self { markers }
    }

    /// Read the next run attempt.
    ///
    /// With `require_heist_start` the stream is first searched for the line
    /// that announces a heist. Returns `None` once the log has ended.
    pub fn read_run<I>(
        &self,
        lines: &mut I,
        run_nr: u32,
        require_heist_start: bool,
    ) -> Option<RunOutcome>
    where
        I: Iterator<Item = LogLine>,
    {
        self.read_run_with(lines, run_nr, require_heist_start, &mut |_: u32, _: &ShieldEvent| {})
    }

    /// [`read_run`](Self::read_run), reporting the first shield of the run
    /// as soon as it is switched in.
    pub fn read_run_with<I>(
        &self,
        lines: &mut I,
        run_nr: u32,
        require_heist_start: bool,
        on_first_shield: &mut FirstShieldHook<'_>,
    ) -> Option<RunOutcome>
    where
        I: Iterator<Item = LogLine>,
    {
        if require_heist_start {
            debug!(run_nr, "Searching for heist start");
            if self.skip_until_heist_start(lines).is_err() {
                return None;
            }
        }

        let mut run = AbsoluteRun::new(run_nr);
        match self.register_phases(lines, &mut run, on_first_shield) {
            Ok(()) => {}
            Err(Interrupt::LogEnd) => return None,
            Err(Interrupt::Abort {
                cause,
                require_heist_start,
            }) => {
                info!(run_nr, %cause, "Run aborted");
                return Some(RunOutcome::Aborted(AbortedRun {
                    run,
                    cause,
                    require_heist_start,
                }));
            }
        }

        if let Err(reason) = post_process(&mut run) {
            info!(run_nr, %reason, "Run bugged");
            return Some(RunOutcome::Bugged(BuggedRun {
                run,
                reasons: vec![reason],
            }));
        }

        match check_run_integrity(run) {
            Ok(validated) => {
                let relative = to_relative(&validated);
                info!(run_nr, length = relative.length(), "Run completed");
                Some(RunOutcome::Completed(relative))
            }
            Err((run, reasons)) => {
                info!(run_nr, problems = reasons.len(), "Run bugged");
                Some(RunOutcome::Bugged(BuggedRun { run, reasons }))
            }
        }
    }

    fn skip_until_heist_start<I>(&self, lines: &mut I) -> Result<(), Interrupt>
    where
        I: Iterator<Item = LogLine>,
    {
        for line in lines {
            if let LogLine::Text(text) = line {
                if is_heist_start(&text, &self.markers) {
                    return Ok(());
                }
            }
        }
        Err(Interrupt::LogEnd)
    }

    fn register_phases<I>(
        &self,
        lines: &mut I,
        run: &mut AbsoluteRun,
        on_first_shield: &mut FirstShieldHook<'_>,
    ) -> Result<(), Interrupt>
    where
        I: Iterator<Item = LogLine>,
    {
        for phase in PhaseId::SEQUENCE {
            self.register_phase(lines, run, phase, on_first_shield)?;
        }
        Ok(())
    }

    fn register_phase<I>(
        &self,
        lines: &mut I,
        run: &mut AbsoluteRun,
        phase: PhaseId,
        on_first_shield: &mut FirstShieldHook<'_>,
    ) -> Result<(), Interrupt>
    where
        I: Iterator<Item = LogLine>,
    {
        let mut recorder = PhaseRecorder::new(phase, &self.markers.kill_states);
        loop {
            let event = self.next_event(lines)?;
            let is_shield = matches!(event, RawEvent::ShieldRemoved { .. });

            if recorder.record(run, event)? == PhaseProgress::Complete {
                debug!(run_nr = run.run_nr, phase = %recorder.phase(), "Phase complete");
                return Ok(());
            }

            // The first shield tells a player early whether the run is worth going on with.
            let first_of_run = phase == PhaseId::Phase1 && run.phase_1.shields.len() == 1;
            if is_shield && first_of_run {
                if let Some(first) = run.phase_1.shields.first() {
                    debug!(run_nr = run.run_nr, damage_type = ?first.damage_type, "First shield");
                    on_first_shield(run.run_nr, first);
                }
            }
        }
    }

    /// Pull lines until one classifies as an event
    fn next_event<I>(&self, lines: &mut I) -> Result<RawEvent, Interrupt>
    where
        I: Iterator<Item = LogLine>,
    {
        loop {
            let text = match lines.next() {
                Some(LogLine::Text(text)) => text,
                Some(LogLine::Restarted) => {
                    return Err(Interrupt::abort(AbortCause::LogRestarted, true));
                }
                None => return Err(Interrupt::LogEnd),
            };

            match classify(&text, &self.markers) {
                Ok(Some(event)) => return Ok(event),
                Ok(None) => continue,
                Err(e) => return Err(malformed(e)),
            }
        }
    }
}

fn malformed(e: LineError) -> Interrupt {
    error!(error = %e, "Malformed marker line; abandoning run");
    Interrupt::abort(
        AbortCause::MalformedLine {
            detail: e.to_string(),
        },
        true,
    )
}

/// Move the final interstitial shield to the front of phase 4 and drop the
/// extra shield switch that phase 4 records after its last element.
pub fn post_process(run: &mut AbsoluteRun) -> Result<(), String> {
    // Fast runs never see an interstitial shield.
    if let Some(shield) = run.phase_3_interstitial.shields.pop() {
        run.phase_4.shields.insert(0, shield);
    }

    match run.phase_4.shields.pop() {
        Some(_) => Ok(()),
        None => Err("Phase 4 recorded no shield element.".to_string()),
    }
}
