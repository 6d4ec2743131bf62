//! Maps single log lines to the boss-fight events the assembler cares about.

use nom::branch::alt;
use nom::character::complete::{digit1, multispace0, multispace1, space0};
use nom::combinator::{eof, map_res, peek};
use nom::number::complete::double;
use nom::sequence::{preceded, terminated};
use nom::IResult;

use crate::error::LineError;
use crate::markers::MarkerTable;
use crate::models::DamageType;

/// One recognised log line. Produced per line and consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    ShieldRemoved {
        damage_type: Option<DamageType>,
        time: f64,
    },
    ShieldPhaseEnded(f64),
    LegDestroyed(f64),
    BodyVulnerable(f64),
    StateChanged {
        state: u32,
        time: f64,
    },
    PylonsLaunched(f64),
    BossSighted(f64),
    /// The orb phase announcement that ends `phase` (1..=3)
    PhaseBoundary {
        phase: u8,
        time: f64,
    },
    PlayerNickname(String),
    SquadMemberJoined(String),
    ExtractionZoneLeft(f64),
    NewRunStarted,
    ReturnedToTown,
    MissionAborted,
    HostMigration,
}

impl RawEvent {
    /// Log time carried by the event, if any
    pub fn time(&self) -> Option<f64> {
        match *self {
            RawEvent::ShieldRemoved { time, .. }
            | RawEvent::StateChanged { time, .. }
            | RawEvent::PhaseBoundary { time, .. } => Some(time),
            RawEvent::ShieldPhaseEnded(time)
            | RawEvent::LegDestroyed(time)
            | RawEvent::BodyVulnerable(time)
            | RawEvent::PylonsLaunched(time)
            | RawEvent::BossSighted(time)
            | RawEvent::ExtractionZoneLeft(time) => Some(time),
            RawEvent::PlayerNickname(_)
            | RawEvent::SquadMemberJoined(_)
            | RawEvent::NewRunStarted
            | RawEvent::ReturnedToTown
            | RawEvent::MissionAborted
            | RawEvent::HostMigration => None,
        }
    }
}

/// Classify one log line.
///
/// Boss markers are checked before the squad/mission markers; the first
/// matching marker decides. Returns `Ok(None)` for lines of no interest.
pub fn classify(line: &str, markers: &MarkerTable) -> Result<Option<RawEvent>, LineError> {
    // Boss fight markers
    if line.contains(&markers.shield_switch) {
        let damage_type = line
            .split_whitespace()
            .last()
            .and_then(DamageType::from_internal_name);
        return Ok(Some(RawEvent::ShieldRemoved {
            damage_type,
            time: line_time(line)?,
        }));
    }
    if markers.shield_phase_endings.iter().any(|m| line.contains(m.as_str())) {
        return Ok(Some(RawEvent::ShieldPhaseEnded(line_time(line)?)));
    }
    if line.contains(&markers.leg_kill) {
        return Ok(Some(RawEvent::LegDestroyed(line_time(line)?)));
    }
    if line.contains(&markers.body_vulnerable) {
        return Ok(Some(RawEvent::BodyVulnerable(line_time(line)?)));
    }
    if let Some(offset) = line.find(markers.state_change.as_str()) {
        let rest = &line[offset + markers.state_change.len()..];
        let state = state_id(rest)
            .map(|(_, state)| state)
            .map_err(|_| LineError::MalformedState {
                line: line.to_string(),
            })?;
        return Ok(Some(RawEvent::StateChanged {
            state,
            time: line_time(line)?,
        }));
    }
    if line.contains(&markers.pylons_launched) {
        return Ok(Some(RawEvent::PylonsLaunched(line_time(line)?)));
    }
    if line.contains(&markers.boss_sighted) {
        return Ok(Some(RawEvent::BossSighted(line_time(line)?)));
    }
    if let Some(phase) = (1..=3).find(|&p| markers.phase_end(p).is_some_and(|m| line.contains(m))) {
        return Ok(Some(RawEvent::PhaseBoundary {
            phase,
            time: line_time(line)?,
        }));
    }

    // Squad and mission markers
    if line.contains(&markers.nickname) {
        let cleaned = sanitize_name(&line.replace(',', ""), &markers.name_noise);
        let name = cleaned.split_whitespace().rev().nth(1);
        return Ok(name.map(|n| RawEvent::PlayerNickname(n.to_string())));
    }
    if line.contains(&markers.squad_member) {
        let cleaned = sanitize_name(line, &markers.name_noise);
        let name = cleaned.split_whitespace().rev().nth(3);
        return Ok(name.map(|n| RawEvent::SquadMemberJoined(n.to_string())));
    }
    if line.contains(&markers.elevator_exit) {
        return Ok(Some(RawEvent::ExtractionZoneLeft(line_time(line)?)));
    }
    if line.contains(&markers.heist_start) {
        return Ok(Some(RawEvent::NewRunStarted));
    }
    if line.contains(&markers.back_to_town) {
        return Ok(Some(RawEvent::ReturnedToTown));
    }
    if line.contains(&markers.abort_mission) {
        return Ok(Some(RawEvent::MissionAborted));
    }
    if line.contains(&markers.host_migration) {
        return Ok(Some(RawEvent::HostMigration));
    }

    Ok(None)
}

/// Whether the line announces a new heist (the start-of-run marker)
pub fn is_heist_start(line: &str, markers: &MarkerTable) -> bool {
    line.contains(&markers.heist_start)
}

/// Strip the noise sequences the game splices into player names.
pub fn sanitize_name(raw: &str, noise: &[String]) -> String {
    noise
        .iter()
        .fold(raw.to_string(), |text, sequence| text.replace(sequence.as_str(), ""))
}

/// Parse the log-native timestamp at the start of a line.
pub fn line_time(line: &str) -> Result<f64, LineError> {
    match timestamp(line) {
        Ok((_, time)) if time.is_finite() => Ok(time),
        _ => Err(LineError::MalformedTimestamp {
            line: line.to_string(),
        }),
    }
}

/// Leading whitespace-delimited token, which has to be a number in full
fn timestamp(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, terminated(double, peek(alt((multispace1, eof)))))(input)
}

/// Whole numeric token after the state marker
fn state_id(input: &str) -> IResult<&str, u32> {
    let number = map_res(digit1, str::parse::<u32>);
    preceded(space0, terminated(number, peek(alt((multispace1, eof)))))(input)
}
