use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Identifies one shield/leg/body accumulator of a run.
///
/// `Phase3Interstitial` collects shield switches that the game reports while
/// the phase 3 pylons are up; they belong logically to the start of phase 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Phase1,
    Phase2,
    Phase3,
    Phase3Interstitial,
    Phase4,
}

impl PhaseId {
    /// The four combat phases, in the order the fight runs through them
    pub const SEQUENCE: [PhaseId; 4] = [
        PhaseId::Phase1,
        PhaseId::Phase2,
        PhaseId::Phase3,
        PhaseId::Phase4,
    ];

    /// Phase number as printed by the game (the interstitial bucket reports 3)
    pub fn number(self) -> u8 {
        match self {
            PhaseId::Phase1 => 1,
            PhaseId::Phase2 => 2,
            PhaseId::Phase3 | PhaseId::Phase3Interstitial => 3,
            PhaseId::Phase4 => 4,
        }
    }

    /// Phases that open with a shield sub-phase
    pub fn has_shield_phase(self) -> bool {
        matches!(self, PhaseId::Phase1 | PhaseId::Phase3 | PhaseId::Phase4)
    }

    /// Phases that close with a pylon (structural-object) sub-phase
    pub fn has_pylon_phase(self) -> bool {
        matches!(self, PhaseId::Phase1 | PhaseId::Phase3)
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseId::Phase3Interstitial => f.write_str("3.5"),
            other => write!(f, "{}", other.number()),
        }
    }
}

/// Elemental shield types, serialised with the game's internal names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DamageType {
    #[serde(rename = "DT_IMPACT")]
    Impact,
    #[serde(rename = "DT_PUNCTURE")]
    Puncture,
    #[serde(rename = "DT_SLASH")]
    Slash,
    #[serde(rename = "DT_FREEZE")]
    Cold,
    #[serde(rename = "DT_FIRE")]
    Heat,
    #[serde(rename = "DT_POISON")]
    Toxin,
    #[serde(rename = "DT_ELECTRICITY")]
    Electricity,
    #[serde(rename = "DT_GAS")]
    Gas,
    #[serde(rename = "DT_VIRAL")]
    Viral,
    #[serde(rename = "DT_MAGNETIC")]
    Magnetic,
    #[serde(rename = "DT_RADIATION")]
    Radiation,
    #[serde(rename = "DT_CORROSIVE")]
    Corrosive,
    #[serde(rename = "DT_EXPLOSION")]
    Blast,
}

impl DamageType {
    /// Map the game's internal name (case-sensitive) to a damage type
    pub fn from_internal_name(name: &str) -> Option<Self> {
        let damage_type = match name {
            "DT_IMPACT" => DamageType::Impact,
            "DT_PUNCTURE" => DamageType::Puncture,
            "DT_SLASH" => DamageType::Slash,
            "DT_FREEZE" => DamageType::Cold,
            "DT_FIRE" => DamageType::Heat,
            "DT_POISON" => DamageType::Toxin,
            "DT_ELECTRICITY" => DamageType::Electricity,
            "DT_GAS" => DamageType::Gas,
            "DT_VIRAL" => DamageType::Viral,
            "DT_MAGNETIC" => DamageType::Magnetic,
            "DT_RADIATION" => DamageType::Radiation,
            "DT_CORROSIVE" => DamageType::Corrosive,
            "DT_EXPLOSION" => DamageType::Blast,
            _ => return None,
        };
        Some(damage_type)
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A shield element being switched in, at an absolute log time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShieldEvent {
    pub damage_type: Option<DamageType>,
    pub time: f64,
}

/// Everything recorded for one phase, in absolute log time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseRecord {
    pub shields: Vec<ShieldEvent>,
    pub shield_phase_end: Option<f64>,
    pub legs: Vec<f64>,
    pub body_vulnerable: Option<f64>,
    pub body_kill: Option<f64>,
    pub pylon_start: Option<f64>,
    pub pylon_end: Option<f64>,
}

/// A run under construction, in absolute (log-native) time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AbsoluteRun {
    pub run_nr: u32,
    pub nickname: Option<String>,
    pub squad_members: BTreeSet<String>,
    /// Leaving the elevator; speedrun timing starts here
    pub heist_start: Option<f64>,
    pub boss_sighted: Option<f64>,
    pub phase_1: PhaseRecord,
    pub phase_2: PhaseRecord,
    pub phase_3: PhaseRecord,
    pub phase_3_interstitial: PhaseRecord,
    pub phase_4: PhaseRecord,
    /// Time of the last boss event seen, for estimating aborted runs
    pub final_time: Option<f64>,
}

impl AbsoluteRun {
    pub fn new(run_nr: u32) -> Self {
        Self {
            run_nr,
            ..Self::default()
        }
    }

    pub fn phase(&self, id: PhaseId) -> &PhaseRecord {
        match id {
            PhaseId::Phase1 => &self.phase_1,
            PhaseId::Phase2 => &self.phase_2,
            PhaseId::Phase3 => &self.phase_3,
            PhaseId::Phase3Interstitial => &self.phase_3_interstitial,
            PhaseId::Phase4 => &self.phase_4,
        }
    }

    pub fn phase_mut(&mut self, id: PhaseId) -> &mut PhaseRecord {
        match id {
            PhaseId::Phase1 => &mut self.phase_1,
            PhaseId::Phase2 => &mut self.phase_2,
            PhaseId::Phase3 => &mut self.phase_3,
            PhaseId::Phase3Interstitial => &mut self.phase_3_interstitial,
            PhaseId::Phase4 => &mut self.phase_4,
        }
    }

    /// How long the run would have taken had it ended at the last boss event
    pub fn estimated_duration(&self) -> Option<f64> {
        Some(self.final_time? - self.heist_start?)
    }
}

/// A shield element with the time it took to break.
///
/// `duration` is `None` where it is not well defined (interstitial shields).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeShield {
    pub damage_type: Option<DamageType>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativePhase {
    pub phase: PhaseId,
    /// Time from heist start until this phase was over
    pub duration: f64,
    pub shields: Vec<RelativeShield>,
    pub legs: Vec<f64>,
    pub body: f64,
    pub pylon: Option<f64>,
}

/// A completed run with every marker re-expressed as a duration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeRun {
    pub run_nr: u32,
    pub nickname: Option<String>,
    pub squad_members: BTreeSet<String>,
    /// Time from heist start until the boss showed up
    pub boss_sighted: f64,
    pub phases: Vec<RelativePhase>,
    pub interstitial_shields: Vec<RelativeShield>,
    pub best_run: bool,
    pub best_run_yet: bool,
}

impl RelativeRun {
    pub fn phase(&self, id: PhaseId) -> Option<&RelativePhase> {
        self.phases.iter().find(|p| p.phase == id)
    }

    /// Total run time: heist start until the final kill
    pub fn length(&self) -> f64 {
        self.phase(PhaseId::Phase4).map(|p| p.duration).unwrap_or(0.0)
    }

    pub fn fight_duration(&self) -> f64 {
        self.length() - self.boss_sighted
    }

    pub fn shield_sum(&self) -> f64 {
        self.phases
            .iter()
            .flat_map(|p| p.shields.iter())
            .filter_map(|s| s.duration)
            .sum()
    }

    pub fn leg_sum(&self) -> f64 {
        self.phases.iter().flat_map(|p| p.legs.iter()).sum()
    }

    pub fn body_sum(&self) -> f64 {
        self.phases.iter().map(|p| p.body).sum()
    }

    pub fn pylon_sum(&self) -> f64 {
        self.phases.iter().filter_map(|p| p.pylon).sum()
    }

    /// Sum of all fight parts; leaves out animation and travel time
    pub fn sum_of_parts(&self) -> f64 {
        self.shield_sum() + self.leg_sum() + self.body_sum() + self.pylon_sum()
    }
}

/// Why a run attempt was abandoned before its natural end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum AbortCause {
    NewRunStarted,
    ReturnedToTown,
    MissionAborted,
    HostMigration,
    LogRestarted,
    MalformedLine { detail: String },
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::NewRunStarted => f.write_str("a new heist was started"),
            AbortCause::ReturnedToTown => f.write_str("the squad returned to town"),
            AbortCause::MissionAborted => f.write_str("the mission was aborted"),
            AbortCause::HostMigration => f.write_str("a host migration happened"),
            AbortCause::LogRestarted => f.write_str("the log file was restarted"),
            AbortCause::MalformedLine { detail } => write!(f, "the log is malformed ({detail})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbortedRun {
    pub run: AbsoluteRun,
    pub cause: AbortCause,
    /// Whether the next attempt has to search for a heist start marker first
    pub require_heist_start: bool,
}

/// A run that reached its end but lacks what is needed to time it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuggedRun {
    pub run: AbsoluteRun,
    pub reasons: Vec<String>,
}

/// Result of one run attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RelativeRun),
    Aborted(AbortedRun),
    Bugged(BuggedRun),
}

impl RunOutcome {
    pub fn run_nr(&self) -> u32 {
        match self {
            RunOutcome::Completed(run) => run.run_nr,
            RunOutcome::Aborted(aborted) => aborted.run.run_nr,
            RunOutcome::Bugged(bugged) => bugged.run.run_nr,
        }
    }

    pub fn as_completed(&self) -> Option<&RelativeRun> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            _ => None,
        }
    }
}
