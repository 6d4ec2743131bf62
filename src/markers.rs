//! Marker vocabulary of the game log.
//!
//! Every literal the classifier looks for lives here so that a change in the
//! upstream log format is a data change. A YAML file can override any subset
//! of the fields; the rest keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

const TRANSMISSION: &str = "GiveItem Queuing resource load for Transmission: \
                            /Lotus/Sounds/Dialog/FortunaOrbHeist/Business/";

/// Literal substrings recognised by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTable {
    pub shield_switch: String,
    /// Transmissions that close a shield sub-phase (any of them, any phase)
    pub shield_phase_endings: Vec<String>,
    pub leg_kill: String,
    pub body_vulnerable: String,
    pub state_change: String,
    /// Landscape states that mean the body of phase 1, 2 or 3 was killed
    pub kill_states: Vec<u32>,
    pub pylons_launched: String,
    pub boss_sighted: String,
    /// Orb phase announcements ending phases 1, 2 and 3, in that order
    pub phase_ends: Vec<String>,
    pub nickname: String,
    pub squad_member: String,
    pub heist_start: String,
    pub host_migration: String,
    pub elevator_exit: String,
    pub back_to_town: String,
    pub abort_mission: String,
    /// Byte sequences a game update started splicing into player names
    pub name_noise: Vec<String>,
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self {
            shield_switch: "SwitchShieldVulnerability".to_string(),
            shield_phase_endings: vec![
                format!("{TRANSMISSION}DBntyFourInterPrTk0920TheBusiness"),
                format!("{TRANSMISSION}DBntyFourInterPrTk0890TheBusiness"),
                format!("{TRANSMISSION}DBntyFourSatelReal0930TheBusiness"),
            ],
            leg_kill: "Leg freshly destroyed at part".to_string(),
            body_vulnerable: "Camper->StartVulnerable() - The Camper can now be damaged!"
                .to_string(),
            state_change: "CamperHeistOrbFight.lua: Landscape - New State: ".to_string(),
            kill_states: vec![3, 5, 6],
            pylons_launched: "Pylon launch complete".to_string(),
            boss_sighted: "Orb Fight - Starting first attack Orb phase".to_string(),
            phase_ends: vec![
                "Orb Fight - Starting second attack Orb phase".to_string(),
                "Orb Fight - Starting third attack Orb phase".to_string(),
                "Orb Fight - Starting final attack Orb phase".to_string(),
            ],
            nickname: "Net [Info]: name: ".to_string(),
            squad_member: "loadout loader finished.".to_string(),
            heist_start: "jobId=/Lotus/Types/Gameplay/Venus/Jobs/Heists/HeistProfitTakerBountyFour"
                .to_string(),
            host_migration:
                "\"jobId\" : \"/Lotus/Types/Gameplay/Venus/Jobs/Heists/HeistProfitTakerBountyFour"
                    .to_string(),
            elevator_exit: "EidolonMP.lua: EIDOLONMP: Avatar left the zone".to_string(),
            back_to_town: "EidolonMP.lua: EIDOLONMP: TryTownTransition".to_string(),
            abort_mission: "GameRulesImpl - changing state from SS_STARTED to SS_ENDING"
                .to_string(),
            name_noise: vec!["\u{E000}".to_string(), "\u{EE}\u{80}\u{80}".to_string()],
        }
    }
}

impl MarkerTable {
    /// Load a marker table from a YAML file, falling back to defaults per field
    pub fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: MarkerTable =
            serde_yaml::from_str(&content).map_err(|e| AnalyzerError::MarkerConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        table.check().map_err(|message| AnalyzerError::MarkerConfig {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(table)
    }

    /// Literal announcing the end of `phase` (1..=3). Phase 4 has none.
    pub fn phase_end(&self, phase: u8) -> Option<&str> {
        let index = usize::from(phase).checked_sub(1)?;
        self.phase_ends.get(index).map(String::as_str)
    }

    /// An empty marker would match every line, so reject those up front.
    fn check(&self) -> Result<(), String> {
        if self.phase_ends.len() != 3 {
            return Err(format!(
                "phase_ends needs exactly 3 entries (phases 1-3), got {}",
                self.phase_ends.len()
            ));
        }

        let singles = [
            ("shield_switch", &self.shield_switch),
            ("leg_kill", &self.leg_kill),
            ("body_vulnerable", &self.body_vulnerable),
            ("state_change", &self.state_change),
            ("pylons_launched", &self.pylons_launched),
            ("boss_sighted", &self.boss_sighted),
            ("nickname", &self.nickname),
            ("squad_member", &self.squad_member),
            ("heist_start", &self.heist_start),
            ("host_migration", &self.host_migration),
            ("elevator_exit", &self.elevator_exit),
            ("back_to_town", &self.back_to_town),
            ("abort_mission", &self.abort_mission),
        ];
        if let Some((name, _)) = singles.iter().find(|(_, value)| value.is_empty()) {
            return Err(format!("marker '{name}' must not be empty"));
        }

        let lists = [
            ("shield_phase_endings", &self.shield_phase_endings),
            ("phase_ends", &self.phase_ends),
            ("name_noise", &self.name_noise),
        ];
        for (name, values) in lists {
            if values.iter().any(String::is_empty) {
                return Err(format!("'{name}' contains an empty entry"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_table_passes_its_own_checks() {
        assert_eq!(MarkerTable::default().check(), Ok(()));
    }

    #[test]
    fn phase_end_lookup_is_limited_to_first_three_phases() {
        let table = MarkerTable::default();
        assert_eq!(
            table.phase_end(1),
            Some("Orb Fight - Starting second attack Orb phase")
        );
        assert_eq!(table.phase_end(3), Some("Orb Fight - Starting final attack Orb phase"));
        assert_eq!(table.phase_end(4), None);
        assert_eq!(table.phase_end(0), None);
    }

    #[test]
    fn yaml_override_keeps_unspecified_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "leg_kill: \"Leg obliterated\"").expect("write");
        writeln!(file, "kill_states: [3, 5, 6, 7]").expect("write");

        let table = MarkerTable::load(file.path()).expect("table should load");
        assert_eq!(table.leg_kill, "Leg obliterated");
        assert_eq!(table.kill_states, vec![3, 5, 6, 7]);
        assert_eq!(table.shield_switch, MarkerTable::default().shield_switch);
    }

    #[test]
    fn empty_marker_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "body_vulnerable: \"\"").expect("write");

        let error = MarkerTable::load(file.path()).expect_err("empty marker must fail");
        assert!(error.to_string().contains("body_vulnerable"), "got: {error}");
    }

    #[test]
    fn wrong_number_of_phase_ends_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "phase_ends: [\"a\", \"b\", \"c\", \"d\"]").expect("write");

        assert!(matches!(
            MarkerTable::load(file.path()),
            Err(AnalyzerError::MarkerConfig { .. })
        ));
    }
}
