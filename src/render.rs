//! Plain-text rendering of run outcomes and session summaries.

use std::fmt::Write;

use crate::analyzer::{RunSummary, SessionReport};
use crate::models::{
    AbortedRun, AbsoluteRun, BuggedRun, DamageType, RelativePhase, RelativeRun, RunOutcome,
    ShieldEvent,
};

const RULE: &str = "------------------------------------------------------------------------";
/// Legs beyond the first four are respawns
const REGULAR_LEGS: usize = 4;

/// `83.456` -> `1m 23.456s`
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.3}s");
    }
    let minutes = (seconds / 60.0).floor();
    format!("{}m {:.3}s", minutes as u64, seconds - minutes * 60.0)
}

pub fn render_report(report: &SessionReport) -> String {
    let mut out = String::new();
    if report.outcomes.is_empty() {
        out.push_str("No Profit-Taker runs found.\n");
        out.push_str("You have to stay host for the whole run for it to show up.\n");
        return out;
    }

    for outcome in &report.outcomes {
        out.push_str(&render_outcome(outcome));
    }
    if let Some(summary) = &report.summary {
        out.push_str(&render_summary(summary));
    }
    out
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed(run) => render_run(run),
        RunOutcome::Aborted(aborted) => render_aborted(aborted),
        RunOutcome::Bugged(bugged) => render_bugged(bugged),
    }
}

fn render_aborted(aborted: &AbortedRun) -> String {
    let mut out = format!(
        "Profit-Taker run #{} was aborted: {}.\n",
        aborted.run.run_nr, aborted.cause
    );
    out.push_str(&estimate_line(&aborted.run));
    out.push('\n');
    out
}

fn render_bugged(bugged: &BuggedRun) -> String {
    let mut out = format!(
        "Profit-Taker run #{} was bugged, no stats can be shown. Problems found:\n",
        bugged.run.run_nr
    );
    for reason in &bugged.reasons {
        let _ = writeln!(out, "  {reason}");
    }
    out.push_str(&estimate_line(&bugged.run));
    out.push('\n');
    out
}

fn estimate_line(run: &AbsoluteRun) -> String {
    match run.estimated_duration() {
        Some(duration) => format!(
            "Had the Profit-Taker died, the run would have taken about {}.\n",
            format_duration(duration)
        ),
        None => String::new(),
    }
}

fn render_run(run: &RelativeRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");

    let mut players: Vec<&str> = run.nickname.iter().map(String::as_str).collect();
    players.extend(
        run.squad_members
            .iter()
            .map(String::as_str)
            .filter(|member| Some(*member) != run.nickname.as_deref()),
    );
    let players = if players.is_empty() {
        "an unknown squad".to_string()
    } else {
        players.join(", ")
    };

    let _ = write!(
        out,
        "Profit-Taker run #{} by {players} cleared in {}",
        run.run_nr,
        format_duration(run.length())
    );
    if run.best_run {
        out.push_str(" - Best run!");
    } else if run.best_run_yet {
        out.push_str(" - Best run yet!");
    }
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "From elevator to Profit-Taker took {:.3}s. Fight duration: {}.\n",
        run.boss_sighted,
        format_duration(run.fight_duration())
    );

    for phase in &run.phases {
        render_phase(&mut out, phase);
        if phase.phase.number() == 3 && !run.interstitial_shields.is_empty() {
            let extra: Vec<String> = run
                .interstitial_shields
                .iter()
                .map(|shield| shield_name(shield.damage_type))
                .collect();
            let _ = writeln!(out, " Extra shields:   {}", extra.join(" | "));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "> Sum of parts ({})", format_duration(run.sum_of_parts()));
    let _ = writeln!(out, " Shield change:   {:7.3}s", run.shield_sum());
    let _ = writeln!(out, " Leg break:       {:7.3}s", run.leg_sum());
    let _ = writeln!(out, " Body killed:     {:7.3}s", run.body_sum());
    let _ = writeln!(out, " Pylons:          {:7.3}s", run.pylon_sum());
    let _ = writeln!(out, "{RULE}\n");
    out
}

fn render_phase(out: &mut String, phase: &RelativePhase) {
    let _ = writeln!(out, "> Phase {} ({})", phase.phase, format_duration(phase.duration));

    if phase.phase.has_shield_phase() {
        let shields: Vec<String> = phase
            .shields
            .iter()
            .map(|shield| match shield.duration {
                Some(duration) => format!("{} {duration:.3}s", shield_name(shield.damage_type)),
                None => format!("{} ?s", shield_name(shield.damage_type)),
            })
            .collect();
        let sum: f64 = phase.shields.iter().filter_map(|s| s.duration).sum();
        let _ = writeln!(out, " Shield change:   {sum:7.3}s - {}", shields.join(" | "));
    }

    let legs: Vec<String> = phase
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| {
            if i < REGULAR_LEGS {
                format!("{leg:.3}s")
            } else {
                format!("{leg:.3}s (respawn)")
            }
        })
        .collect();
    let leg_sum: f64 = phase.legs.iter().sum();
    let _ = writeln!(out, " Leg break:       {leg_sum:7.3}s - {}", legs.join(" | "));
    let _ = writeln!(out, " Body killed:     {:7.3}s", phase.body);

    if let Some(pylon) = phase.pylon {
        let _ = writeln!(out, " Pylons:          {pylon:7.3}s");
    }
}

fn shield_name(damage_type: Option<DamageType>) -> String {
    damage_type
        .map(|d| d.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Live hint in follow mode, printed as soon as a run's first shield breaks
pub fn render_first_shield(run_nr: u32, shield: &ShieldEvent) -> String {
    format!(
        "Run #{run_nr}: first shield was {}\n",
        shield_name(shield.damage_type)
    )
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Best run:               {} (run #{})",
        format_duration(summary.best_length),
        summary.best_run_nr
    );
    let _ = writeln!(out, "Median time:            {}", format_duration(summary.median_length));
    let _ = writeln!(
        out,
        "Median fight duration:  {}\n",
        format_duration(summary.median_fight_duration)
    );
    let _ = writeln!(
        out,
        "Median sum of parts ({})",
        format_duration(summary.median_sum_of_parts)
    );
    let _ = writeln!(out, " Median shield change:  {:7.3}s", summary.median_shield_sum);
    let _ = writeln!(out, " Median leg break:      {:7.3}s", summary.median_leg_sum);
    let _ = writeln!(out, " Median body killed:    {:7.3}s", summary.median_body_sum);
    let _ = writeln!(out, " Median pylons:         {:7.3}s", summary.median_pylon_sum);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::markers::MarkerTable;
    use crate::models::AbortCause;
    use crate::parser::tests::LogBuilder;

    #[test]
    fn durations_switch_to_minutes_past_sixty_seconds() {
        assert_eq!(format_duration(59.5), "59.500s");
        assert_eq!(format_duration(83.456), "1m 23.456s");
        assert_eq!(format_duration(600.0), "10m 0.000s");
    }

    #[test]
    fn completed_run_lists_every_phase() {
        let outcomes = Analyzer::new(MarkerTable::default())
            .analyze_log(LogBuilder::new().intro().full_fight().lines().into_iter());
        let text = render_report(&SessionReport::new("EE.log", outcomes));

        assert!(text.contains("Profit-Taker run #1 by Iterniam, ReVoltage cleared in"));
        assert!(text.contains("Best run!"));
        for phase in ["> Phase 1", "> Phase 2", "> Phase 3", "> Phase 4"] {
            assert!(text.contains(phase), "missing {phase}");
        }
        assert!(text.contains("Extra shields:   Heat\n"));
        assert!(text.contains("Median time:"));
    }

    #[test]
    fn aborted_run_shows_cause_and_estimate() {
        let mut run = AbsoluteRun::new(4);
        run.heist_start = Some(10.0);
        run.final_time = Some(130.0);
        let text = render_outcome(&RunOutcome::Aborted(AbortedRun {
            run,
            cause: AbortCause::HostMigration,
            require_heist_start: true,
        }));

        assert!(text.starts_with("Profit-Taker run #4 was aborted: a host migration happened."));
        assert!(text.contains("about 2m 0.000s"));
    }

    #[test]
    fn bugged_run_lists_reasons() {
        let text = render_outcome(&RunOutcome::Bugged(BuggedRun {
            run: AbsoluteRun::new(2),
            reasons: vec!["Phase 4 recorded no shield element.".to_string()],
        }));

        assert!(text.contains("run #2 was bugged"));
        assert!(text.contains("  Phase 4 recorded no shield element.\n"));
        assert!(!text.contains("about"));
    }

    #[test]
    fn first_shield_hint_names_the_element() {
        let shield = ShieldEvent {
            damage_type: Some(DamageType::Cold),
            time: 1500.0,
        };
        assert_eq!(render_first_shield(3, &shield), "Run #3: first shield was Cold\n");

        let unknown = ShieldEvent {
            damage_type: None,
            time: 1500.0,
        };
        assert_eq!(render_first_shield(1, &unknown), "Run #1: first shield was Unknown\n");
    }

    #[test]
    fn empty_report_explains_hosting() {
        let text = render_report(&SessionReport::new("EE.log", Vec::new()));
        assert!(text.starts_with("No Profit-Taker runs found."));
    }
}
