//! Re-expresses a validated run in relative time.
//!
//! A cursor starts at the moment the boss was sighted and walks through the
//! markers in chronological order; most durations are measured from the
//! cursor. The body kill and the pylon phase are measured from their own start.

use crate::models::{RelativePhase, RelativeRun, RelativeShield};
use crate::validate::ValidatedRun;

pub fn to_relative(validated: &ValidatedRun) -> RelativeRun {
    let run = validated.run();
    let heist_start = validated.heist_start();
    let mut previous = validated.boss_sighted();
    let mut phases = Vec::with_capacity(validated.phases().len());

    for phase in validated.phases() {
        let record = run.phase(phase.id);

        // Shield markers only carry the time an element was switched in, so each
        // element lasts until the next switch and the last one until the
        // shield phase ending transmission.
        let mut shields = Vec::with_capacity(record.shields.len());
        if let Some(shield_phase_end) = phase.shield_phase_end {
            for pair in record.shields.windows(2) {
                shields.push(RelativeShield {
                    damage_type: pair[0].damage_type,
                    duration: Some(pair[1].time - previous),
                });
                previous = pair[1].time;
            }
            if let Some(last) = record.shields.last() {
                shields.push(RelativeShield {
                    damage_type: last.damage_type,
                    duration: Some(shield_phase_end - previous),
                });
            }
            previous = shield_phase_end;
        }

        let mut legs = Vec::with_capacity(record.legs.len());
        for &leg in &record.legs {
            legs.push(leg - previous);
            previous = leg;
        }

        let body = phase.body_kill - phase.body_vulnerable;
        previous = phase.body_kill;

        let mut pylon = None;
        if let Some((start, end)) = phase.pylon {
            pylon = Some(end - start);
            previous = end;
        }

        phases.push(RelativePhase {
            phase: phase.id,
            duration: previous - heist_start,
            shields,
            legs,
            body,
            pylon,
        });
    }

    // Spans a sub-phase boundary, so no meaningful duration exists.
    let interstitial_shields = run
        .phase_3_interstitial
        .shields
        .iter()
        .map(|shield| RelativeShield {
            damage_type: shield.damage_type,
            duration: None,
        })
        .collect();

    RelativeRun {
        run_nr: run.run_nr,
        nickname: run.nickname.clone(),
        squad_members: run.squad_members.clone(),
        boss_sighted: validated.boss_sighted() - heist_start,
        phases,
        interstitial_shields,
        best_run: false,
        best_run_yet: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbsoluteRun, DamageType, PhaseId, PhaseRecord, ShieldEvent};
    use crate::validate::check_run_integrity;
    use crate::validate::tests::complete_run;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-6;

    fn convert(run: AbsoluteRun) -> RelativeRun {
        let validated = check_run_integrity(run).expect("run should validate");
        to_relative(&validated)
    }

    #[test]
    fn durations_chain_from_the_previous_marker() {
        let relative = convert(complete_run());

        assert_eq!(relative.boss_sighted, 50.0);
        let phase_1 = relative.phase(PhaseId::Phase1).expect("phase 1");
        // shields at 100, 101, 102; shield phase ends at 105; cursor starts at 50
        let shield_durations: Vec<_> = phase_1.shields.iter().map(|s| s.duration).collect();
        assert_eq!(shield_durations, vec![Some(51.0), Some(1.0), Some(3.0)]);
        // legs at 110..=113
        assert_eq!(phase_1.legs, vec![5.0, 1.0, 1.0, 1.0]);
        assert_eq!(phase_1.body, 5.0);
        assert_eq!(phase_1.pylon, Some(10.0));
        assert_eq!(phase_1.duration, 140.0);

        let phase_2 = relative.phase(PhaseId::Phase2).expect("phase 2");
        assert!(phase_2.shields.is_empty());
        assert_eq!(phase_2.legs[0], 70.0);
        assert_eq!(phase_2.pylon, None);
        assert_eq!(phase_2.duration, 225.0);

        assert_eq!(relative.length(), 425.0);
    }

    #[test]
    fn interstitial_shields_have_no_duration() {
        let mut run = complete_run();
        run.phase_3_interstitial.shields.push(ShieldEvent {
            damage_type: Some(DamageType::Viral),
            time: 335.0,
        });

        let relative = convert(run);
        assert_eq!(relative.interstitial_shields.len(), 1);
        assert_eq!(relative.interstitial_shields[0].duration, None);
        assert_eq!(relative.phase(PhaseId::Phase3).map(|p| p.shields.len()), Some(3));
    }

    #[derive(Debug, Clone)]
    struct PhaseShape {
        shields: usize,
        legs: usize,
    }

    fn phase_shape() -> impl Strategy<Value = PhaseShape> {
        (3usize..6, 4usize..9).prop_map(|(shields, legs)| PhaseShape { shields, legs })
    }

    /// Lay out a run whose markers are strictly increasing in log order.
    fn build_run(shapes: &[PhaseShape], gaps: &[f64]) -> AbsoluteRun {
        let mut gaps = gaps.iter().copied().cycle();
        let mut clock = 1000.0;
        let mut tick = move || {
            clock += gaps.next().unwrap_or(1.0);
            clock
        };

        let mut run = AbsoluteRun::new(1);
        run.heist_start = Some(tick());
        run.boss_sighted = Some(tick());
        for (id, shape) in PhaseId::SEQUENCE.into_iter().zip(shapes) {
            let mut record = PhaseRecord::default();
            if id.has_shield_phase() {
                record.shields = (0..shape.shields)
                    .map(|_| ShieldEvent {
                        damage_type: None,
                        time: tick(),
                    })
                    .collect();
                record.shield_phase_end = Some(tick());
            }
            record.legs = (0..shape.legs).map(|_| tick()).collect();
            record.body_vulnerable = Some(tick());
            record.body_kill = Some(tick());
            if id.has_pylon_phase() {
                record.pylon_start = Some(tick());
                record.pylon_end = Some(tick());
            }
            *run.phase_mut(id) = record;
        }
        run
    }

    proptest! {
        #[test]
        fn relative_times_rebuild_absolute_markers(
            shapes in prop::collection::vec(phase_shape(), 4),
            gaps in prop::collection::vec(0.01f64..30.0, 1..80),
        ) {
            let run = build_run(&shapes, &gaps);
            let relative = convert(run.clone());
            let heist_start = run.heist_start.unwrap_or_default();

            let mut cursor = heist_start + relative.boss_sighted;
            prop_assert!((cursor - run.boss_sighted.unwrap_or_default()).abs() < EPSILON);

            for phase in &relative.phases {
                let record = run.phase(phase.phase);
                for (i, shield) in phase.shields.iter().enumerate() {
                    cursor += shield.duration.unwrap_or_default();
                    let expected = match record.shields.get(i + 1) {
                        Some(next) => next.time,
                        None => record.shield_phase_end.unwrap_or_default(),
                    };
                    prop_assert!((cursor - expected).abs() < EPSILON);
                }
                for (leg, &absolute) in phase.legs.iter().zip(&record.legs) {
                    cursor += leg;
                    prop_assert!((cursor - absolute).abs() < EPSILON);
                }

                cursor = heist_start + phase.duration;
                match (phase.pylon, record.pylon_start, record.pylon_end) {
                    (Some(pylon), Some(start), Some(end)) => {
                        prop_assert!((cursor - end).abs() < EPSILON);
                        prop_assert!((cursor - pylon - start).abs() < EPSILON);
                    }
                    _ => {
                        let kill = record.body_kill.unwrap_or_default();
                        let vulnerable = record.body_vulnerable.unwrap_or_default();
                        prop_assert!((cursor - kill).abs() < EPSILON);
                        prop_assert!((cursor - phase.body - vulnerable).abs() < EPSILON);
                    }
                }
            }
        }

        #[test]
        fn durations_are_non_negative_and_parts_fit_the_run(
            shapes in prop::collection::vec(phase_shape(), 4),
            gaps in prop::collection::vec(0.0f64..30.0, 1..80),
        ) {
            let relative = convert(build_run(&shapes, &gaps));

            let mut last_phase_end = relative.boss_sighted;
            for phase in &relative.phases {
                prop_assert!(phase.duration >= last_phase_end);
                last_phase_end = phase.duration;
                prop_assert!(phase.legs.iter().all(|&leg| leg >= 0.0));
                prop_assert!(phase.shields.iter().filter_map(|s| s.duration).all(|d| d >= 0.0));
                prop_assert!(phase.body >= 0.0);
            }
            prop_assert!(relative.sum_of_parts() <= relative.length() + EPSILON);
        }
    }
}
