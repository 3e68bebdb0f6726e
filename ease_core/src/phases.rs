//! Phase-step generation.
//!
//! Steps are a pure function of an exercise definition and the step timing:
//! preparation, optional warm-up, one work step per repetition with rests in
//! between, then a cool-down.

use crate::config::RuntimeConfig;
use crate::{BreathingPattern, ExerciseDefinition, ExerciseKind, PhaseKind, PhaseStep};

/// Upper bound on repetitions per exercise; larger counts are clamped
pub const MAX_REPETITIONS: u32 = 100;

/// Clamp a signed catalog duration, falling back to `default` when absent
fn seconds_or(value: Option<i32>, default: u32) -> u32 {
    value.map_or(default, |s| u32::try_from(s).unwrap_or(0))
}

/// Number of repetitions, treating non-positive counts as zero
pub fn repetitions(exercise: &ExerciseDefinition) -> u32 {
    u32::try_from(exercise.repetitions)
        .unwrap_or(0)
        .min(MAX_REPETITIONS)
}

/// Seconds of work in a single repetition
pub fn rep_seconds(exercise: &ExerciseDefinition, timing: &RuntimeConfig) -> u32 {
    match exercise.kind {
        ExerciseKind::Stretch => seconds_or(exercise.hold_seconds, timing.stretch_hold_seconds),
        ExerciseKind::Strength => {
            seconds_or(exercise.duration_seconds, timing.strength_active_seconds)
        }
        ExerciseKind::Cardio => seconds_or(exercise.duration_seconds, timing.cardio_active_seconds),
        ExerciseKind::Mobility | ExerciseKind::Balance => {
            seconds_or(exercise.duration_seconds, timing.mobility_active_seconds)
        }
    }
}

/// Seconds of rest between two repetitions
pub fn rest_seconds(exercise: &ExerciseDefinition, timing: &RuntimeConfig) -> u32 {
    let default = match exercise.kind {
        ExerciseKind::Stretch => timing.stretch_rest_seconds,
        ExerciseKind::Strength => timing.strength_rest_seconds,
        ExerciseKind::Cardio => timing.cardio_rest_seconds,
        ExerciseKind::Mobility | ExerciseKind::Balance => timing.mobility_rest_seconds,
    };
    seconds_or(exercise.rest_seconds, default)
}

/// Total work seconds across all repetitions
pub fn active_seconds(exercise: &ExerciseDefinition, timing: &RuntimeConfig) -> u32 {
    rep_seconds(exercise, timing).saturating_mul(repetitions(exercise))
}

fn work_step(exercise: &ExerciseDefinition, rep: u32, total: u32, seconds: u32) -> PhaseStep {
    let (kind, instruction, breathing) = match exercise.kind {
        ExerciseKind::Stretch => (
            PhaseKind::Hold,
            format!(
                "Hold the stretch. Feel gentle tension, breathe deeply. Rep {}/{}",
                rep, total
            ),
            BreathingPattern::Deep,
        ),
        ExerciseKind::Strength => (
            PhaseKind::Active,
            format!(
                "Perform the movement slowly and controlled. Rep {}/{}",
                rep, total
            ),
            BreathingPattern::Controlled,
        ),
        ExerciseKind::Cardio => (
            PhaseKind::Active,
            format!(
                "Maintain steady rhythm. Keep effort at 6-7/10. Set {}/{}",
                rep, total
            ),
            BreathingPattern::Rhythmic,
        ),
        ExerciseKind::Mobility | ExerciseKind::Balance => (
            PhaseKind::Active,
            format!(
                "Move through the full comfortable range, slowly. Rep {}/{}",
                rep, total
            ),
            BreathingPattern::Controlled,
        ),
    };

    PhaseStep {
        kind,
        instruction,
        duration_seconds: seconds,
        breathing: Some(breathing),
    }
}

fn rest_step(exercise: &ExerciseDefinition, seconds: u32) -> PhaseStep {
    let (instruction, breathing) = match exercise.kind {
        ExerciseKind::Stretch => ("Relax and breathe normally", BreathingPattern::Normal),
        ExerciseKind::Strength => ("Rest between repetitions", BreathingPattern::Recovery),
        ExerciseKind::Cardio => (
            "Active recovery - keep moving gently",
            BreathingPattern::Recovery,
        ),
        ExerciseKind::Mobility | ExerciseKind::Balance => {
            ("Pause and let the joint settle", BreathingPattern::Normal)
        }
    };

    PhaseStep {
        kind: PhaseKind::Rest,
        instruction: instruction.to_string(),
        duration_seconds: seconds,
        breathing: Some(breathing),
    }
}

/// Derive the full step list for one exercise
pub fn generate_steps(exercise: &ExerciseDefinition, timing: &RuntimeConfig) -> Vec<PhaseStep> {
    let reps = repetitions(exercise);
    let work = rep_seconds(exercise, timing);
    let rest = rest_seconds(exercise, timing);

    let mut steps = Vec::with_capacity(3 + 2 * reps as usize);

    steps.push(PhaseStep {
        kind: PhaseKind::Preparation,
        instruction: format!("Prepare for {}. {}", exercise.name, exercise.instructions),
        duration_seconds: timing.preparation_seconds,
        breathing: None,
    });

    if exercise.warmup {
        steps.push(PhaseStep {
            kind: PhaseKind::Warmup,
            instruction: "Gentle warm-up movements. Move slowly and breathe deeply.".into(),
            duration_seconds: timing.warmup_seconds,
            breathing: Some(BreathingPattern::Slow),
        });
    }

    for rep in 1..=reps {
        steps.push(work_step(exercise, rep, reps, work));
        if rep < reps {
            steps.push(rest_step(exercise, rest));
        }
    }

    steps.push(PhaseStep {
        kind: PhaseKind::Cooldown,
        instruction: "Cool down with gentle movements. Well done!".into(),
        duration_seconds: timing.cooldown_seconds,
        breathing: Some(BreathingPattern::Relaxation),
    });

    steps
}

/// Pseudo-step announced between two exercises
pub fn transition_step(timing: &RuntimeConfig) -> PhaseStep {
    PhaseStep {
        kind: PhaseKind::Transition,
        instruction: "Preparing for next exercise...".into(),
        duration_seconds: timing.transition_seconds,
        breathing: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(kind: ExerciseKind, reps: i32) -> ExerciseDefinition {
        ExerciseDefinition {
            name: "Test Move".into(),
            kind,
            instructions: "Move gently".into(),
            repetitions: reps,
            hold_seconds: None,
            duration_seconds: None,
            warmup: false,
            rest_seconds: None,
            icon: None,
        }
    }

    fn kinds(steps: &[PhaseStep]) -> Vec<PhaseKind> {
        steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_stretch_with_warmup() {
        let mut ex = exercise(ExerciseKind::Stretch, 3);
        ex.warmup = true;
        ex.hold_seconds = Some(15);

        let steps = generate_steps(&ex, &RuntimeConfig::default());

        assert_eq!(
            kinds(&steps),
            vec![
                PhaseKind::Preparation,
                PhaseKind::Warmup,
                PhaseKind::Hold,
                PhaseKind::Rest,
                PhaseKind::Hold,
                PhaseKind::Rest,
                PhaseKind::Hold,
                PhaseKind::Cooldown,
            ]
        );
        assert_eq!(steps[0].duration_seconds, 10);
        assert_eq!(steps[1].duration_seconds, 30);
        assert_eq!(steps[2].duration_seconds, 15);
        assert_eq!(steps[3].duration_seconds, 10);
        assert_eq!(steps[3].breathing, Some(BreathingPattern::Normal));
        assert_eq!(steps[7].duration_seconds, 20);
        assert!(steps[0].instruction.starts_with("Prepare for Test Move."));
        assert!(steps[6].instruction.ends_with("Rep 3/3"));
    }

    #[test]
    fn test_strength_rests_use_recovery_breathing() {
        let mut ex = exercise(ExerciseKind::Strength, 2);
        ex.duration_seconds = Some(12);

        let steps = generate_steps(&ex, &RuntimeConfig::default());

        assert_eq!(
            kinds(&steps),
            vec![
                PhaseKind::Preparation,
                PhaseKind::Active,
                PhaseKind::Rest,
                PhaseKind::Active,
                PhaseKind::Cooldown,
            ]
        );
        assert_eq!(steps[1].duration_seconds, 12);
        assert_eq!(steps[2].duration_seconds, 15);
        assert_eq!(steps[2].breathing, Some(BreathingPattern::Recovery));
    }

    #[test]
    fn test_cardio_defaults() {
        let ex = exercise(ExerciseKind::Cardio, 2);
        let steps = generate_steps(&ex, &RuntimeConfig::default());

        assert_eq!(steps[1].duration_seconds, 60);
        assert_eq!(steps[1].breathing, Some(BreathingPattern::Rhythmic));
        assert_eq!(steps[2].duration_seconds, 30);
        assert_eq!(steps[2].breathing, Some(BreathingPattern::Recovery));
    }

    #[test]
    fn test_explicit_rest_overrides_default() {
        let mut ex = exercise(ExerciseKind::Strength, 2);
        ex.rest_seconds = Some(4);

        let steps = generate_steps(&ex, &RuntimeConfig::default());
        assert_eq!(steps[2].kind, PhaseKind::Rest);
        assert_eq!(steps[2].duration_seconds, 4);
    }

    #[test]
    fn test_mobility_gets_active_reps() {
        let ex = exercise(ExerciseKind::Mobility, 2);
        let steps = generate_steps(&ex, &RuntimeConfig::default());

        assert_eq!(
            kinds(&steps),
            vec![
                PhaseKind::Preparation,
                PhaseKind::Active,
                PhaseKind::Rest,
                PhaseKind::Active,
                PhaseKind::Cooldown,
            ]
        );
    }

    #[test]
    fn test_zero_reps_and_negative_durations() {
        let ex = exercise(ExerciseKind::Stretch, 0);
        let steps = generate_steps(&ex, &RuntimeConfig::default());
        assert_eq!(kinds(&steps), vec![PhaseKind::Preparation, PhaseKind::Cooldown]);

        let mut ex = exercise(ExerciseKind::Strength, -3);
        ex.duration_seconds = Some(-5);
        assert_eq!(generate_steps(&ex, &RuntimeConfig::default()).len(), 2);

        let mut ex = exercise(ExerciseKind::Strength, 1);
        ex.duration_seconds = Some(-5);
        let steps = generate_steps(&ex, &RuntimeConfig::default());
        assert_eq!(steps[1].duration_seconds, 0);
    }

    #[test]
    fn test_active_seconds_multiplies_reps() {
        let mut ex = exercise(ExerciseKind::Strength, 8);
        ex.duration_seconds = Some(10);
        assert_eq!(active_seconds(&ex, &RuntimeConfig::default()), 80);
    }

    #[test]
    fn test_huge_repetition_count_is_clamped() {
        let ex = exercise(ExerciseKind::Strength, i32::MAX);
        let timing = RuntimeConfig::default();
        assert_eq!(repetitions(&ex), MAX_REPETITIONS);

        let steps = generate_steps(&ex, &timing);
        let work = steps.iter().filter(|s| s.kind == PhaseKind::Active).count();
        assert_eq!(work, MAX_REPETITIONS as usize);
        assert_eq!(steps.len(), 2 + 2 * MAX_REPETITIONS as usize - 1);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut ex = exercise(ExerciseKind::Stretch, 4);
        ex.warmup = true;
        let timing = RuntimeConfig::default();
        assert_eq!(generate_steps(&ex, &timing), generate_steps(&ex, &timing));
    }
}
