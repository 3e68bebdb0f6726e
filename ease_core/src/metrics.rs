//! End-of-run estimates: calories, pain reduction and achievements.
//!
//! These are illustrative heuristics, not physiological models.

use crate::config::RuntimeConfig;
use crate::phases;
use crate::{Achievement, AchievementTier, ExerciseDefinition, ExerciseKind, SessionProgram};
use std::collections::HashSet;

/// Largest pain-reduction estimate (percent)
pub const MAX_PAIN_REDUCTION: u32 = 25;

/// Minutes a full run must last to earn the top tier
pub const FULL_SESSION_MINUTES: f64 = 20.0;

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calories burned by one completed exercise
///
/// `metabolic_factor × body_weight_kg × active_hours`, rounded to two decimals.
pub fn exercise_calories(exercise: &ExerciseDefinition, timing: &RuntimeConfig) -> f64 {
    let active_hours = f64::from(phases::active_seconds(exercise, timing)) / 3600.0;
    round2(exercise.kind.metabolic_factor() * timing.body_weight_kg * active_hours)
}

/// Fraction of the program's exercises that were completed
pub fn completion_rate(completed: u32, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / total as f64
    }
}

/// Estimated pain reduction in percent
///
/// `min(25, round(rate × 15 + (distinct_kinds − 1) × 2))`, never negative.
pub fn pain_reduction(completed: u32, program: &SessionProgram) -> u32 {
    let rate = completion_rate(completed, program.exercises.len());
    let distinct: HashSet<ExerciseKind> = program.exercises.iter().map(|e| e.kind).collect();
    let variety_bonus = (distinct.len() as f64 - 1.0) * 2.0;

    let estimate = (rate * 15.0 + variety_bonus).round();
    estimate.clamp(0.0, f64::from(MAX_PAIN_REDUCTION)) as u32
}

impl AchievementTier {
    /// Pick the tier for a finished run
    pub fn for_run(completion_rate: f64, total_minutes: f64) -> Self {
        if completion_rate >= 1.0 && total_minutes >= FULL_SESSION_MINUTES {
            AchievementTier::PainWarrior
        } else if completion_rate >= 0.8 {
            AchievementTier::StrongProgress
        } else if completion_rate >= 0.5 {
            AchievementTier::GoodStart
        } else {
            AchievementTier::KeepGoing
        }
    }

    pub fn achievement(self) -> Achievement {
        let (title, description, icon, points) = match self {
            AchievementTier::PainWarrior => (
                "Pain Warrior!",
                "Completed a full exercise session",
                "trophy",
                100,
            ),
            AchievementTier::StrongProgress => (
                "Strong Progress",
                "Great effort in your session",
                "flexed_biceps",
                75,
            ),
            AchievementTier::GoodStart => ("Good Start", "Every step counts!", "thumbs_up", 50),
            AchievementTier::KeepGoing => (
                "Keep Going",
                "You made an effort - that matters!",
                "star",
                25,
            ),
        };

        Achievement {
            tier: self,
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Difficulty;

    fn exercise(kind: ExerciseKind) -> ExerciseDefinition {
        ExerciseDefinition {
            name: "Move".into(),
            kind,
            instructions: String::new(),
            repetitions: 1,
            hold_seconds: None,
            duration_seconds: None,
            warmup: false,
            rest_seconds: None,
            icon: None,
        }
    }

    fn program(kinds: &[ExerciseKind]) -> SessionProgram {
        SessionProgram {
            id: "p".into(),
            name: "P".into(),
            description: String::new(),
            duration_minutes: 10,
            difficulty: Difficulty::Beginner,
            exercises: kinds.iter().map(|k| exercise(*k)).collect(),
        }
    }

    #[test]
    fn test_strength_calories() {
        let mut ex = exercise(ExerciseKind::Strength);
        ex.duration_seconds = Some(20);

        let calories = exercise_calories(&ex, &RuntimeConfig::default());
        assert_eq!(calories, 1.36);
    }

    #[test]
    fn test_calories_scale_with_repetitions() {
        let mut ex = exercise(ExerciseKind::Cardio);
        ex.duration_seconds = Some(60);
        ex.repetitions = 3;

        // 5.0 × 70 × (180 / 3600)
        assert_eq!(exercise_calories(&ex, &RuntimeConfig::default()), 17.5);
    }

    #[test]
    fn test_pain_reduction_with_variety() {
        let program = program(&[
            ExerciseKind::Stretch,
            ExerciseKind::Strength,
            ExerciseKind::Stretch,
            ExerciseKind::Strength,
        ]);
        assert_eq!(pain_reduction(4, &program), 17);
    }

    #[test]
    fn test_pain_reduction_is_capped() {
        let program = program(&[
            ExerciseKind::Stretch,
            ExerciseKind::Strength,
            ExerciseKind::Cardio,
            ExerciseKind::Mobility,
            ExerciseKind::Balance,
        ]);
        // 15 + 8 = 23, under the cap
        assert_eq!(pain_reduction(5, &program), 23);

        let mut program = program;
        program.exercises.push(exercise(ExerciseKind::Balance));
        assert!(pain_reduction(6, &program) <= MAX_PAIN_REDUCTION);
    }

    #[test]
    fn test_pain_reduction_empty_program() {
        assert_eq!(pain_reduction(0, &program(&[])), 0);
    }

    #[test]
    fn test_partial_completion() {
        let program = program(&[ExerciseKind::Stretch, ExerciseKind::Stretch]);
        // round(0.5 × 15 + 0) = round(7.5) = 8
        assert_eq!(pain_reduction(1, &program), 8);
    }

    #[test]
    fn test_achievement_tiers() {
        assert_eq!(AchievementTier::for_run(1.0, 25.0), AchievementTier::PainWarrior);
        assert_eq!(AchievementTier::for_run(1.0, 10.0), AchievementTier::StrongProgress);
        assert_eq!(AchievementTier::for_run(0.8, 30.0), AchievementTier::StrongProgress);
        assert_eq!(AchievementTier::for_run(0.5, 30.0), AchievementTier::GoodStart);
        assert_eq!(AchievementTier::for_run(0.2, 30.0), AchievementTier::KeepGoing);
        assert_eq!(AchievementTier::for_run(0.0, 0.0), AchievementTier::KeepGoing);
    }

    #[test]
    fn test_achievement_payload() {
        let top = AchievementTier::PainWarrior.achievement();
        assert_eq!(top.title, "Pain Warrior!");
        assert_eq!(top.points, 100);

        let points: Vec<u32> = [
            AchievementTier::PainWarrior,
            AchievementTier::StrongProgress,
            AchievementTier::GoodStart,
            AchievementTier::KeepGoing,
        ]
        .iter()
        .map(|t| t.achievement().points)
        .collect();
        assert_eq!(points, vec![100, 75, 50, 25]);
    }
}
