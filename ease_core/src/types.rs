//! Core domain types for the PainEase guided-session system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise definitions and the programs that sequence them
//! - Phase steps derived from an exercise during guidance
//! - Run identifiers, metrics and achievements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Kind of exercise; drives phase generation and the calorie estimate
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Stretch,
    Strength,
    Cardio,
    Mobility,
    Balance,
}

impl ExerciseKind {
    /// Metabolic equivalent used for the calorie estimate
    pub fn metabolic_factor(self) -> f64 {
        match self {
            ExerciseKind::Stretch => 2.5,
            ExerciseKind::Strength => 3.5,
            ExerciseKind::Cardio => 5.0,
            ExerciseKind::Balance => 2.0,
            ExerciseKind::Mobility => 2.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::Stretch => "stretch",
            ExerciseKind::Strength => "strength",
            ExerciseKind::Cardio => "cardio",
            ExerciseKind::Mobility => "mobility",
            ExerciseKind::Balance => "balance",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single exercise within a program (e.g., "Knee to Chest")
///
/// Durations are signed so that malformed catalog data still loads;
/// negative values are treated as zero when steps are generated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDefinition {
    pub name: String,
    pub kind: ExerciseKind,
    pub instructions: String,
    pub repetitions: i32,
    /// Per-repetition hold time for stretches
    #[serde(default)]
    pub hold_seconds: Option<i32>,
    /// Per-repetition active time for strength, cardio and mobility work
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub warmup: bool,
    /// Rest between repetitions; falls back to the kind's default
    #[serde(default)]
    pub rest_seconds: Option<i32>,
    #[serde(default)]
    pub icon: Option<String>,
}

// ============================================================================
// Program Types
// ============================================================================

/// Difficulty label shown next to a program
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        };
        f.write_str(label)
    }
}

/// A guided program: an ordered sequence of exercises
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionProgram {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub difficulty: Difficulty,
    pub exercises: Vec<ExerciseDefinition>,
}

// ============================================================================
// Phase Steps
// ============================================================================

/// Phase a step belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Preparation,
    Warmup,
    Hold,
    Active,
    Rest,
    Transition,
    Cooldown,
}

/// Breathing cue attached to a step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BreathingPattern {
    Slow,
    Deep,
    Normal,
    Controlled,
    Rhythmic,
    Recovery,
    Relaxation,
}

/// One timed sub-instruction derived from an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhaseStep {
    pub kind: PhaseKind,
    pub instruction: String,
    pub duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breathing: Option<BreathingPattern>,
}

impl PhaseStep {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_seconds))
    }
}

// ============================================================================
// Runs, Metrics and Achievements
// ============================================================================

/// Identifier of one traversal of a program
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metrics accumulated over a run
///
/// Times are milliseconds on the runtime's clock.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionMetrics {
    pub start_time_ms: u64,
    pub end_time_ms: Option<u64>,
    pub total_duration_ms: u64,
    pub exercises_completed: u32,
    pub calories_estimate: f64,
    pub pain_reduction_estimate: u32,
}

impl SessionMetrics {
    pub fn started_at(clock: Duration) -> Self {
        Self {
            start_time_ms: millis(clock),
            ..Self::default()
        }
    }

    /// Stamp the end time and derive the total duration
    pub fn finish(&mut self, clock: Duration) {
        let end = millis(clock);
        self.end_time_ms = Some(end);
        self.total_duration_ms = end.saturating_sub(self.start_time_ms);
    }

    pub fn total_minutes(&self) -> f64 {
        self.total_duration_ms as f64 / 60_000.0
    }
}

fn millis(clock: Duration) -> u64 {
    u64::try_from(clock.as_millis()).unwrap_or(u64::MAX)
}

/// Reward tier chosen at natural completion
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    PainWarrior,
    StrongProgress,
    GoodStart,
    KeepGoing,
}

/// Achievement payload carried by `sessionCompleted`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Achievement {
    pub tier: AchievementTier,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: u32,
}
