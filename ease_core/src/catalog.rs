//! Default catalog of guided programs.
//!
//! This module provides the built-in programs consumed by the session runtime.

use crate::phases::MAX_REPETITIONS;
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The set of programs a controller can start, keyed by program id
#[derive(Clone, Debug, Default)]
pub struct SessionCatalog {
    pub programs: HashMap<String, SessionProgram>,
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<SessionCatalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static SessionCatalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with the built-in programs
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> SessionCatalog {
    build_default_catalog_internal()
}

fn stretch(
    name: &str,
    instructions: &str,
    repetitions: i32,
    hold: Option<i32>,
) -> ExerciseDefinition {
    ExerciseDefinition {
        name: name.into(),
        kind: ExerciseKind::Stretch,
        instructions: instructions.into(),
        repetitions,
        hold_seconds: hold,
        duration_seconds: None,
        warmup: false,
        rest_seconds: None,
        icon: None,
    }
}

fn timed(
    kind: ExerciseKind,
    name: &str,
    instructions: &str,
    repetitions: i32,
    seconds: i32,
) -> ExerciseDefinition {
    ExerciseDefinition {
        name: name.into(),
        kind,
        instructions: instructions.into(),
        repetitions,
        hold_seconds: None,
        duration_seconds: Some(seconds),
        warmup: false,
        rest_seconds: None,
        icon: None,
    }
}

fn build_default_catalog_internal() -> SessionCatalog {
    let mut catalog = SessionCatalog::default();

    // ========================================================================
    // Beginner Pain Relief
    // ========================================================================

    catalog.insert(SessionProgram {
        id: "beginner-pain-relief".into(),
        name: "Beginner Pain Relief".into(),
        description: "Gentle exercises for pain relief beginners".into(),
        duration_minutes: 15,
        difficulty: Difficulty::Beginner,
        exercises: vec![
            ExerciseDefinition {
                warmup: true,
                icon: Some("rotate".into()),
                ..stretch(
                    "Neck Gentle Rolls",
                    "Slowly roll your head in a circle, pausing at tight spots",
                    3,
                    Some(15),
                )
            },
            ExerciseDefinition {
                icon: Some("flexed_biceps".into()),
                ..timed(
                    ExerciseKind::Strength,
                    "Shoulder Blade Squeezes",
                    "Squeeze shoulder blades together, hold, then release",
                    8,
                    10,
                )
            },
            ExerciseDefinition {
                duration_seconds: Some(20),
                icon: Some("cat".into()),
                ..stretch(
                    "Cat-Cow Stretch",
                    "On hands and knees, arch and round your back gently",
                    5,
                    None,
                )
            },
        ],
    });

    // ========================================================================
    // Back Pain Relief
    // ========================================================================

    catalog.insert(SessionProgram {
        id: "back-pain-relief".into(),
        name: "Back Pain Relief".into(),
        description: "Targeted exercises for lower back pain".into(),
        duration_minutes: 20,
        difficulty: Difficulty::Intermediate,
        exercises: vec![
            ExerciseDefinition {
                warmup: true,
                icon: Some("leg".into()),
                ..stretch(
                    "Knee to Chest",
                    "Lying down, pull one knee to chest, feel lower back stretch",
                    4,
                    Some(30),
                )
            },
            ExerciseDefinition {
                icon: Some("rotate".into()),
                ..timed(
                    ExerciseKind::Strength,
                    "Pelvic Tilts",
                    "Tighten abs and tilt pelvis to flatten back against floor",
                    10,
                    15,
                )
            },
            ExerciseDefinition {
                icon: Some("lotus".into()),
                ..stretch(
                    "Child's Pose",
                    "Kneel and sit back on heels, reach arms forward",
                    2,
                    Some(45),
                )
            },
        ],
    });

    // ========================================================================
    // Arthritis Mobility
    // ========================================================================

    catalog.insert(SessionProgram {
        id: "arthritis-mobility".into(),
        name: "Arthritis Mobility".into(),
        description: "Joint-friendly exercises for arthritis management".into(),
        duration_minutes: 25,
        difficulty: Difficulty::Beginner,
        exercises: vec![
            ExerciseDefinition {
                warmup: true,
                icon: Some("hand".into()),
                ..timed(
                    ExerciseKind::Mobility,
                    "Finger Exercises",
                    "Make fists, then spread fingers wide. Move each finger individually",
                    10,
                    30,
                )
            },
            ExerciseDefinition {
                icon: Some("footprints".into()),
                ..timed(
                    ExerciseKind::Mobility,
                    "Ankle Circles",
                    "Seated, lift one foot and rotate ankle slowly in both directions",
                    8,
                    20,
                )
            },
            ExerciseDefinition {
                icon: Some("lotus".into()),
                ..stretch(
                    "Gentle Yoga Flow",
                    "Slow, gentle movements focusing on range of motion",
                    3,
                    Some(40),
                )
            },
        ],
    });

    catalog
}

impl SessionCatalog {
    /// Add or replace a program
    pub fn insert(&mut self, program: SessionProgram) {
        self.programs.insert(program.id.clone(), program);
    }

    pub fn program(&self, id: &str) -> Option<&SessionProgram> {
        self.programs.get(id)
    }

    /// Programs sorted by id for stable listings
    pub fn list(&self) -> Vec<&SessionProgram> {
        let mut programs: Vec<_> = self.programs.values().collect();
        programs.sort_by(|a, b| a.id.cmp(&b.id));
        programs
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid. The
    /// runtime itself tolerates everything reported here.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, program) in &self.programs {
            if id.is_empty() || program.id.is_empty() {
                errors.push("Program has empty ID".to_string());
            }
            if id != &program.id {
                errors.push(format!(
                    "Program key '{}' doesn't match program.id '{}'",
                    id, program.id
                ));
            }
            if program.name.is_empty() {
                errors.push(format!("Program '{}' has empty name", id));
            }
            if program.exercises.is_empty() {
                errors.push(format!("Program '{}' has no exercises", id));
            }

            for exercise in &program.exercises {
                if exercise.name.is_empty() {
                    errors.push(format!("Program '{}' has an exercise with empty name", id));
                }
                if exercise.repetitions <= 0 {
                    errors.push(format!(
                        "Program '{}': '{}' has {} repetitions",
                        id, exercise.name, exercise.repetitions
                    ));
                } else if exercise.repetitions as u32 > MAX_REPETITIONS {
                    errors.push(format!(
                        "Program '{}': '{}' has {} repetitions (max {})",
                        id, exercise.name, exercise.repetitions, MAX_REPETITIONS
                    ));
                }

                let durations = [
                    ("hold", exercise.hold_seconds),
                    ("duration", exercise.duration_seconds),
                    ("rest", exercise.rest_seconds),
                ];
                for (label, value) in durations {
                    if let Some(seconds) = value {
                        if seconds <= 0 {
                            errors.push(format!(
                                "Program '{}': '{}' has non-positive {} of {}s",
                                id, exercise.name, label, seconds
                            ));
                        }
                    }
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.program("beginner-pain-relief").is_some());
        assert!(catalog.program("back-pain-relief").is_some());
        assert!(catalog.program("arthritis-mobility").is_some());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        let cached = get_default_catalog();
        let built = build_default_catalog();
        assert_eq!(cached.len(), built.len());
        for program in built.list() {
            assert_eq!(cached.program(&program.id), Some(program));
        }
    }

    #[test]
    fn test_list_is_sorted() {
        let catalog = build_default_catalog();
        let ids: Vec<_> = catalog.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["arthritis-mobility", "back-pain-relief", "beginner-pain-relief"]
        );
    }

    #[test]
    fn test_validate_reports_malformed_programs() {
        let mut catalog = SessionCatalog::default();
        let mut broken = stretch("Broken", "", 0, Some(-1));
        broken.rest_seconds = Some(0);
        let endless = stretch("Endless", "", i32::MAX, None);
        catalog.insert(SessionProgram {
            id: "broken".into(),
            name: String::new(),
            description: String::new(),
            duration_minutes: 0,
            difficulty: Difficulty::Advanced,
            exercises: vec![broken, endless],
        });
        catalog.insert(SessionProgram {
            id: "empty".into(),
            name: "Empty".into(),
            description: String::new(),
            duration_minutes: 0,
            difficulty: Difficulty::Beginner,
            exercises: vec![],
        });

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("'broken' has empty name")));
        assert!(errors.iter().any(|e| e.contains("0 repetitions")));
        assert!(errors
            .iter()
            .any(|e| e.contains("'Endless' has 2147483647 repetitions (max 100)")));
        assert!(errors.iter().any(|e| e.contains("non-positive hold")));
        assert!(errors.iter().any(|e| e.contains("non-positive rest")));
        assert!(errors.iter().any(|e| e.contains("'empty' has no exercises")));
    }

    #[test]
    fn test_programs_deserialize_from_json() {
        let json = r#"{
            "id": "custom",
            "name": "Custom",
            "description": "From a file",
            "duration_minutes": 5,
            "difficulty": "beginner",
            "exercises": [
                {"name": "Reach", "kind": "balance", "instructions": "Stand tall", "repetitions": 2}
            ]
        }"#;
        let program: SessionProgram = serde_json::from_str(json).unwrap();
        assert_eq!(program.exercises[0].kind, ExerciseKind::Balance);
        assert!(!program.exercises[0].warmup);
        assert_eq!(program.exercises[0].hold_seconds, None);
    }
}
