//! Guided session runtime.
//!
//! Drives one program at a time through its exercises and their phase
//! steps. Progress is made only by timers on the runtime's own clock, which
//! the host moves forward with [`SessionRuntime::advance`]. Every state
//! change is reported through the event bus.
//!
//! Resuming restarts the current exercise from its first step; time spent
//! inside the interrupted step is not banked.

use crate::catalog::SessionCatalog;
use crate::config::RuntimeConfig;
use crate::events::{EventBus, EventKind, ListenerId, SessionEvent};
use crate::timer::{TimerId, Timers};
use crate::{metrics, phases};
use crate::{AchievementTier, PhaseStep, RunId, SessionMetrics, SessionProgram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuntimeTask {
    NextStep,
    NextExercise,
}

/// Mutable state of the active run
#[derive(Debug)]
struct ActiveRun {
    id: RunId,
    program: Arc<SessionProgram>,
    exercise_index: usize,
    steps: Vec<PhaseStep>,
    step_index: usize,
    /// False while the transition between two exercises is pending
    exercise_started: bool,
    paused: bool,
    metrics: SessionMetrics,
    pending: Option<TimerId>,
}

/// Snapshot returned by [`SessionRuntime::status`]
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SessionStatus {
    pub running: bool,
    pub paused: bool,
    pub run_id: Option<RunId>,
    pub program_id: Option<String>,
    pub current_exercise_index: usize,
    pub current_step_index: Option<usize>,
    pub metrics: SessionMetrics,
}

/// State machine for guided exercise programs
#[derive(Debug)]
pub struct SessionRuntime {
    timing: RuntimeConfig,
    timers: Timers<RuntimeTask>,
    run: Option<ActiveRun>,
    last_metrics: SessionMetrics,
    events: EventBus,
}

impl Default for SessionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRuntime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(timing: RuntimeConfig) -> Self {
        Self {
            timing,
            timers: Timers::new(),
            run: None,
            last_metrics: SessionMetrics::default(),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.timing
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn subscribe_to<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        self.events.subscribe_to(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Drop every listener, e.g. when the view observing the run goes away
    pub fn remove_all_listeners(&mut self) {
        self.events.clear();
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Current position of the runtime clock
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// When the next step is due, if anything is scheduled
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Move the clock forward, firing every step that falls due
    pub fn advance(&mut self, elapsed: Duration) {
        let until = self.timers.now().saturating_add(elapsed);
        while let Some((id, task)) = self.timers.pop_due(until) {
            if let Some(run) = self.run.as_mut() {
                if run.pending == Some(id) {
                    run.pending = None;
                }
            }
            self.fire(task);
        }
        self.timers.finish(until);
    }

    /// Advance straight to the next deadline; returns false when idle
    pub fn advance_to_next(&mut self) -> bool {
        match self.next_deadline() {
            Some(deadline) => {
                let elapsed = deadline.saturating_sub(self.now());
                self.advance(elapsed);
                true
            }
            None => false,
        }
    }

    fn fire(&mut self, task: RuntimeTask) {
        match task {
            RuntimeTask::NextStep => {
                if let Some(run) = self.run.as_mut() {
                    run.step_index += 1;
                }
                self.run_step();
            }
            RuntimeTask::NextExercise => self.start_next_exercise(),
        }
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Begin a run, stopping any run already in progress
    pub fn start_session(&mut self, program: impl Into<Arc<SessionProgram>>) -> RunId {
        if self.run.is_some() {
            tracing::info!("Starting a new session; stopping the active one");
            self.stop_session();
        }

        let program = program.into();
        let id = RunId::new();
        tracing::info!(
            run = %id,
            program = %program.id,
            exercises = program.exercises.len(),
            "Session started"
        );

        self.run = Some(ActiveRun {
            id,
            program: Arc::clone(&program),
            exercise_index: 0,
            steps: Vec::new(),
            step_index: 0,
            exercise_started: false,
            paused: false,
            metrics: SessionMetrics::started_at(self.timers.now()),
            pending: None,
        });

        self.events
            .emit(&SessionEvent::SessionStarted { run_id: id, program });
        self.start_next_exercise();
        id
    }

    /// Look a program up by id and start it
    pub fn start_program(&mut self, catalog: &SessionCatalog, program_id: &str) -> Option<RunId> {
        match catalog.program(program_id) {
            Some(program) => Some(self.start_session(program.clone())),
            None => {
                tracing::warn!("Unknown program id: {}", program_id);
                None
            }
        }
    }

    /// Suspend step advancement; no-op unless running and not paused
    pub fn pause_session(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.paused {
            return;
        }

        run.paused = true;
        if let Some(id) = run.pending.take() {
            self.timers.cancel(id);
        }
        tracing::info!(run = %run.id, step = run.step_index, "Session paused");
        self.events.emit(&SessionEvent::SessionPaused);
    }

    /// Continue a paused run from the first step of the current exercise
    pub fn resume_session(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if !run.paused {
            return;
        }

        run.paused = false;
        let exercise_started = run.exercise_started;
        tracing::info!(run = %run.id, exercise = run.exercise_index, "Session resumed");
        self.events.emit(&SessionEvent::SessionResumed);

        if exercise_started {
            self.begin_guidance();
        } else {
            // Paused during the transition: the next exercise hasn't begun yet
            self.start_next_exercise();
        }
    }

    /// End the run early; no-op unless running
    pub fn stop_session(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };

        if let Some(id) = run.pending.take() {
            self.timers.cancel(id);
        }
        self.timers.clear();

        run.metrics.finish(self.timers.now());
        tracing::info!(
            run = %run.id,
            completed = run.metrics.exercises_completed,
            "Session stopped"
        );

        self.last_metrics = run.metrics.clone();
        self.events.emit(&SessionEvent::SessionStopped {
            metrics: run.metrics,
        });
    }

    pub fn status(&self) -> SessionStatus {
        match &self.run {
            Some(run) => SessionStatus {
                running: true,
                paused: run.paused,
                run_id: Some(run.id),
                program_id: Some(run.program.id.clone()),
                current_exercise_index: run.exercise_index,
                current_step_index: run.exercise_started.then_some(run.step_index),
                metrics: run.metrics.clone(),
            },
            None => SessionStatus {
                running: false,
                paused: false,
                run_id: None,
                program_id: None,
                current_exercise_index: 0,
                current_step_index: None,
                metrics: self.last_metrics.clone(),
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    // ------------------------------------------------------------------
    // Phase advancement
    // ------------------------------------------------------------------

    fn start_next_exercise(&mut self) {
        let event = {
            let Some(run) = self.run.as_mut() else {
                return;
            };
            let total = run.program.exercises.len();
            let Some(exercise) = run.program.exercises.get(run.exercise_index) else {
                self.complete_session();
                return;
            };

            run.exercise_started = true;
            tracing::debug!(index = run.exercise_index, name = %exercise.name, "Exercise started");
            SessionEvent::ExerciseStarted {
                exercise: exercise.clone(),
                index: run.exercise_index,
                total,
            }
        };

        self.events.emit(&event);
        self.begin_guidance();
    }

    /// Derive the current exercise's steps and run the first one
    fn begin_guidance(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(exercise) = run.program.exercises.get(run.exercise_index) else {
            return;
        };

        run.steps = phases::generate_steps(exercise, &self.timing);
        run.step_index = 0;
        self.run_step();
    }

    fn run_step(&mut self) {
        let event = {
            let Some(run) = self.run.as_mut() else {
                return;
            };
            if run.paused {
                return;
            }

            let Some(step) = run.steps.get(run.step_index) else {
                self.complete_current_exercise();
                return;
            };

            let delay = step.duration();
            let event = SessionEvent::ExerciseStep {
                step: step.clone(),
                step_index: Some(run.step_index),
                total_steps: run.steps.len(),
                exercise: run.program.exercises.get(run.exercise_index).cloned(),
            };
            tracing::debug!(
                step = run.step_index,
                kind = ?step.kind,
                seconds = step.duration_seconds,
                "Exercise step"
            );

            run.pending = Some(self.timers.schedule(delay, RuntimeTask::NextStep));
            event
        };

        self.events.emit(&event);
    }

    fn complete_current_exercise(&mut self) {
        let (completed, has_next) = {
            let Some(run) = self.run.as_mut() else {
                return;
            };
            let Some(exercise) = run.program.exercises.get(run.exercise_index) else {
                return;
            };

            run.metrics.exercises_completed += 1;
            run.metrics.calories_estimate = metrics::round2(
                run.metrics.calories_estimate + metrics::exercise_calories(exercise, &self.timing),
            );

            let completed = SessionEvent::ExerciseCompleted {
                exercise: exercise.clone(),
                index: run.exercise_index,
                metrics: run.metrics.clone(),
            };

            run.exercise_index += 1;
            run.exercise_started = false;
            run.steps.clear();
            run.step_index = 0;
            (completed, run.exercise_index < run.program.exercises.len())
        };

        self.events.emit(&completed);

        if has_next {
            let step = phases::transition_step(&self.timing);
            let delay = step.duration();
            if let Some(run) = self.run.as_mut() {
                run.pending = Some(self.timers.schedule(delay, RuntimeTask::NextExercise));
            }
            self.events.emit(&SessionEvent::ExerciseStep {
                step,
                step_index: None,
                total_steps: 1,
                exercise: None,
            });
        } else {
            self.complete_session();
        }
    }

    fn complete_session(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };
        if let Some(id) = run.pending.take() {
            self.timers.cancel(id);
        }

        run.metrics.finish(self.timers.now());
        run.metrics.pain_reduction_estimate =
            metrics::pain_reduction(run.metrics.exercises_completed, &run.program);

        let rate = metrics::completion_rate(
            run.metrics.exercises_completed,
            run.program.exercises.len(),
        );
        let achievement = AchievementTier::for_run(rate, run.metrics.total_minutes()).achievement();

        tracing::info!(
            run = %run.id,
            completed = run.metrics.exercises_completed,
            pain_reduction = run.metrics.pain_reduction_estimate,
            achievement = %achievement.title,
            "Session completed"
        );

        self.last_metrics = run.metrics.clone();
        self.events.emit(&SessionEvent::SessionCompleted {
            program: run.program,
            metrics: run.metrics,
            achievement,
        });
    }
}
