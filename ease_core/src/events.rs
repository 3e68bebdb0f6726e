//! Lifecycle events emitted by the session runtime, and the listener registry.

use crate::{Achievement, ExerciseDefinition, PhaseStep, RunId, SessionMetrics, SessionProgram};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Event emitted while a run progresses
///
/// Serializes with an `event` tag carrying the lifecycle name
/// (`sessionStarted`, `exerciseStep`, ...).
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    SessionStarted {
        run_id: RunId,
        program: Arc<SessionProgram>,
    },
    ExerciseStarted {
        exercise: ExerciseDefinition,
        index: usize,
        total: usize,
    },
    /// `step_index` is `None` for the transition pseudo-step between exercises
    ExerciseStep {
        step: PhaseStep,
        step_index: Option<usize>,
        total_steps: usize,
        exercise: Option<ExerciseDefinition>,
    },
    ExerciseCompleted {
        exercise: ExerciseDefinition,
        index: usize,
        metrics: SessionMetrics,
    },
    SessionPaused,
    SessionResumed,
    SessionStopped {
        metrics: SessionMetrics,
    },
    SessionCompleted {
        program: Arc<SessionProgram>,
        metrics: SessionMetrics,
        achievement: Achievement,
    },
}

/// Name-only view of an event, used to filter subscriptions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionStarted,
    ExerciseStarted,
    ExerciseStep,
    ExerciseCompleted,
    SessionPaused,
    SessionResumed,
    SessionStopped,
    SessionCompleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionStarted => "sessionStarted",
            EventKind::ExerciseStarted => "exerciseStarted",
            EventKind::ExerciseStep => "exerciseStep",
            EventKind::ExerciseCompleted => "exerciseCompleted",
            EventKind::SessionPaused => "sessionPaused",
            EventKind::SessionResumed => "sessionResumed",
            EventKind::SessionStopped => "sessionStopped",
            EventKind::SessionCompleted => "sessionCompleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::SessionStarted { .. } => EventKind::SessionStarted,
            SessionEvent::ExerciseStarted { .. } => EventKind::ExerciseStarted,
            SessionEvent::ExerciseStep { .. } => EventKind::ExerciseStep,
            SessionEvent::ExerciseCompleted { .. } => EventKind::ExerciseCompleted,
            SessionEvent::SessionPaused => EventKind::SessionPaused,
            SessionEvent::SessionResumed => EventKind::SessionResumed,
            SessionEvent::SessionStopped { .. } => EventKind::SessionStopped,
            SessionEvent::SessionCompleted { .. } => EventKind::SessionCompleted,
        }
    }

    /// True for the two events that end a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionStopped { .. } | SessionEvent::SessionCompleted { .. }
        )
    }
}

/// Handle returned by a subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SessionEvent)>;

struct Subscription {
    id: ListenerId,
    filter: Option<EventKind>,
    listener: Listener,
}

/// Ordered set of listeners
///
/// Listeners run synchronously in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        self.add(None, Box::new(listener))
    }

    /// Listen to one kind of event
    pub fn subscribe_to<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        self.add(Some(kind), Box::new(listener))
    }

    fn add(&mut self, filter: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            filter,
            listener,
        });
        id
    }

    /// Remove one listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn emit(&mut self, event: &SessionEvent) {
        let kind = event.kind();
        tracing::trace!(event = kind.as_str(), "emit");
        for sub in &mut self.subscriptions {
            if sub.filter.map_or(true, |f| f == kind) {
                (sub.listener)(event);
            }
        }
    }
}
