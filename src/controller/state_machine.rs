//! Finite state machine for the lifecycle of a managed resource
//!
//! Every resource instance moves through `Absent → Creating → Present →
//! Deleting → Absent`. Import and refresh are the only ways to enter or leave
//! `Present` without a remote mutation. The orchestrator consults the
//! transition table before each step so an out-of-order call is rejected
//! rather than sent to the remote API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a resource instance
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourcePhase {
    /// No remote entity is tracked
    #[default]
    Absent,
    /// Create call issued, waiting for it to settle
    Creating,
    /// Remote entity exists and is tracked in state
    Present,
    /// Delete call issued, waiting for it to settle
    Deleting,
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePhase::Absent => write!(f, "Absent"),
            ResourcePhase::Creating => write!(f, "Creating"),
            ResourcePhase::Present => write!(f, "Present"),
            ResourcePhase::Deleting => write!(f, "Deleting"),
        }
    }
}

/// Events that trigger lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// A create call is about to be issued
    CreateRequested,
    /// Create call and any follow-up wait completed
    CreateSucceeded,
    /// Create call or its wait failed
    CreateFailed,
    /// An in-place update completed
    Updated,
    /// A read confirmed the entity still exists
    Refreshed,
    /// A read found the entity gone
    Vanished,
    /// A delete call is about to be issued
    DeleteRequested,
    /// Delete call and any follow-up wait completed
    DeleteSucceeded,
    /// Delete call or its wait failed
    DeleteFailed,
    /// State seeded from an externally supplied identifier
    Imported,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::CreateRequested => write!(f, "CreateRequested"),
            LifecycleEvent::CreateSucceeded => write!(f, "CreateSucceeded"),
            LifecycleEvent::CreateFailed => write!(f, "CreateFailed"),
            LifecycleEvent::Updated => write!(f, "Updated"),
            LifecycleEvent::Refreshed => write!(f, "Refreshed"),
            LifecycleEvent::Vanished => write!(f, "Vanished"),
            LifecycleEvent::DeleteRequested => write!(f, "DeleteRequested"),
            LifecycleEvent::DeleteSucceeded => write!(f, "DeleteSucceeded"),
            LifecycleEvent::DeleteFailed => write!(f, "DeleteFailed"),
            LifecycleEvent::Imported => write!(f, "Imported"),
        }
    }
}

/// A state transition definition
#[derive(Debug)]
pub struct Transition {
    pub from: ResourcePhase,
    pub to: ResourcePhase,
    pub event: LifecycleEvent,
    /// Human-readable description of this transition
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: ResourcePhase,
        to: ResourcePhase,
        event: LifecycleEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug, PartialEq, Eq)]
pub enum TransitionResult {
    Success {
        from: ResourcePhase,
        to: ResourcePhase,
        event: LifecycleEvent,
        description: &'static str,
    },
    /// Transition was not valid for current state
    InvalidTransition {
        current: ResourcePhase,
        event: LifecycleEvent,
    },
}

const TRANSITIONS: &[Transition] = &[
    // === Absent ===
    Transition::new(
        ResourcePhase::Absent,
        ResourcePhase::Creating,
        LifecycleEvent::CreateRequested,
        "Creating remote entity",
    ),
    Transition::new(
        ResourcePhase::Absent,
        ResourcePhase::Present,
        LifecycleEvent::Imported,
        "Imported existing remote entity",
    ),
    // === Creating ===
    Transition::new(
        ResourcePhase::Creating,
        ResourcePhase::Present,
        LifecycleEvent::CreateSucceeded,
        "Remote entity created",
    ),
    Transition::new(
        ResourcePhase::Creating,
        ResourcePhase::Absent,
        LifecycleEvent::CreateFailed,
        "Create failed, nothing tracked",
    ),
    // === Present ===
    Transition::new(
        ResourcePhase::Present,
        ResourcePhase::Present,
        LifecycleEvent::Updated,
        "Updated in place",
    ),
    Transition::new(
        ResourcePhase::Present,
        ResourcePhase::Present,
        LifecycleEvent::Refreshed,
        "State refreshed from remote",
    ),
    Transition::new(
        ResourcePhase::Present,
        ResourcePhase::Absent,
        LifecycleEvent::Vanished,
        "Remote entity no longer exists",
    ),
    Transition::new(
        ResourcePhase::Present,
        ResourcePhase::Deleting,
        LifecycleEvent::DeleteRequested,
        "Deleting remote entity",
    ),
    // === Deleting ===
    Transition::new(
        ResourcePhase::Deleting,
        ResourcePhase::Absent,
        LifecycleEvent::DeleteSucceeded,
        "Remote entity deleted",
    ),
    Transition::new(
        ResourcePhase::Deleting,
        ResourcePhase::Present,
        LifecycleEvent::DeleteFailed,
        "Delete failed, entity still tracked",
    ),
];

/// Transition table for resource lifecycles
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceStateMachine;

impl ResourceStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Attempt a transition from the current state
    pub fn transition(&self, current: &ResourcePhase, event: LifecycleEvent) -> TransitionResult {
        match TRANSITIONS
            .iter()
            .find(|t| t.from == *current && t.event == event)
        {
            Some(t) => TransitionResult::Success {
                from: t.from,
                to: t.to,
                event,
                description: t.description,
            },
            None => TransitionResult::InvalidTransition {
                current: *current,
                event,
            },
        }
    }

    /// Check if a transition is valid
    pub fn can_transition(&self, from: &ResourcePhase, event: &LifecycleEvent) -> bool {
        TRANSITIONS
            .iter()
            .any(|t| t.from == *from && t.event == *event)
    }

    /// Get all valid events for a given state
    pub fn valid_events(&self, state: &ResourcePhase) -> Vec<LifecycleEvent> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == *state)
            .map(|t| t.event)
            .collect()
    }
}
