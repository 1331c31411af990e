//! Additional unit tests for lifecycle state machine transitions

use rivestack_provider::controller::{
    LifecycleEvent, ResourcePhase, ResourceStateMachine, TransitionResult,
};

const ALL_PHASES: [ResourcePhase; 4] = [
    ResourcePhase::Absent,
    ResourcePhase::Creating,
    ResourcePhase::Present,
    ResourcePhase::Deleting,
];

fn target(phase: ResourcePhase, event: LifecycleEvent) -> Option<ResourcePhase> {
    match ResourceStateMachine::new().transition(&phase, event) {
        TransitionResult::Success { to, .. } => Some(to),
        TransitionResult::InvalidTransition { .. } => None,
    }
}

mod apply_path_tests {
    use super::*;

    #[test]
    fn test_create_path() {
        let creating = target(ResourcePhase::Absent, LifecycleEvent::CreateRequested).unwrap();
        assert_eq!(creating, ResourcePhase::Creating);
        assert_eq!(
            target(creating, LifecycleEvent::CreateSucceeded),
            Some(ResourcePhase::Present)
        );
    }

    #[test]
    fn test_replace_path() {
        let deleting = target(ResourcePhase::Present, LifecycleEvent::DeleteRequested).unwrap();
        let absent = target(deleting, LifecycleEvent::DeleteSucceeded).unwrap();
        assert_eq!(absent, ResourcePhase::Absent);
        assert_eq!(
            target(absent, LifecycleEvent::CreateRequested),
            Some(ResourcePhase::Creating)
        );
    }

    #[test]
    fn test_failed_delete_keeps_entity_tracked() {
        assert_eq!(
            target(ResourcePhase::Deleting, LifecycleEvent::DeleteFailed),
            Some(ResourcePhase::Present)
        );
    }

    #[test]
    fn test_update_and_refresh_stay_present() {
        assert_eq!(
            target(ResourcePhase::Present, LifecycleEvent::Updated),
            Some(ResourcePhase::Present)
        );
        assert_eq!(
            target(ResourcePhase::Present, LifecycleEvent::Refreshed),
            Some(ResourcePhase::Present)
        );
    }
}

mod invalid_transition_tests {
    use super::*;

    #[test]
    fn test_cannot_delete_absent_entity() {
        assert!(target(ResourcePhase::Absent, LifecycleEvent::DeleteRequested).is_none());
    }

    #[test]
    fn test_cannot_update_while_creating() {
        assert!(target(ResourcePhase::Creating, LifecycleEvent::Updated).is_none());
    }

    #[test]
    fn test_import_only_from_absent() {
        for phase in ALL_PHASES {
            let allowed =
                ResourceStateMachine::new().can_transition(&phase, &LifecycleEvent::Imported);
            assert_eq!(allowed, phase == ResourcePhase::Absent, "phase {}", phase);
        }
    }

    #[test]
    fn test_invalid_result_echoes_input() {
        let result = ResourceStateMachine::new()
            .transition(&ResourcePhase::Deleting, LifecycleEvent::Refreshed);
        assert!(matches!(
            result,
            TransitionResult::InvalidTransition {
                current: ResourcePhase::Deleting,
                event: LifecycleEvent::Refreshed,
            }
        ));
    }
}

mod valid_events_tests {
    use super::*;

    #[test]
    fn test_every_phase_has_an_exit() {
        let sm = ResourceStateMachine::new();
        for phase in ALL_PHASES {
            assert!(!sm.valid_events(&phase).is_empty(), "phase {} is a dead end", phase);
        }
    }

    #[test]
    fn test_absent_events() {
        let events = ResourceStateMachine::new().valid_events(&ResourcePhase::Absent);
        assert_eq!(
            events,
            vec![LifecycleEvent::CreateRequested, LifecycleEvent::Imported]
        );
    }

    #[test]
    fn test_valid_events_agree_with_can_transition() {
        let sm = ResourceStateMachine::new();
        for phase in ALL_PHASES {
            for event in sm.valid_events(&phase) {
                assert!(sm.can_transition(&phase, &event));
            }
        }
    }
}
