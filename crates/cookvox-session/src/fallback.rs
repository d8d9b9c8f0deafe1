//! Local command dispatch.
//!
//! Step navigation, timers, and scaling are handled by the cook-mode
//! screen's own handlers and need no AI inference, so they keep working
//! when the dialogue backend is unreachable.

use std::time::Duration;

use cookvox_command::{NavigationAction, ScalingAction, TimerAction, VoiceCommand};

/// Functions the hosting cook-mode screen already exposes. The dispatcher
/// calls straight into these; it owns no recipe state of its own.
pub trait CookModeActions: Send {
    fn next_step(&mut self);
    fn previous_step(&mut self);
    /// `step` is a zero-based instruction index.
    fn go_to_step(&mut self, step: usize);
    fn repeat_step(&mut self);
    fn start_timer(&mut self, duration: Option<Duration>);
    fn stop_timer(&mut self);
    fn scale_to_multiplier(&mut self, multiplier: f64);
    fn scale_to_servings(&mut self, servings: u32);
}

/// Execute a command against the screen's handlers. Returns `false` for
/// queries, which need the dialogue backend.
pub fn dispatch_local(command: &VoiceCommand, actions: &mut dyn CookModeActions) -> bool {
    match command {
        VoiceCommand::Timer { action, duration } => {
            match action {
                TimerAction::Start => actions.start_timer(*duration),
                TimerAction::Stop => actions.stop_timer(),
            }
            true
        }
        VoiceCommand::Navigation(nav) => {
            match nav {
                NavigationAction::NextStep => actions.next_step(),
                NavigationAction::PreviousStep => actions.previous_step(),
                // Spoken steps are 1-based ("step 3"), instruction indexes
                // zero-based.
                NavigationAction::GoToStep { step } => {
                    actions.go_to_step(step.saturating_sub(1))
                }
                NavigationAction::RepeatStep => actions.repeat_step(),
            }
            true
        }
        VoiceCommand::Scaling(scale) => {
            match scale {
                ScalingAction::Multiplier(m) => actions.scale_to_multiplier(*m),
                ScalingAction::Servings(n) => actions.scale_to_servings(*n),
            }
            true
        }
        VoiceCommand::Query { .. } => false,
    }
}

/// Test double recording every call, for assertions in session tests.
#[derive(Debug, Default)]
pub struct RecordingActions {
    pub calls: Vec<String>,
}

impl CookModeActions for RecordingActions {
    fn next_step(&mut self) {
        self.calls.push("next_step".into());
    }

    fn previous_step(&mut self) {
        self.calls.push("previous_step".into());
    }

    fn go_to_step(&mut self, step: usize) {
        self.calls.push(format!("go_to_step({step})"));
    }

    fn repeat_step(&mut self) {
        self.calls.push("repeat_step".into());
    }

    fn start_timer(&mut self, duration: Option<Duration>) {
        self.calls
            .push(format!("start_timer({:?})", duration.map(|d| d.as_secs())));
    }

    fn stop_timer(&mut self) {
        self.calls.push("stop_timer".into());
    }

    fn scale_to_multiplier(&mut self, multiplier: f64) {
        self.calls.push(format!("scale_to_multiplier({multiplier})"));
    }

    fn scale_to_servings(&mut self, servings: u32) {
        self.calls.push(format!("scale_to_servings({servings})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookvox_command::classify;

    #[test]
    fn navigation_and_timers_dispatch_locally() {
        let mut actions = RecordingActions::default();

        assert!(dispatch_local(&classify("next step").command, &mut actions));
        assert!(dispatch_local(
            &classify("go to step 3").command,
            &mut actions
        ));
        assert!(dispatch_local(
            &classify("set a timer for 10 minutes").command,
            &mut actions
        ));

        assert_eq!(
            actions.calls,
            vec!["next_step", "go_to_step(2)", "start_timer(Some(600))"]
        );
    }

    #[test]
    fn scaling_dispatches_to_screen_handlers() {
        let mut actions = RecordingActions::default();
        assert!(dispatch_local(
            &classify("double the recipe").command,
            &mut actions
        ));
        assert!(dispatch_local(
            &classify("make it for six people").command,
            &mut actions
        ));
        assert_eq!(
            actions.calls,
            vec!["scale_to_multiplier(2)", "scale_to_servings(6)"]
        );
    }

    #[test]
    fn queries_are_not_local() {
        let mut actions = RecordingActions::default();
        assert!(!dispatch_local(
            &classify("what can I use instead of cream").command,
            &mut actions
        ));
        assert!(actions.calls.is_empty());
    }
}
