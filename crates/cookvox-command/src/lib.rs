//! Stateless text-pattern classification of finalized utterances.
//!
//! Classification is fixed-vocabulary matching: anything the local patterns
//! cannot place lands in [`VoiceCommand::Query`] and is left to the dialogue
//! backend, which is the fallback resolver. Parse failures are never fatal.

pub mod duration;
pub mod numbers;
pub mod parser;

pub use duration::parse_duration_phrase;
pub use parser::classify;

use std::time::Duration;

/// Produced per utterance and consumed immediately; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVoiceCommand {
    pub command: VoiceCommand,
    pub raw_text: String,
    /// Advisory only. Pattern matches always win over confidence; no
    /// threshold gates execution.
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceCommand {
    Timer {
        action: TimerAction,
        duration: Option<Duration>,
    },
    Navigation(NavigationAction),
    Scaling(ScalingAction),
    /// Unclassified input, forwarded verbatim as a free-form question.
    Query { question: String },
}

impl VoiceCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            VoiceCommand::Timer { .. } => "timer",
            VoiceCommand::Navigation(_) => "navigation",
            VoiceCommand::Scaling(_) => "scaling",
            VoiceCommand::Query { .. } => "query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    NextStep,
    PreviousStep,
    /// Target step as spoken, 1-based ("step 3" -> 3). Callers convert to a
    /// zero-based instruction index at dispatch.
    GoToStep { step: usize },
    RepeatStep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingAction {
    Multiplier(f64),
    Servings(u32),
}
