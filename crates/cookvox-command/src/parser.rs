//! Fixed-vocabulary utterance classification.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::duration::parse_duration_phrase;
use crate::numbers::parse_small_number;
use crate::{NavigationAction, ParsedVoiceCommand, ScalingAction, TimerAction, VoiceCommand};

// Confidence is advisory (see DESIGN.md): a pattern match always wins, so
// these are fixed per path rather than computed.
const MATCHED: f32 = 0.9;
const FALLBACK: f32 = 0.3;

static WHATS_NEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwhat(?:'?s| is)\s+next\b").expect("whats-next regex"));

static QUESTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:what|how|why|when|where|which|who|can|could|should|would|will|is|are|does|do|did|tell me|explain)\b",
    )
    .expect("question-start regex")
});

static TIMER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:timer|countdown)\b").expect("timer regex"));

static TIMER_STOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:stop|cancel|end|kill|turn off|pause)\b").expect("timer-stop regex")
});

static NAV_NEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bnext\s+step\b|^\s*(?:ok(?:ay)?,?\s*)?next\s*[.!]?\s*$|\bmove\s+on\b|\bkeep\s+going\b|\bcontinue\b)")
        .expect("nav-next regex")
});

static NAV_PREV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bprevious\s+step\b|\bgo\s+back\b|\bback\s+up\b|^\s*back\s*[.!]?\s*$|\blast\s+step\b|\bstep\s+back\b)")
        .expect("nav-prev regex")
});

static NAV_REPEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\brepeat\b|\bsay\s+(?:that|it)\s+again\b|\bread\s+(?:that|it)\s+again\b|\bone\s+more\s+time\b)")
        .expect("nav-repeat regex")
});

static NAV_GOTO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:go|jump|skip|move|take\s+me)\s+(?:back\s+)?to\s+step\s+(?P<n>\d+|[a-z]+)\b")
        .expect("nav-goto regex")
});

static BARE_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bstep\s+(?P<n>\d+|[a-z]+)\b").expect("bare-step regex"));

static SCALE_DOUBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?P<verb>double|triple)\b.{0,24}\b(?:recipe|it|everything|ingredients|batch|quantities)\b")
        .expect("scale-double regex")
});

static SCALE_HALVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:halve|half)\b.{0,24}\b(?:recipe|it|everything|ingredients|batch|quantities)\b|\bcut\s+(?:it|the\s+recipe)\s+in\s+half\b)")
        .expect("scale-halve regex")
});

static SCALE_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bscale\b.{0,24}\b(?:by|to)\s+(?P<n>\d+(?:\.\d+)?)\s*(?:x|times)?\b")
        .expect("scale-by regex")
});

static SERVINGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:for|serves?)\s+(?P<n>\d+|[a-z]+)\s+(?:people|persons|servings|guests)\b")
        .expect("servings regex")
});

/// Classify a finalized utterance into exactly one command.
///
/// Ambiguous or unparseable input defaults to [`VoiceCommand::Query`]; the
/// dialogue backend is the fallback resolver for anything the local patterns
/// cannot place confidently.
pub fn classify(text: &str) -> ParsedVoiceCommand {
    let raw_text = text.trim().to_string();

    let command = classify_inner(&raw_text);
    let confidence = match &command {
        VoiceCommand::Query { .. } => FALLBACK,
        _ => MATCHED,
    };

    tracing::debug!(target: "command", kind = command.kind(), confidence, "classified utterance");
    ParsedVoiceCommand {
        command,
        raw_text,
        confidence,
    }
}

fn classify_inner(text: &str) -> VoiceCommand {
    // "what's next" reads as a question but is step navigation.
    if WHATS_NEXT.is_match(text) {
        return VoiceCommand::Navigation(NavigationAction::NextStep);
    }

    // Question-shaped input goes to the assistant, even when it mentions a
    // step or a quantity ("how long is step 3", "should I double it").
    if QUESTION_START.is_match(text) {
        return query(text);
    }

    if TIMER.is_match(text) {
        let action = if TIMER_STOP.is_match(text) {
            TimerAction::Stop
        } else {
            TimerAction::Start
        };
        return VoiceCommand::Timer {
            action,
            duration: parse_duration_phrase(text),
        };
    }

    if NAV_GOTO.is_match(text) {
        if let Some(step) = NAV_GOTO
            .captures(text)
            .and_then(|c| parse_small_number(&c["n"]))
        {
            return VoiceCommand::Navigation(NavigationAction::GoToStep {
                step: step as usize,
            });
        }
    }
    if NAV_PREV.is_match(text) {
        return VoiceCommand::Navigation(NavigationAction::PreviousStep);
    }
    if NAV_NEXT.is_match(text) {
        return VoiceCommand::Navigation(NavigationAction::NextStep);
    }
    if NAV_REPEAT.is_match(text) {
        return VoiceCommand::Navigation(NavigationAction::RepeatStep);
    }

    if let Some(caps) = SCALE_DOUBLE.captures(text) {
        let factor = if caps["verb"].eq_ignore_ascii_case("triple") {
            3.0
        } else {
            2.0
        };
        return VoiceCommand::Scaling(ScalingAction::Multiplier(factor));
    }
    if SCALE_HALVE.is_match(text) {
        return VoiceCommand::Scaling(ScalingAction::Multiplier(0.5));
    }
    if let Some(caps) = SCALE_BY.captures(text) {
        if let Ok(factor) = caps["n"].parse::<f64>() {
            if factor > 0.0 {
                return VoiceCommand::Scaling(ScalingAction::Multiplier(factor));
            }
        }
    }
    if let Some(caps) = SERVINGS.captures(text) {
        if let Some(n) = parse_small_number(&caps["n"]) {
            if n > 0 {
                return VoiceCommand::Scaling(ScalingAction::Servings(n));
            }
        }
    }

    // Bare "step 3" with no verb still navigates.
    if let Some(caps) = BARE_STEP.captures(text) {
        if let Some(step) = parse_small_number(&caps["n"]) {
            return VoiceCommand::Navigation(NavigationAction::GoToStep {
                step: step as usize,
            });
        }
    }

    query(text)
}

fn query(text: &str) -> VoiceCommand {
    VoiceCommand::Query {
        question: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timer_with_duration() {
        let parsed = classify("set a timer for 10 minutes");
        assert_eq!(
            parsed.command,
            VoiceCommand::Timer {
                action: TimerAction::Start,
                duration: Some(Duration::from_secs(600)),
            }
        );
        assert!(parsed.confidence > 0.5);
    }

    #[test]
    fn timer_stop_and_bare_start() {
        assert_eq!(
            classify("stop the timer").command,
            VoiceCommand::Timer {
                action: TimerAction::Stop,
                duration: None,
            }
        );
        assert_eq!(
            classify("start a timer").command,
            VoiceCommand::Timer {
                action: TimerAction::Start,
                duration: None,
            }
        );
    }

    #[test]
    fn navigation_forms() {
        assert_eq!(
            classify("next step").command,
            VoiceCommand::Navigation(NavigationAction::NextStep)
        );
        assert_eq!(
            classify("what's next").command,
            VoiceCommand::Navigation(NavigationAction::NextStep)
        );
        assert_eq!(
            classify("go back").command,
            VoiceCommand::Navigation(NavigationAction::PreviousStep)
        );
        assert_eq!(
            classify("go to step 3").command,
            VoiceCommand::Navigation(NavigationAction::GoToStep { step: 3 })
        );
        assert_eq!(
            classify("step three").command,
            VoiceCommand::Navigation(NavigationAction::GoToStep { step: 3 })
        );
        assert_eq!(
            classify("say that again").command,
            VoiceCommand::Navigation(NavigationAction::RepeatStep)
        );
    }

    #[test]
    fn scaling_forms() {
        assert_eq!(
            classify("double the recipe").command,
            VoiceCommand::Scaling(ScalingAction::Multiplier(2.0))
        );
        assert_eq!(
            classify("triple the batch").command,
            VoiceCommand::Scaling(ScalingAction::Multiplier(3.0))
        );
        assert_eq!(
            classify("cut the recipe in half").command,
            VoiceCommand::Scaling(ScalingAction::Multiplier(0.5))
        );
        assert_eq!(
            classify("make it for six people").command,
            VoiceCommand::Scaling(ScalingAction::Servings(6))
        );
        assert_eq!(
            classify("scale it by 1.5").command,
            VoiceCommand::Scaling(ScalingAction::Multiplier(1.5))
        );
    }

    #[test]
    fn questions_go_to_the_assistant_even_when_they_mention_steps() {
        assert!(matches!(
            classify("how long is step 3").command,
            VoiceCommand::Query { .. }
        ));
        assert!(matches!(
            classify("should I double the recipe").command,
            VoiceCommand::Query { .. }
        ));
        assert!(matches!(
            classify("what can I substitute for butter").command,
            VoiceCommand::Query { .. }
        ));
    }

    #[test]
    fn unparseable_input_falls_back_to_query_never_fails() {
        let parsed = classify("mmm that smells amazing");
        assert_eq!(
            parsed.command,
            VoiceCommand::Query {
                question: "mmm that smells amazing".into(),
            }
        );
        assert!(parsed.confidence < 0.5);
    }

    #[test]
    fn spoken_and_typed_durations_parse_identically() {
        let spoken = classify("set a timer for ten minutes");
        let typed = classify("set a timer for 10 minutes");
        assert_eq!(spoken.command, typed.command);
    }
}
