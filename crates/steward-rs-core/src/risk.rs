//! Destructive-intent detection for turn reasoning.
//!
//! The orchestrator consults a classifier after every turn; a match routes
//! the job through the approval gate exactly as an explicit
//! `requires_approval` flag would. The classifier is a trait so deployments
//! can swap detection logic without touching orchestrator code.

use regex::RegexBuilder;
use steward_rs_protocol::TurnResult;

/// A matched risk rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskMatch {
    /// Name of the rule that fired.
    pub rule: &'static str,
    /// The pattern text that matched.
    pub pattern: &'static str,
}

/// Classifier consulted once per turn for destructive intent.
pub trait RiskClassifier: Send + Sync {
    /// Return the first matching rule, if the turn looks high-risk.
    fn assess(&self, turn: &TurnResult) -> Option<RiskMatch>;
}

/// Fixed rule set: rule label plus case-insensitive whole-word patterns.
const RULES: &[(&str, &[&str])] = &[
    (
        "destruction",
        &["delete", "remove", "permanently", "irreversible"],
    ),
    (
        "payment",
        &[
            "pay",
            "purchase",
            "send payment",
            "checkout",
            "place order",
            "confirm order",
        ],
    ),
    ("submission", &["submit"]),
];

/// Keyword classifier over the turn reasoning text.
pub struct KeywordRiskClassifier {
    rules: Vec<(&'static str, &'static str, regex::Regex)>,
}

impl Default for KeywordRiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordRiskClassifier {
    /// Compile the fixed rule set.
    pub fn new() -> Self {
        let mut rules = Vec::new();
        for (name, patterns) in RULES {
            for pattern in *patterns {
                let regex = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(pattern)))
                    .case_insensitive(true)
                    .build()
                    .expect("static rule pattern compiles");
                rules.push((*name, *pattern, regex));
            }
        }
        Self { rules }
    }
}

impl RiskClassifier for KeywordRiskClassifier {
    fn assess(&self, turn: &TurnResult) -> Option<RiskMatch> {
        self.rules
            .iter()
            .find(|(_, _, regex)| regex.is_match(&turn.reasoning))
            .map(|(rule, pattern, _)| RiskMatch { rule, pattern })
    }
}

/// Classifier that never matches; useful for unattended test runs.
pub struct NoRiskClassifier;

impl RiskClassifier for NoRiskClassifier {
    fn assess(&self, _turn: &TurnResult) -> Option<RiskMatch> {
        None
    }
}
