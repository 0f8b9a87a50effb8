//! Detection and oversharing rule definitions
//!
//! The full rule set is fixed at process start. Every pattern is
//! validated during compilation; a pattern that fails to compile is
//! dropped with a diagnostic and the session continues with the
//! remaining rules. The regex engine guarantees linear-time matching,
//! so a rule can never hang the pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a detection category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A sensitive-data detection rule.
///
/// Immutable after startup; gated per category by the settings
/// detection toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRule {
    /// Rule identifier
    pub id: String,
    /// Detection category, matched against the settings toggles
    pub category: String,
    /// Regular expression source
    pub pattern: String,
    /// Fixed severity contributed by a match
    pub severity: Severity,
    /// Whether the category ships enabled
    pub enabled_by_default: bool,
}

/// A contextual oversharing rule.
///
/// Always active, never gated by the per-category toggles. Matches are
/// advisory and carry no severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversharingRule {
    /// Rule identifier
    pub id: String,
    /// Advisory category label
    pub category: String,
    /// Regular expression source
    pub pattern: String,
}

fn detection(id: &str, severity: Severity, pattern: &str) -> DetectionRule {
    DetectionRule {
        id: id.to_string(),
        category: id.to_string(),
        pattern: pattern.to_string(),
        severity,
        enabled_by_default: true,
    }
}

/// The fixed detection rule set.
pub fn default_detection_rules() -> Vec<DetectionRule> {
    vec![
        detection(
            "phone",
            Severity::High,
            r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        ),
        detection(
            "email",
            Severity::Medium,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        ),
        detection("ssn", Severity::Critical, r"\b\d{3}-?\d{2}-?\d{4}\b"),
        detection(
            "credit_card",
            Severity::Critical,
            r"\b(?:\d{4}[-\s]?){3}\d{4}\b",
        ),
        detection(
            "address",
            Severity::High,
            r"(?i)\b\d+\s+[A-Za-z\s]+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Place|Pl)\b",
        ),
        detection(
            "atm_pin",
            Severity::Critical,
            r"(?i)\b(?:pin|atm|code).*?\d{4,6}\b",
        ),
        detection(
            "password",
            Severity::Critical,
            r"(?i)\b(?:password|pass|pwd).*?[:\s]+[\w@#$%^&*!]+",
        ),
        detection(
            "personal_keywords",
            Severity::Medium,
            r"(?i)\b(?:home address|phone number|social security|date of birth|dob|mother's maiden name)\b",
        ),
    ]
}

fn oversharing(id: &str, category: &str, pattern: &str) -> OversharingRule {
    OversharingRule {
        id: id.to_string(),
        category: category.to_string(),
        pattern: pattern.to_string(),
    }
}

/// The fixed oversharing rule set.
pub fn default_oversharing_rules() -> Vec<OversharingRule> {
    vec![
        oversharing(
            "location_disclosure",
            "location",
            r"(?i)\b(?:i live at|my address is|i work at|my job is)\b",
        ),
        oversharing(
            "contact_invitation",
            "contact",
            r"(?i)\b(?:my phone number|call me at|text me at)\b",
        ),
        oversharing(
            "birthdate_disclosure",
            "personal",
            r"(?i)\b(?:my birthday is|born on|i was born)\b",
        ),
        oversharing(
            "bank_details",
            "financial",
            r"(?i)\b(?:my bank|account number|routing number)\b",
        ),
        oversharing(
            "mental_health",
            "health",
            r"(?i)\b(?:feeling depressed|having anxiety|mental health)\b",
        ),
        oversharing(
            "home_alone",
            "safety",
            r"(?i)\b(?:home alone|parents away|nobody home)\b",
        ),
        oversharing(
            "away_from_home",
            "travel",
            r"(?i)\b(?:going on vacation|leaving town|house empty)\b",
        ),
        oversharing(
            "income_disclosure",
            "financial",
            r"(?i)\b(?:my salary|how much i make|my income)\b",
        ),
    ]
}

/// A detection rule with its pattern compiled.
#[derive(Debug)]
pub struct CompiledDetectionRule {
    pub id: String,
    pub category: String,
    pub severity: Severity,
    pub regex: Regex,
}

/// An oversharing rule with its pattern compiled.
#[derive(Debug)]
pub struct CompiledOversharingRule {
    pub id: String,
    pub category: String,
    pub regex: Regex,
}

/// The validated, compiled rule set used by the classifier.
#[derive(Debug, Default)]
pub struct RuleSet {
    pub detection: Vec<CompiledDetectionRule>,
    pub oversharing: Vec<CompiledOversharingRule>,
}

impl RuleSet {
    /// Compile the given rules, dropping any whose pattern is invalid.
    ///
    /// Rejected rules are logged and excluded for the session; the
    /// pipeline continues with the remaining rules.
    pub fn compile(detection: &[DetectionRule], oversharing: &[OversharingRule]) -> Self {
        let mut set = Self::default();
        for rule in detection {
            match Regex::new(&rule.pattern) {
                Ok(regex) => set.detection.push(CompiledDetectionRule {
                    id: rule.id.clone(),
                    category: rule.category.clone(),
                    severity: rule.severity,
                    regex,
                }),
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "Dropping invalid detection rule");
                }
            }
        }
        for rule in oversharing {
            match Regex::new(&rule.pattern) {
                Ok(regex) => set.oversharing.push(CompiledOversharingRule {
                    id: rule.id.clone(),
                    category: rule.category.clone(),
                    regex,
                }),
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "Dropping invalid oversharing rule");
                }
            }
        }
        set
    }

    /// Compile the fixed default rule sets.
    pub fn with_defaults() -> Self {
        Self::compile(&default_detection_rules(), &default_oversharing_rules())
    }

    /// Detection categories that no settings toggle can ever enable.
    ///
    /// The settings surface exposes toggles under its own names
    /// ("financial", "personal", ...) while several rules are keyed
    /// differently, so those rules are unreachable through the
    /// documented configuration. The mismatch is inherited behavior and
    /// is surfaced here rather than silently realigned.
    pub fn unreachable_categories(&self, toggles: &HashMap<String, bool>) -> Vec<String> {
        self.detection
            .iter()
            .filter(|r| !toggles.contains_key(&r.category))
            .map(|r| r.category.clone())
            .collect()
    }
}

/// Human-readable label for a detection category.
pub fn category_label(category: &str) -> &'static str {
    match category {
        "phone" => "Phone Number",
        "email" => "Email Address",
        "ssn" => "Social Security Number",
        "credit_card" => "Credit Card Number",
        "address" => "Home Address",
        "atm_pin" => "ATM PIN",
        "password" => "Password",
        "personal_keywords" => "Personal Information",
        _ => "Sensitive Data",
    }
}

/// Safety suggestion shown alongside a detection category.
pub fn category_suggestion(category: &str) -> &'static str {
    match category {
        "phone" => {
            "Consider using a business number or avoiding sharing your personal phone number online."
        }
        "email" => "Use a separate email for public posts, or avoid sharing your primary email address.",
        "ssn" => "Never share your Social Security Number online! This is extremely dangerous.",
        "credit_card" => {
            "Never share credit card numbers! If this is for a purchase, make sure you're on a secure, trusted website."
        }
        "address" => {
            "Sharing your home address can compromise your safety. Consider using general location references instead."
        }
        "atm_pin" => {
            "Never share your ATM PIN anywhere online! Change it immediately if you've already shared it."
        }
        "password" => {
            "Sharing passwords is extremely dangerous. Use unique, strong passwords and never share them."
        }
        "personal_keywords" => "This looks like personal information. Consider if sharing this is necessary.",
        _ => "Be cautious about sharing personal information online.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_detection_toggles;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_default_rules_all_compile() {
        let set = RuleSet::with_defaults();
        assert_eq!(set.detection.len(), default_detection_rules().len());
        assert_eq!(set.oversharing.len(), default_oversharing_rules().len());
    }

    #[test]
    fn test_invalid_pattern_dropped_not_fatal() {
        let rules = vec![
            detection("good", Severity::Low, r"\d+"),
            detection("bad", Severity::Low, r"(unclosed"),
        ];
        let set = RuleSet::compile(&rules, &[]);
        assert_eq!(set.detection.len(), 1);
        assert_eq!(set.detection[0].id, "good");
    }

    #[test]
    fn test_phone_pattern_matches() {
        let set = RuleSet::with_defaults();
        let phone = set
            .detection
            .iter()
            .find(|r| r.category == "phone")
            .unwrap();
        assert!(phone.regex.is_match("call me at 555-123-4567"));
        assert!(phone.regex.is_match("(555) 123 4567"));
        assert!(!phone.regex.is_match("no digits here"));
    }

    #[test]
    fn test_address_pattern_matches() {
        let set = RuleSet::with_defaults();
        let address = set
            .detection
            .iter()
            .find(|r| r.category == "address")
            .unwrap();
        assert!(address.regex.is_match("I live at 42 Example Street"));
        assert!(address.regex.is_match("10 Downing St"));
    }

    #[test]
    fn test_oversharing_patterns_case_insensitive() {
        let set = RuleSet::with_defaults();
        let location = set
            .oversharing
            .iter()
            .find(|r| r.id == "location_disclosure")
            .unwrap();
        assert!(location.regex.is_match("I LIVE AT the corner house"));
        assert!(location.regex.is_match("my address is secret"));
    }

    // The settings surface exposes "financial" and "personal" toggles,
    // but the rules governing the most sensitive data are keyed as
    // "ssn", "credit_card", "atm_pin", and "personal_keywords". Those
    // categories can never be enabled through the documented settings.
    // Inherited behavior, pinned here so a change is a conscious one.
    #[test]
    fn test_toggle_mismatch_preserved() {
        let set = RuleSet::with_defaults();
        let toggles = default_detection_toggles();
        let mut unreachable = set.unreachable_categories(&toggles);
        unreachable.sort();
        assert_eq!(
            unreachable,
            vec!["atm_pin", "credit_card", "personal_keywords", "ssn"]
        );
    }

    #[test]
    fn test_category_labels_and_suggestions() {
        assert_eq!(category_label("phone"), "Phone Number");
        assert_eq!(category_label("unknown"), "Sensitive Data");
        assert!(category_suggestion("ssn").contains("Never share"));
        assert!(category_suggestion("unknown").contains("cautious"));
    }
}
