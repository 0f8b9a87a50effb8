//! Multi-category classification of text snapshots
//!
//! One pass over a snapshot applies every enabled detection rule and
//! every oversharing rule, producing a ranked [`ClassificationResult`].
//! Classification is pure: identical (text, settings) input always
//! yields an identical result: no randomness, no I/O, no
//! order-dependent side effects.

use crate::rules::{RuleSet, Severity};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// One detection rule's hits within a single text snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Detection category of the matching rule
    pub category: String,
    /// The category's fixed severity
    pub severity: Severity,
    /// All non-overlapping matches, in text order
    pub matched_samples: Vec<String>,
}

/// One oversharing rule's hits within a single text snapshot.
///
/// Oversharing is advisory: no severity, never gated by settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversharingFinding {
    /// Advisory category label
    pub category: String,
    /// All non-overlapping matches, in text order
    pub matched_samples: Vec<String>,
}

/// Result of classifying one text snapshot. Derived per pass, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Detection findings, in rule definition order
    pub findings: Vec<Finding>,
    /// Worst severity among the detection findings
    pub max_severity: Option<Severity>,
    /// Advisory oversharing findings
    pub oversharing: Vec<OversharingFinding>,
}

impl ClassificationResult {
    /// Whether the snapshot produced no findings of either kind.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.oversharing.is_empty()
    }

    /// Total number of findings across both kinds.
    pub fn finding_count(&self) -> usize {
        self.findings.len() + self.oversharing.len()
    }
}

/// Applies the compiled rule set to text snapshots.
pub struct Classifier {
    rules: RuleSet,
}

impl Classifier {
    /// Create a classifier over an already-compiled rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Create a classifier over the fixed default rule sets.
    pub fn with_defaults() -> Self {
        Self::new(RuleSet::with_defaults())
    }

    /// The compiled rule set in use.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify one text snapshot against the given settings.
    ///
    /// Detection rules run only for categories toggled on; oversharing
    /// rules run unconditionally. Each matching rule contributes exactly
    /// one finding carrying all its non-overlapping matches.
    pub fn classify(&self, text: &str, settings: &Settings) -> ClassificationResult {
        let mut findings = Vec::new();
        let mut max_severity: Option<Severity> = None;

        for rule in &self.rules.detection {
            if !settings.category_enabled(&rule.category) {
                continue;
            }
            let matched_samples: Vec<String> = rule
                .regex
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect();
            if matched_samples.is_empty() {
                continue;
            }
            max_severity = Some(match max_severity {
                Some(current) => current.max(rule.severity),
                None => rule.severity,
            });
            findings.push(Finding {
                category: rule.category.clone(),
                severity: rule.severity,
                matched_samples,
            });
        }

        let mut oversharing = Vec::new();
        for rule in &self.rules.oversharing {
            let matched_samples: Vec<String> = rule
                .regex
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect();
            if !matched_samples.is_empty() {
                oversharing.push(OversharingFinding {
                    category: rule.category.clone(),
                    matched_samples,
                });
            }
        }

        ClassificationResult {
            findings,
            max_severity,
            oversharing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::with_defaults()
    }

    #[test]
    fn test_phone_detected() {
        let result = classifier().classify("call me at 555-123-4567", &Settings::default());
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].category, "phone");
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.max_severity, Some(Severity::High));
    }

    #[test]
    fn test_address_detected() {
        let result = classifier().classify("I live at 42 Example Street", &Settings::default());
        let address = result.findings.iter().find(|f| f.category == "address");
        assert!(address.is_some());
        assert_eq!(address.unwrap().severity, Severity::High);
    }

    #[test]
    fn test_clean_text() {
        let result = classifier().classify("hello, how are you today?", &Settings::default());
        assert!(result.is_clean());
        assert_eq!(result.max_severity, None);
    }

    #[test]
    fn test_disabled_category_yields_no_findings() {
        let mut settings = Settings::default();
        settings.detection_toggles.insert("phone".to_string(), false);

        let result = classifier().classify("call me at 555-123-4567", &settings);
        assert!(result.findings.iter().all(|f| f.category != "phone"));
    }

    #[test]
    fn test_oversharing_unaffected_by_toggles() {
        let mut settings = Settings::default();
        for toggle in settings.detection_toggles.values_mut() {
            *toggle = false;
        }

        let result = classifier().classify("call me at 555-123-4567, going on vacation", &settings);
        assert!(result.findings.is_empty());
        assert_eq!(result.oversharing.len(), 2);
        let categories: Vec<_> = result
            .oversharing
            .iter()
            .map(|f| f.category.as_str())
            .collect();
        assert!(categories.contains(&"contact"));
        assert!(categories.contains(&"travel"));
    }

    // Rules keyed outside the toggle namespace never fire, even with
    // every exposed toggle on. Pins the inherited settings mismatch.
    #[test]
    fn test_unreachable_categories_never_fire() {
        let result = classifier().classify(
            "ssn 123-45-6789 card 4111-1111-1111-1111",
            &Settings::default(),
        );
        assert!(result.findings.iter().all(|f| f.category != "ssn"));
        assert!(result.findings.iter().all(|f| f.category != "credit_card"));
    }

    #[test]
    fn test_max_severity_is_worst_finding() {
        let settings = Settings::default();
        // The email rule is reachable (medium); phone is reachable (high).
        let result = classifier().classify("mail test@example.com or 555-123-4567", &settings);
        assert!(result.findings.len() >= 2);
        assert_eq!(result.max_severity, Some(Severity::High));
    }

    #[test]
    fn test_multiple_matches_one_finding_per_rule() {
        let result = classifier().classify(
            "emails: a@example.com and b@example.org",
            &Settings::default(),
        );
        let email = result
            .findings
            .iter()
            .find(|f| f.category == "email")
            .unwrap();
        assert_eq!(email.matched_samples.len(), 2);
        assert_eq!(result.findings.iter().filter(|f| f.category == "email").count(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "call 555-123-4567, I live at 9 Oak Lane, going on vacation";
        let settings = Settings::default();
        let c = classifier();
        let first = c.classify(text, &settings);
        let second = c.classify(text, &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn test_finding_serialization() {
        let result = classifier().classify("call me at 555-123-4567", &Settings::default());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"maxSeverity\":\"high\""));
        assert!(json.contains("\"matchedSamples\""));
        let parsed: ClassificationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
