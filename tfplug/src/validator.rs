//! Attribute validators
//!
//! Validators run against known, non-null configuration values only. Each
//! one appends diagnostics scoped to the attribute path it was given.

use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait Validator: Send + Sync {
    /// Human readable summary used in schema documentation
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

fn invalid(path: &AttributePath, summary: String, detail: String) -> Diagnostic {
    Diagnostic::error(summary, detail).with_attribute(path.clone())
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have minimum length of {}", path, min),
                    format!("Got length {}", len),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have maximum length of {}", path, max),
                    format!("Got length {}", len),
                ));
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    /// Build from a pattern string; an invalid pattern is a programming error
    /// surfaced as `None` so schema construction never panics.
    pub fn new(pattern: &str, description: &str) -> Option<Self> {
        regex::Regex::new(pattern).ok().map(|pattern| Self {
            pattern,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(invalid(
                    path,
                    format!("{} must match {}", path, self.description),
                    format!("Value '{}' does not match pattern", s),
                ));
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(n) = value.as_number() else {
            return;
        };
        if let Some(min) = self.min {
            if n < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at least {}", path, min),
                    format!("Got {}", n),
                ));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at most {}", path, max),
                    format!("Got {}", n),
                ));
            }
        }
    }
}

/// Accepts only one of a fixed set of strings, e.g. `STANDARD` / `PROFESSIONAL`
pub struct OneOfValidator {
    pub allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(invalid(
                    path,
                    format!("{} has an invalid value", path),
                    format!("Got '{}', {}", s, self.description()),
                ));
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "any list".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(items) = value.as_list() else {
            return;
        };
        if let Some(min) = self.min {
            if items.len() < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have at least {} items", path, min),
                    format!("Got {} items", items.len()),
                ));
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have at most {} items", path, max),
                    format!("Got {} items", items.len()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validator.validate(&value, &AttributePath::new("name"), &mut diagnostics);
        diagnostics
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(run(&validator, Dynamic::from("hello")).is_empty());
    }

    #[test]
    fn string_length_validator_rejects_short_and_long() {
        let validator = StringLengthValidator::between(3, 5);

        let short = run(&validator, Dynamic::from("ab"));
        assert_eq!(short.len(), 1);
        assert!(short[0].summary.contains("minimum length of 3"));
        assert_eq!(short[0].attribute, Some(AttributePath::new("name")));

        let long = run(&validator, Dynamic::from("abcdefg"));
        assert_eq!(long.len(), 1);
        assert!(long[0].summary.contains("maximum length of 5"));
    }

    #[test]
    fn string_length_counts_characters() {
        let validator = StringLengthValidator::between(1, 2);
        assert!(run(&validator, Dynamic::from("网关")).is_empty());
    }

    #[test]
    fn string_pattern_validator() {
        let validator = StringPatternValidator::new(r"^gateway-[a-z0-9]+$", "a gateway id")
            .expect("valid pattern");

        assert!(run(&validator, Dynamic::from("gateway-abc123")).is_empty());

        let diagnostics = run(&validator, Dynamic::from("ins-abc"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("a gateway id"));
    }

    #[test]
    fn string_pattern_rejects_bad_regex() {
        assert!(StringPatternValidator::new("(unclosed", "broken").is_none());
    }

    #[test]
    fn number_range_validator() {
        let validator = NumberRangeValidator::between(1.0, 50.0);

        assert!(run(&validator, Dynamic::Number(2.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(0.0)).len(), 1);
        assert_eq!(run(&validator, Dynamic::Number(51.0)).len(), 1);
    }

    #[test]
    fn one_of_validator() {
        let validator = OneOfValidator::new(&["STANDARD", "PROFESSIONAL"]);

        assert!(run(&validator, Dynamic::from("STANDARD")).is_empty());

        let diagnostics = run(&validator, Dynamic::from("BASIC"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.contains("STANDARD, PROFESSIONAL"));
    }

    #[test]
    fn list_length_validator() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(2),
        };

        assert!(run(&validator, Dynamic::List(vec![Dynamic::from("a")])).is_empty());
        assert_eq!(run(&validator, Dynamic::List(vec![])).len(), 1);
        assert_eq!(
            run(
                &validator,
                Dynamic::List(vec![
                    Dynamic::from("a"),
                    Dynamic::from("b"),
                    Dynamic::from("c")
                ])
            )
            .len(),
            1
        );
    }

    #[test]
    fn validators_ignore_other_types() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(run(&validator, Dynamic::Number(1.0)).is_empty());
    }
}
