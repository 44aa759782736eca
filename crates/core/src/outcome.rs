use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::path::FieldPath;

/// A compared field whose value differed from the expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub field: FieldPath,
    /// Which element of a collection was compared, when a selector was used.
    pub element: Option<usize>,
    pub check: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if let Some(element) = self.element {
            write!(f, " (element {element})")?;
        }
        write!(
            f,
            ": {} check failed, expected {}, actual {}",
            self.check, self.expected, self.actual
        )
    }
}

/// The description lacked something the expectation required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedResponse {
    /// A required field was absent or null.
    MissingField { field: FieldPath, element: Option<usize> },
    /// The scoped collection path did not address an array.
    NotACollection { collection: FieldPath },
    /// No element of the collection matched the selector.
    NoMatchingElement { collection: FieldPath, selector: String },
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field, element: None } => write!(f, "required field {field} is missing"),
            Self::MissingField {
                field,
                element: Some(element),
            } => write!(f, "required field {field} is missing on element {element}"),
            Self::NotACollection { collection } => write!(f, "{collection} is not a collection"),
            Self::NoMatchingElement { collection, selector } => {
                write!(f, "no element of {collection} matched {selector}")
            }
        }
    }
}

/// An optional field that was absent and therefore not compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedField {
    pub field: FieldPath,
    pub element: Option<usize>,
}

impl fmt::Display for SkippedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.element {
            Some(element) => write!(f, "{} (element {element})", self.field),
            None => write!(f, "{}", self.field),
        }
    }
}

/// Pass/fail verdict of one validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// The describe/get call failed; nothing was compared.
    LookupFailed { error: LookupError },
    /// The response lacked a required field; remaining checks were abandoned.
    /// Mismatches found before the abort are kept.
    Malformed {
        problem: MalformedResponse,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mismatches: Vec<FieldMismatch>,
    },
    /// Every check ran; these did not match.
    Mismatched { mismatches: Vec<FieldMismatch> },
    /// Every check matched but optional fields were skipped under a strict policy.
    SkippedStrict,
}

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Identifier of the validated resource, for diagnostics.
    pub resource: String,
    pub verdict: Verdict,
    /// Number of field comparisons actually performed.
    pub comparisons: usize,
    #[serde(default)]
    pub skipped: Vec<SkippedField>,
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed)
    }

    pub fn mismatches(&self) -> &[FieldMismatch] {
        match &self.verdict {
            Verdict::Mismatched { mismatches } | Verdict::Malformed { mismatches, .. } => mismatches,
            _ => &[],
        }
    }

    pub fn lookup_error(&self) -> Option<&LookupError> {
        match &self.verdict {
            Verdict::LookupFailed { error } => Some(error),
            _ => None,
        }
    }

    /// One line per failure reason, empty when the validation passed.
    pub fn failure_lines(&self) -> Vec<String> {
        let prefix = &self.resource;
        match &self.verdict {
            Verdict::Passed => Vec::new(),
            Verdict::LookupFailed { error } => vec![format!("{prefix}: {error}")],
            Verdict::Malformed { problem, mismatches } => {
                std::iter::once(format!("{prefix}: malformed response: {problem}"))
                    .chain(mismatches.iter().map(|m| format!("{prefix}: field mismatch: {m}")))
                    .collect()
            }
            Verdict::Mismatched { mismatches } => mismatches
                .iter()
                .map(|m| format!("{prefix}: field mismatch: {m}"))
                .collect(),
            Verdict::SkippedStrict => self
                .skipped
                .iter()
                .map(|s| format!("{prefix}: optional field {s} was absent"))
                .collect(),
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            write!(f, "{}: passed ({} comparisons", self.resource, self.comparisons)?;
            if !self.skipped.is_empty() {
                write!(f, ", {} optional fields skipped", self.skipped.len())?;
            }
            return f.write_str(")");
        }
        f.write_str(&self.failure_lines().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn mismatch(field: &str) -> FieldMismatch {
        FieldMismatch {
            field: field.into(),
            element: None,
            check: "equals".into(),
            expected: "10.0.1.0/24".into(),
            actual: "10.0.0.0/16".into(),
        }
    }

    #[test]
    fn mismatch_display() {
        assert_eq!(
            mismatch("CidrBlock").to_string(),
            "CidrBlock: equals check failed, expected 10.0.1.0/24, actual 10.0.0.0/16"
        );
    }

    #[test]
    fn failure_lines_per_mismatch() {
        let outcome = ValidationOutcome {
            resource: "ec2/vpc id=vpc-1".into(),
            verdict: Verdict::Mismatched {
                mismatches: vec![mismatch("CidrBlock"), mismatch("OwnerId")],
            },
            comparisons: 3,
            skipped: Vec::new(),
        };
        assert!(!outcome.passed());
        assert_eq!(outcome.mismatches().len(), 2);
        let lines = outcome.failure_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("ec2/vpc id=vpc-1: field mismatch: OwnerId"));
    }

    #[test]
    fn malformed_keeps_earlier_mismatches() {
        let outcome = ValidationOutcome {
            resource: "ec2/vpc id=vpc-1".into(),
            verdict: Verdict::Malformed {
                problem: MalformedResponse::MissingField {
                    field: "DhcpOptionsId".into(),
                    element: None,
                },
                mismatches: vec![mismatch("CidrBlock")],
            },
            comparisons: 1,
            skipped: Vec::new(),
        };
        assert_eq!(outcome.mismatches().len(), 1);
        assert_eq!(
            outcome.failure_lines(),
            vec![
                "ec2/vpc id=vpc-1: malformed response: required field DhcpOptionsId is missing".to_owned(),
                "ec2/vpc id=vpc-1: field mismatch: CidrBlock: equals check failed, expected 10.0.1.0/24, actual 10.0.0.0/16"
                    .to_owned(),
            ]
        );
    }

    #[test]
    fn lookup_failure_display() {
        let outcome = ValidationOutcome {
            resource: "iam/role name=ci".into(),
            verdict: Verdict::LookupFailed {
                error: LookupError::not_found("role ci not found").with_code("NoSuchEntity"),
            },
            comparisons: 0,
            skipped: Vec::new(),
        };
        assert_eq!(outcome.lookup_error().map(|e| e.kind), Some(ErrorKind::NotFound));
        assert_eq!(
            outcome.to_string(),
            "iam/role name=ci: not_found lookup failure (NoSuchEntity): role ci not found"
        );
    }

    #[test]
    fn passed_display_mentions_skips() {
        let outcome = ValidationOutcome {
            resource: "ec2/flow_logs".into(),
            verdict: Verdict::Passed,
            comparisons: 4,
            skipped: vec![SkippedField {
                field: "DeliverLogsPermissionArn".into(),
                element: Some(1),
            }],
        };
        assert_eq!(
            outcome.to_string(),
            "ec2/flow_logs: passed (4 comparisons, 1 optional fields skipped)"
        );
    }
}
