use std::sync::Arc;

use futures::future::join_all;
use infracheck_core::compare::render;
use infracheck_core::{
    Comparison, Expectation, FieldMismatch, LookupRequest, MalformedResponse, ResourceDescription,
    SkippedField, ValidationOutcome, Verdict, compare,
};
use infracheck_provider::ResourceFetcher;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::config::ValidatorConfig;
use crate::reporter::Reporter;

/// Looks resources up through a [`ResourceFetcher`] and checks their fields.
///
/// A validator holds no per-call state: the same request and expectation
/// against an unchanged resource always yield the same outcome, and many
/// validations may run concurrently against one instance.
#[derive(Clone)]
pub struct Validator {
    fetcher: Arc<dyn ResourceFetcher>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            config: ValidatorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Describe the resource named by `request` and apply `expectation`.
    ///
    /// Lookup failures are classified and reported; nothing is compared.
    /// Field mismatches do not stop the remaining checks. A missing required
    /// field aborts the rest of the checks. Every failure reason is sent to
    /// `reporter` before returning.
    #[instrument(skip_all, fields(resource = %request))]
    pub async fn validate(
        &self,
        request: &LookupRequest,
        expectation: &Expectation,
        reporter: &dyn Reporter,
    ) -> ValidationOutcome {
        let resource = request.to_string();
        let outcome = match self.fetcher.fetch(request).await {
            Err(lookup_error) => {
                error!(
                    category = %request.category,
                    resource_type = %request.resource_type,
                    error_kind = %lookup_error.kind,
                    code = lookup_error.code.as_deref().unwrap_or(""),
                    message = %lookup_error.message,
                    "resource lookup failed"
                );
                ValidationOutcome {
                    resource,
                    verdict: Verdict::LookupFailed { error: lookup_error },
                    comparisons: 0,
                    skipped: Vec::new(),
                }
            }
            Ok(description) => {
                if self.config.verbose {
                    reporter.log(&format!("{resource}:\n{}", description.pretty()));
                }
                self.evaluate(resource, &description, expectation)
            }
        };

        let failures = outcome.failure_lines();
        if failures.is_empty() {
            reporter.log(&outcome.to_string());
        }
        for line in &failures {
            reporter.mark_failed(line);
        }
        outcome
    }

    /// Run a batch of validations concurrently and return their outcomes
    /// in input order.
    pub async fn validate_all(
        &self,
        cases: &[(LookupRequest, Expectation)],
        reporter: &dyn Reporter,
    ) -> Vec<ValidationOutcome> {
        join_all(
            cases
                .iter()
                .map(|(request, expectation)| self.validate(request, expectation, reporter)),
        )
        .await
    }

    /// Apply `expectation` to an already fetched description.
    pub fn evaluate(
        &self,
        resource: String,
        description: &ResourceDescription,
        expectation: &Expectation,
    ) -> ValidationOutcome {
        let mut run = Run::default();
        let verdict = match targets(description.raw(), expectation) {
            Err(problem) => Verdict::Malformed {
                problem,
                mismatches: Vec::new(),
            },
            Ok(targets) => match run.check_all(&targets, expectation) {
                Err(problem) => Verdict::Malformed {
                    problem,
                    mismatches: std::mem::take(&mut run.mismatches),
                },
                Ok(()) if !run.mismatches.is_empty() => Verdict::Mismatched {
                    mismatches: std::mem::take(&mut run.mismatches),
                },
                Ok(()) if self.config.fail_on_skipped && !run.skipped.is_empty() => {
                    Verdict::SkippedStrict
                }
                Ok(()) => Verdict::Passed,
            },
        };
        if let Verdict::Malformed { problem, mismatches } = &verdict {
            warn!(resource = %resource, %problem, earlier_mismatches = mismatches.len(), "malformed response");
        }
        ValidationOutcome {
            resource,
            verdict,
            comparisons: run.comparisons,
            skipped: run.skipped,
        }
    }
}

/// An element to check, with its position when taken from a collection.
type Target = (Option<usize>, Value);

/// Pick the value(s) the field checks apply to.
fn targets(raw: &Value, expectation: &Expectation) -> Result<Vec<Target>, MalformedResponse> {
    let Some(scope) = &expectation.scope else {
        return Ok(vec![(None, raw.clone())]);
    };
    let items = match scope.collection.resolve(raw) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(MalformedResponse::NotACollection {
                collection: scope.collection.clone(),
            });
        }
        None => {
            return Err(MalformedResponse::MissingField {
                field: scope.collection.clone(),
                element: None,
            });
        }
    };
    let picked: Vec<Target> = scope
        .selector
        .select(&items)
        .into_iter()
        .map(|(index, item)| (Some(index), item.clone()))
        .collect();
    if picked.is_empty() {
        return Err(MalformedResponse::NoMatchingElement {
            collection: scope.collection.clone(),
            selector: scope.selector.to_string(),
        });
    }
    debug!(collection = %scope.collection, selected = picked.len(), "selector matched");
    Ok(picked)
}

#[derive(Default)]
struct Run {
    comparisons: usize,
    mismatches: Vec<FieldMismatch>,
    skipped: Vec<SkippedField>,
}

impl Run {
    fn check_all(&mut self, targets: &[Target], expectation: &Expectation) -> Result<(), MalformedResponse> {
        for (element, target) in targets {
            for field in &expectation.fields {
                let Some(actual) = field.path.resolve(target) else {
                    if field.is_optional() {
                        warn!(field = %field.path, element = ?element, "optional field absent, skipping");
                        self.skipped.push(SkippedField {
                            field: field.path.clone(),
                            element: *element,
                        });
                        continue;
                    }
                    return Err(MalformedResponse::MissingField {
                        field: field.path.clone(),
                        element: *element,
                    });
                };
                self.comparisons += 1;
                if let Comparison::Mismatch { expected, actual: got } = compare(&field.check, &actual) {
                    debug!(field = %field.path, actual = %render(&actual), "field mismatch");
                    self.mismatches.push(FieldMismatch {
                        field: field.path.clone(),
                        element: *element,
                        check: field.check.name().to_owned(),
                        expected,
                        actual: got,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use infracheck_core::{Check, ErrorKind, FieldExpectation, LookupError, ResourceCategory, Selector};
    use infracheck_provider::StaticFetcher;
    use serde_json::json;

    use super::*;
    use crate::reporter::RecordingReporter;

    fn validator(fetcher: StaticFetcher) -> Validator {
        Validator::new(Arc::new(fetcher))
    }

    fn evaluate(raw: Value, expectation: &Expectation) -> ValidationOutcome {
        validator(StaticFetcher::new(ResourceCategory::Ec2)).evaluate(
            "test".into(),
            &ResourceDescription::new(raw),
            expectation,
        )
    }

    #[test]
    fn all_mismatches_are_reported() {
        let outcome = evaluate(
            json!({"CidrBlock": "10.0.0.0/16", "OwnerId": "111", "IsDefault": false}),
            &Expectation::new()
                .equals("CidrBlock", "10.0.1.0/24")
                .equals("OwnerId", "222")
                .equals("IsDefault", false),
        );
        assert_eq!(outcome.comparisons, 3);
        assert_eq!(outcome.mismatches().len(), 2);
        assert_eq!(outcome.mismatches()[1].field.as_str(), "OwnerId");
    }

    #[test]
    fn missing_required_field_aborts() {
        let outcome = evaluate(
            json!({"CidrBlock": "10.0.0.0/16"}),
            &Expectation::new()
                .equals("CidrBlock", "10.0.0.0/16")
                .equals("DhcpOptionsId", "dopt-1")
                .equals("CidrBlock", "x"),
        );
        assert_eq!(outcome.comparisons, 1);
        assert!(matches!(
            outcome.verdict,
            Verdict::Malformed {
                problem: MalformedResponse::MissingField { .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_required_field_keeps_earlier_mismatches() {
        let outcome = evaluate(
            json!({"CidrBlock": "10.0.0.0/16"}),
            &Expectation::new()
                .equals("CidrBlock", "10.0.1.0/24")
                .equals("DhcpOptionsId", "dopt-1"),
        );
        assert_eq!(outcome.comparisons, 1);
        assert_eq!(outcome.mismatches().len(), 1);
        let lines = outcome.failure_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("required field DhcpOptionsId is missing"));
        assert!(lines[1].contains("field mismatch: CidrBlock"));
    }

    #[test]
    fn null_required_field_is_missing() {
        let outcome = evaluate(json!({"KmsKeyId": null}), &Expectation::new().not_empty("KmsKeyId"));
        assert!(matches!(outcome.verdict, Verdict::Malformed { .. }));
    }

    #[test]
    fn missing_optional_field_is_a_flagged_skip() {
        let expectation = Expectation::new()
            .equals("FlowLogStatus", "ACTIVE")
            .with(FieldExpectation::new("DeliverLogsPermissionArn", Check::NotEmpty).optional());
        let outcome = evaluate(json!({"FlowLogStatus": "ACTIVE"}), &expectation);
        assert!(outcome.passed());
        assert_eq!(outcome.comparisons, 1);
        assert_eq!(outcome.skipped.len(), 1);

        let strict = validator(StaticFetcher::new(ResourceCategory::Ec2))
            .with_config(ValidatorConfig::default().with_fail_on_skipped(true))
            .evaluate(
                "test".into(),
                &ResourceDescription::new(json!({"FlowLogStatus": "ACTIVE"})),
                &expectation,
            );
        assert_eq!(strict.verdict, Verdict::SkippedStrict);
    }

    #[test]
    fn selector_compares_every_match() {
        let raw = json!({"Subnets": [
            {"SubnetId": "a", "MapPublicIpOnLaunch": false, "Tags": [{"Key": "Name", "Value": "private-sbn-a"}]},
            {"SubnetId": "b", "MapPublicIpOnLaunch": true, "Tags": [{"Key": "Name", "Value": "public-sbn-b"}]},
            {"SubnetId": "c", "MapPublicIpOnLaunch": true, "Tags": [{"Key": "Name", "Value": "private-sbn-c"}]}
        ]});
        let outcome = evaluate(
            raw,
            &Expectation::new()
                .within("Subnets", Selector::tag_value_contains("private-sbn"))
                .equals("MapPublicIpOnLaunch", false),
        );
        assert_eq!(outcome.comparisons, 2);
        assert_eq!(outcome.mismatches().len(), 1);
        assert_eq!(outcome.mismatches()[0].element, Some(2));
    }

    #[test]
    fn selector_without_match_is_malformed() {
        let outcome = evaluate(
            json!({"RouteTables": [{"Tags": [{"Key": "Name", "Value": "default-rtb"}]}]}),
            &Expectation::new()
                .within("RouteTables", Selector::tag_value_contains("public-rtb"))
                .length("Routes", 2),
        );
        let Verdict::Malformed {
            problem: MalformedResponse::NoMatchingElement { selector, .. },
            ..
        } = &outcome.verdict
        else {
            panic!("expected no-match, got {:?}", outcome.verdict);
        };
        assert!(selector.contains("public-rtb"));
        assert_eq!(outcome.comparisons, 0);
    }

    #[test]
    fn scope_on_non_collection_is_malformed() {
        let outcome = evaluate(
            json!({"RouteTables": {"RouteTableId": "rtb-1"}}),
            &Expectation::new().within("RouteTables", Selector::First).not_empty("RouteTableId"),
        );
        assert!(matches!(
            outcome.verdict,
            Verdict::Malformed {
                problem: MalformedResponse::NotACollection { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn lookup_failure_reports_classification() {
        let fetcher = StaticFetcher::new(ResourceCategory::Iam).with_error(
            "role",
            "ci",
            LookupError::new(ErrorKind::AccessDenied, "not authorized").with_code("AccessDenied"),
        );
        let reporter = RecordingReporter::new();
        let outcome = validator(fetcher)
            .validate(
                &LookupRequest::by_name(ResourceCategory::Iam, "role", "ci"),
                &Expectation::new().equals("RoleName", "ci"),
                &reporter,
            )
            .await;
        assert_eq!(outcome.comparisons, 0);
        assert_eq!(outcome.lookup_error().map(|e| e.kind), Some(ErrorKind::AccessDenied));
        assert_eq!(reporter.failures().len(), 1);
        assert!(reporter.failures()[0].contains("access_denied"));
    }

    #[tokio::test]
    async fn verbose_logs_raw_description() {
        let fetcher = StaticFetcher::new(ResourceCategory::Ec2)
            .with_description("vpc", "vpc-1", json!({"VpcId": "vpc-1", "CidrBlock": "10.0.0.0/16"}));
        let reporter = RecordingReporter::new();
        let outcome = validator(fetcher)
            .with_config(ValidatorConfig::default().with_verbose(true))
            .validate(
                &LookupRequest::by_id(ResourceCategory::Ec2, "vpc", "vpc-1"),
                &Expectation::new().equals("VpcId", "vpc-1"),
                &reporter,
            )
            .await;
        assert!(outcome.passed());
        let lines = reporter.lines();
        assert!(lines[0].contains("\"CidrBlock\": \"10.0.0.0/16\""));
        assert!(lines[1].contains("passed (1 comparisons)"));
        reporter.assert_passed();
    }
}
