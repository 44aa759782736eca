use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use infracheck_core::{
    ErrorKind, Expectation, LookupError, LookupRequest, MalformedResponse, ResourceCategory,
    ResourceDescription, Selector, Verdict, classify,
};
use infracheck_provider::{FetcherRegistry, ResourceFetcher, StaticFetcher};
use infracheck_validator::telemetry::init_test_tracing;
use infracheck_validator::{RecordingReporter, Validator};
use serde_json::{Value, json};

fn prod_vpc() -> Value {
    json!({"Vpcs": [{
        "VpcId": "vpc-0a1b2c",
        "Name": "prod-vpc",
        "CidrBlock": "10.0.0.0/16",
        "State": "available",
        "IsDefault": false,
        "Tags": [
            {"Key": "Name", "Value": "prod-vpc"},
            {"Key": "env", "Value": "prod"},
            {"Key": "team", "Value": "platform"}
        ]
    }]})
}

fn vpc() -> Expectation {
    Expectation::new().within("Vpcs", Selector::First)
}

fn route_tables() -> Value {
    let route = |cidr: &str| json!({"DestinationCidrBlock": cidr, "State": "active"});
    json!({"RouteTables": [
        {
            "RouteTableId": "rtb-default",
            "Routes": [route("10.0.0.0/16")],
            "Tags": [{"Key": "Name", "Value": "prod-default-rtb"}]
        },
        {
            "RouteTableId": "rtb-public",
            "Routes": [route("10.0.0.0/16"), route("0.0.0.0/0")],
            "Tags": [{"Key": "Name", "Value": "prod-public-rtb"}]
        },
        {
            "RouteTableId": "rtb-private",
            "Routes": [route("10.0.0.0/16"), route("0.0.0.0/0"), route("10.1.0.0/16")],
            "Tags": [{"Key": "Name", "Value": "prod-private-rtb"}]
        }
    ]})
}

fn ec2_validator() -> Validator {
    let fetcher = StaticFetcher::new(ResourceCategory::Ec2)
        .with_description("vpc", "vpc-0a1b2c", prod_vpc())
        .with_description("route_tables", "vpc-0a1b2c", route_tables());
    Validator::new(Arc::new(fetcher))
}

fn vpc_request() -> LookupRequest {
    LookupRequest::by_id(ResourceCategory::Ec2, "vpc", "vpc-0a1b2c")
}

#[tokio::test]
async fn matching_vpc_passes() {
    init_test_tracing();
    let reporter = RecordingReporter::new();
    let outcome = ec2_validator()
        .validate(
            &vpc_request(),
            &vpc()
                .equals("Name", "prod-vpc")
                .equals("CidrBlock", "10.0.0.0/16"),
            &reporter,
        )
        .await;

    assert!(outcome.passed());
    assert!(outcome.mismatches().is_empty());
    assert_eq!(outcome.comparisons, 2);
    reporter.assert_passed();
}

#[tokio::test]
async fn wrong_cidr_is_a_single_mismatch() {
    let reporter = RecordingReporter::new();
    let outcome = ec2_validator()
        .validate(
            &vpc_request(),
            &vpc().equals("CidrBlock", "10.0.1.0/24"),
            &reporter,
        )
        .await;

    let mismatches = outcome.mismatches();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].field.as_str(), "CidrBlock");
    assert_eq!(mismatches[0].expected, "10.0.1.0/24");
    assert_eq!(mismatches[0].actual, "10.0.0.0/16");
    assert!(reporter.failed());
    assert!(reporter.failures()[0].contains("vpc-0a1b2c"));
}

#[tokio::test]
async fn not_found_is_classified_without_comparisons() {
    let error = classify::lookup_error(
        ResourceCategory::Ec2,
        Some("InvalidVpcID.NotFound"),
        "The vpc ID 'vpc-gone' does not exist",
    );
    let fetcher = StaticFetcher::new(ResourceCategory::Ec2).with_error("vpc", "vpc-gone", error);
    let reporter = RecordingReporter::new();
    let outcome = Validator::new(Arc::new(fetcher))
        .validate(
            &LookupRequest::by_id(ResourceCategory::Ec2, "vpc", "vpc-gone"),
            &Expectation::new().equals("CidrBlock", "10.0.0.0/16"),
            &reporter,
        )
        .await;

    assert_eq!(outcome.comparisons, 0);
    let error = outcome.lookup_error().expect("lookup failure");
    assert_eq!(error.kind, ErrorKind::NotFound);
    assert_eq!(error.code.as_deref(), Some("InvalidVpcID.NotFound"));
    assert!(reporter.failed());
}

#[tokio::test]
async fn public_route_table_selected_by_tag() {
    let reporter = RecordingReporter::new();
    let request = LookupRequest::by_id(ResourceCategory::Ec2, "route_tables", "vpc-0a1b2c");
    let validator = ec2_validator();

    let public = validator
        .validate(
            &request,
            &Expectation::new()
                .within("RouteTables", Selector::tag_value_contains("public-rtb"))
                .length("Routes", 2)
                .equals("RouteTableId", "rtb-public"),
            &reporter,
        )
        .await;
    assert!(public.passed(), "{public}");
    reporter.assert_passed();

    // Position 0 is the default table with a single route.
    let first = validator
        .validate(
            &request,
            &Expectation::new()
                .within("RouteTables", Selector::First)
                .length("Routes", 2),
            &reporter,
        )
        .await;
    assert_eq!(first.mismatches().len(), 1);
    assert_eq!(first.mismatches()[0].element, Some(0));
}

#[tokio::test]
async fn tag_substring_selects_every_matching_table() {
    let reporter = RecordingReporter::new();
    let outcome = ec2_validator()
        .validate(
            &LookupRequest::by_id(ResourceCategory::Ec2, "route_tables", "vpc-0a1b2c"),
            &Expectation::new()
                .within("RouteTables", Selector::tag_value_contains("-rtb"))
                .contains("Routes[*].DestinationCidrBlock", "10.0.0.0/16"),
            &reporter,
        )
        .await;
    assert!(outcome.passed());
    assert_eq!(outcome.comparisons, 3);
}

#[tokio::test]
async fn missing_selector_match_is_malformed() {
    let reporter = RecordingReporter::new();
    let outcome = ec2_validator()
        .validate(
            &LookupRequest::by_id(ResourceCategory::Ec2, "route_tables", "vpc-0a1b2c"),
            &Expectation::new()
                .within("RouteTables", Selector::tag_value_contains("isolated-rtb"))
                .length("Routes", 1),
            &reporter,
        )
        .await;
    assert!(matches!(
        outcome.verdict,
        Verdict::Malformed {
            problem: MalformedResponse::NoMatchingElement { .. },
            ..
        }
    ));
    assert!(reporter.failures()[0].contains("isolated-rtb"));
}

#[tokio::test]
async fn tags_compare_regardless_of_order() {
    let reporter = RecordingReporter::new();
    let outcome = ec2_validator()
        .validate(
            &vpc_request(),
            &vpc()
                .unordered("Tags[*].Value", ["platform", "prod", "prod-vpc"])
                .contains_all("Tags[*].Key", ["env", "team"]),
            &reporter,
        )
        .await;
    assert!(outcome.passed(), "{outcome}");
}

#[tokio::test]
async fn url_encoded_trust_policy_matches_plain_json() {
    let encoded = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%7B%22Action%22%3A%22sts%3AAssumeRole%22%2C%22Principal%22%3A%7B%22Service%22%3A%22lambda.amazonaws.com%22%7D%2C%22Effect%22%3A%22Allow%22%7D%5D%7D";
    let fetcher = StaticFetcher::new(ResourceCategory::Iam).with_description(
        "role",
        "lambda-exec",
        json!({"Role": {"RoleName": "lambda-exec", "AssumeRolePolicyDocument": encoded}}),
    );
    let reporter = RecordingReporter::new();
    let outcome = Validator::new(Arc::new(fetcher))
        .validate(
            &LookupRequest::by_name(ResourceCategory::Iam, "role", "lambda-exec"),
            &Expectation::new().json_str(
                "Role.AssumeRolePolicyDocument",
                r#"{
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": {"Service": "lambda.amazonaws.com"},
                        "Action": "sts:AssumeRole"
                    }]
                }"#,
            ),
            &reporter,
        )
        .await;
    assert!(outcome.passed(), "{outcome}");
}

#[tokio::test]
async fn repeated_validation_is_idempotent() {
    let reporter = RecordingReporter::new();
    let validator = ec2_validator();
    let expectation = vpc()
        .equals("CidrBlock", "10.0.1.0/24")
        .equals("State", "available");

    let first = validator.validate(&vpc_request(), &expectation, &reporter).await;
    let second = validator.validate(&vpc_request(), &expectation, &reporter).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn batch_runs_every_case_through_registry() {
    let registry = FetcherRegistry::new()
        .with(Arc::new(
            StaticFetcher::new(ResourceCategory::Ec2).with_description("vpc", "vpc-0a1b2c", prod_vpc()),
        ))
        .with(Arc::new(StaticFetcher::new(ResourceCategory::Kms).with_description(
            "key_rotation",
            "key-1",
            json!({"KeyRotationEnabled": true}),
        )));
    let reporter = RecordingReporter::new();
    let cases = vec![
        (vpc_request(), vpc().equals("IsDefault", false)),
        (
            LookupRequest::by_id(ResourceCategory::Kms, "key_rotation", "key-1"),
            Expectation::new().equals("KeyRotationEnabled", true),
        ),
        (
            LookupRequest::by_name(ResourceCategory::Iam, "role", "ci"),
            Expectation::new().not_empty("Role.Arn"),
        ),
    ];

    let outcomes = Validator::new(Arc::new(registry))
        .validate_all(&cases, &reporter)
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].passed());
    assert!(outcomes[1].passed());
    assert_eq!(
        outcomes[2].lookup_error().map(|e| e.kind),
        Some(ErrorKind::InvalidInput)
    );
    assert_eq!(reporter.failures().len(), 1);
}

/// Fetcher that counts calls and fails every other one.
struct FlakyFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl ResourceFetcher for FlakyFetcher {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::Lambda
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["function".into()]
    }

    async fn fetch(&self, _request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(classify::lookup_error(
                ResourceCategory::Lambda,
                Some("TooManyRequestsException"),
                "Rate exceeded",
            ));
        }
        Ok(ResourceDescription::new(json!({
            "Configuration": {"FunctionName": "ingest", "Runtime": "python3.12"}
        })))
    }
}

#[tokio::test]
async fn lookup_is_never_retried() {
    let fetcher = Arc::new(FlakyFetcher {
        calls: AtomicUsize::new(0),
    });
    let validator = Validator::new(fetcher.clone());
    let reporter = RecordingReporter::new();
    let request = LookupRequest::by_name(ResourceCategory::Lambda, "function", "ingest");
    let expectation = Expectation::new().equals("Configuration.Runtime", "python3.12");

    assert!(validator.validate(&request, &expectation, &reporter).await.passed());
    let throttled = validator.validate(&request, &expectation, &reporter).await;
    assert_eq!(throttled.lookup_error().map(|e| e.kind), Some(ErrorKind::RateLimited));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}
