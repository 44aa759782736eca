//! Validate provisioned cloud resources against field-level expectations.
//!
//! ```ignore
//! let validator = Validator::new(Arc::new(registry));
//! let reporter = RecordingReporter::new();
//! validator
//!     .validate(
//!         &LookupRequest::by_id(ResourceCategory::Ec2, "vpc", vpc_id),
//!         &Expectation::new().equals("CidrBlock", "10.0.0.0/16"),
//!         &reporter,
//!     )
//!     .await;
//! reporter.assert_passed();
//! ```

pub mod config;
pub mod reporter;
pub mod telemetry;
pub mod validator;

pub use config::{ConfigError, ValidatorConfig};
pub use reporter::{RecordingReporter, Reporter, TracingReporter};
pub use validator::Validator;
