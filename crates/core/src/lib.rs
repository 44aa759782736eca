//! Core types for validating provisioned cloud resources.
//!
//! A validation looks a resource up ([`LookupRequest`] ->
//! [`ResourceDescription`]), then applies an [`Expectation`] of typed field
//! checks to the description. The result is a [`ValidationOutcome`]; failures
//! are data, never panics.

pub mod category;
pub mod classify;
pub mod compare;
pub mod error;
pub mod expectation;
pub mod outcome;
pub mod path;
pub mod request;

pub use category::ResourceCategory;
pub use classify::{classify, lookup_error};
pub use compare::{Comparison, compare, decode_json_document};
pub use error::{ErrorKind, LookupError};
pub use expectation::{Check, Expectation, FieldExpectation, Requirement, Scalar, Scope, Selector};
pub use outcome::{FieldMismatch, MalformedResponse, SkippedField, ValidationOutcome, Verdict};
pub use path::{FieldPath, Segment};
pub use request::{LookupRequest, ResourceDescription, ResourceKey};
