//! Wrappers around the AWS collaborators the hawks talk to.
//!
//! S3 bulk retrieval rides on the [rust-s3](https://github.com/durch/rust-s3)
//! library and its blocking API. The control-plane lookups (IAM role trust
//! policies, ECR repository policies, STS caller identity) use the official
//! `aws-sdk-*` crates; each wrapper owns a private tokio runtime and drives
//! the SDK futures to completion with `block_on`, so callers stay synchronous
//! end to end.
//!
//! Credentials always come from an explicitly named profile passed in at
//! construction time; no session state is shared between wrappers or calls.
//!
//! ```no_run
//! use trail_hawks::aws_clients::iam::AwsRoleTrust;
//! use trail_hawks::theft_detection::RoleTrustFetcher;
//!
//! let fetcher = AwsRoleTrust::new("investigations").unwrap();
//! let services = fetcher.trusted_services("deploy-role").unwrap();
//! assert!(services.is_empty() || services[0].contains('.'));
//! ```

pub mod ecr;
pub mod iam;
pub mod s3;
pub mod sts;

use crate::HawkError;
use aws_config::{BehaviorVersion, SdkConfig};
use serde_derive::Deserialize;
use tokio::runtime::Runtime;

/// Builds the runtime and SDK configuration for a named credentials profile.
pub(crate) fn sdk_config(profile: &str) -> Result<(Runtime, SdkConfig), HawkError> {
    let runtime = Runtime::new()
        .map_err(|e| HawkError::connection("client runtime startup", profile, e))?;
    let config = runtime.block_on(
        aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load(),
    );
    Ok((runtime, config))
}

/// Policy JSON writes single values and arrays interchangeably.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}
