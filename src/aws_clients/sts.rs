//! Caller-identity diagnostic.
//!
//! Confirms which account a credentials profile actually resolves to and which
//! buckets it can see. Used for sanity-checking cross-account access before an
//! investigation; the detectors themselves never consult it.

use crate::HawkError;
use serde_derive::Serialize;

#[derive(Serialize, Debug)]
pub struct IdentityReport {
    pub account: String,
    pub arn: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub buckets: Vec<String>,
}

/// Resolves the profile's caller identity and enumerates its visible buckets.
pub fn identity_report(profile: &str) -> Result<IdentityReport, HawkError> {
    let (runtime, config) = crate::aws_clients::sdk_config(profile)?;
    let sts = aws_sdk_sts::Client::new(&config);
    let s3 = aws_sdk_s3::Client::new(&config);

    let identity = runtime
        .block_on(sts.get_caller_identity().send())
        .map_err(|e| HawkError::connection("sts:GetCallerIdentity", profile, e))?;
    let bucket_list = runtime
        .block_on(s3.list_buckets().send())
        .map_err(|e| HawkError::connection("s3:ListBuckets", profile, e))?;
    let buckets = bucket_list
        .buckets()
        .iter()
        .filter_map(|bucket| bucket.name())
        .map(String::from)
        .collect();

    Ok(IdentityReport {
        account: identity.account().unwrap_or_default().to_string(),
        arn: identity.arn().unwrap_or_default().to_string(),
        user_id: identity.user_id().unwrap_or_default().to_string(),
        buckets,
    })
}
