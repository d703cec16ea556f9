//! Role trust policy retrieval through IAM.
//!
//! IAM returns the assume-role policy document URL-encoded; it is decoded and
//! parsed here, keeping only `Allow` statements that grant `sts:AssumeRole`,
//! and collecting the service principals those statements trust.

use crate::aws_clients::OneOrMany;
use crate::theft_detection::RoleTrustFetcher;
use crate::HawkError;
use aws_sdk_iam::Client;
use log::debug;
use percent_encoding::percent_decode_str;
use serde_derive::Deserialize;
use tokio::runtime::Runtime;

const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
const ALLOW_EFFECT: &str = "Allow";

#[derive(Deserialize)]
struct TrustPolicy {
    #[serde(rename = "Statement", default)]
    statement: OneOrMany<TrustStatement>,
}

#[derive(Deserialize)]
struct TrustStatement {
    #[serde(rename = "Effect", default)]
    effect: String,
    #[serde(rename = "Action", default)]
    action: OneOrMany<String>,
    #[serde(rename = "Principal")]
    principal: Option<TrustPrincipal>,
}

#[derive(Deserialize)]
struct TrustPrincipal {
    #[serde(rename = "Service")]
    service: Option<OneOrMany<String>>,
}

/// Extracts trusted service principals from a URL-encoded assume-role policy
/// document, as returned by `iam:GetRole`.
pub(crate) fn services_from_trust_policy(encoded_document: &str) -> Result<Vec<String>, HawkError> {
    let decoded = percent_decode_str(encoded_document)
        .decode_utf8()
        .map_err(|e| HawkError::parse("assume-role policy document", e))?;
    let policy: TrustPolicy = serde_json::from_str(&decoded)
        .map_err(|e| HawkError::parse("assume-role policy document", e))?;

    let mut services = Vec::new();
    for statement in policy.statement.into_vec() {
        if statement.effect != ALLOW_EFFECT {
            continue;
        }
        let actions = statement.action.into_vec();
        if !actions.iter().any(|action| action == ASSUME_ROLE_ACTION) {
            continue;
        }
        if let Some(TrustPrincipal {
            service: Some(service),
        }) = statement.principal
        {
            services.extend(service.into_vec());
        }
    }
    Ok(services)
}

/// `RoleTrustFetcher` backed by the IAM control plane.
pub struct AwsRoleTrust {
    runtime: Runtime,
    client: Client,
}

impl AwsRoleTrust {
    pub fn new(profile: &str) -> Result<Self, HawkError> {
        let (runtime, config) = crate::aws_clients::sdk_config(profile)?;
        let client = Client::new(&config);
        Ok(AwsRoleTrust { runtime, client })
    }
}

impl RoleTrustFetcher for AwsRoleTrust {
    fn trusted_services(&self, role_name: &str) -> Result<Vec<String>, HawkError> {
        let response = self
            .runtime
            .block_on(self.client.get_role().role_name(role_name).send())
            .map_err(|e| HawkError::connection("iam:GetRole", role_name, e))?;
        let document = response
            .role()
            .and_then(|role| role.assume_role_policy_document());
        debug!("{}: trust document present: {}", role_name, document.is_some());
        match document {
            Some(document) => services_from_trust_policy(document),
            None => Ok(Vec::new()),
        }
    }
}
