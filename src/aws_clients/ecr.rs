//! Repository policy retrieval through ECR.

use crate::aws_clients::OneOrMany;
use crate::exposure_detection::RepositoryPolicyFetcher;
use crate::HawkError;
use aws_sdk_ecr::error::SdkError;
use aws_sdk_ecr::Client;
use serde_derive::Deserialize;
use serde_json::Value;
use tokio::runtime::Runtime;

#[derive(Deserialize)]
struct RepositoryPolicy {
    #[serde(rename = "Statement", default)]
    statement: OneOrMany<PolicyStatement>,
}

#[derive(Deserialize)]
struct PolicyStatement {
    #[serde(rename = "Principal")]
    principal: Option<Value>,
}

/// Collects the raw principal entry of every statement in a repository policy
/// document, as returned in `ecr:GetRepositoryPolicy`'s `policyText`.
pub(crate) fn principals_from_policy_text(policy_text: &str) -> Result<Vec<Value>, HawkError> {
    let policy: RepositoryPolicy = serde_json::from_str(policy_text)
        .map_err(|e| HawkError::parse("repository policy document", e))?;
    Ok(policy
        .statement
        .into_vec()
        .into_iter()
        .filter_map(|statement| statement.principal)
        .collect())
}

/// `RepositoryPolicyFetcher` backed by the ECR control plane.
pub struct AwsRepositoryPolicies {
    runtime: Runtime,
    client: Client,
}

impl AwsRepositoryPolicies {
    pub fn new(profile: &str) -> Result<Self, HawkError> {
        let (runtime, config) = crate::aws_clients::sdk_config(profile)?;
        let client = Client::new(&config);
        Ok(AwsRepositoryPolicies { runtime, client })
    }
}

impl RepositoryPolicyFetcher for AwsRepositoryPolicies {
    fn policy_principals(&self, repository: &str) -> Result<Vec<Value>, HawkError> {
        let result = self.runtime.block_on(
            self.client
                .get_repository_policy()
                .repository_name(repository)
                .send(),
        );
        match result {
            Ok(response) => match response.policy_text() {
                Some(text) => principals_from_policy_text(text),
                None => Ok(Vec::new()),
            },
            // A repository with no policy at all grants nothing.
            Err(SdkError::ServiceError(context))
                if context.err().is_repository_policy_not_found_exception() =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(HawkError::connection(
                "ecr:GetRepositoryPolicy",
                repository,
                e,
            )),
        }
    }
}
