//! Flags container registry repositories whose policy is open to the world.
//!
//! Repository-scoped CloudTrail events carry the repository name in their
//! request parameters. The detector narrows the table to one administrative
//! event, collects the distinct repository names it touched, and pulls each
//! repository's resource policy: any policy statement whose principal is the
//! literal wildcard grants access to every caller and is reported.

use crate::log_merging::LogRecord;
use crate::HawkError;
use log::debug;
use serde_derive::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// A policy principal of `*` grants access to any caller.
pub const WILDCARD_PRINCIPAL: &str = "*";

/// Source of resource-policy information for a repository, keyed by name.
/// Credentials are explicit at construction time, as with
/// [`RoleTrustFetcher`](crate::theft_detection::RoleTrustFetcher).
pub trait RepositoryPolicyFetcher {
    /// The raw principal entries of every policy statement attached to the
    /// repository. Empty when the repository carries no policy.
    fn policy_principals(&self, repository: &str) -> Result<Vec<Value>, HawkError>;
}

/// A repository granting the wildcard principal access.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicRepoFinding {
    #[serde(rename = "repositoryName")]
    pub repository_name: String,
}

/// Reports repositories named by `event_name` records whose policy contains a
/// wildcard principal, in first-seen order. A policy-fetch failure aborts the
/// run; no partial results are returned.
pub fn detect_public_repositories(
    records: &[LogRecord],
    event_name: &str,
    policies: &dyn RepositoryPolicyFetcher,
) -> Result<Vec<PublicRepoFinding>, HawkError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut repositories: Vec<String> = Vec::new();
    for record in records.iter().filter(|r| r.event_name == event_name) {
        if let Some(name) = &record.request_parameters_repository_name {
            if !name.is_empty() && seen.insert(name.clone()) {
                repositories.push(name.clone());
            }
        }
    }
    debug!(
        "{} distinct repositories named by {} events",
        repositories.len(),
        event_name
    );

    let mut findings = Vec::new();
    for repository in repositories {
        let principals = policies.policy_principals(&repository)?;
        let wildcard = principals
            .iter()
            .any(|principal| principal.as_str() == Some(WILDCARD_PRINCIPAL));
        if wildcard {
            findings.push(PublicRepoFinding {
                repository_name: repository,
            });
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapPolicies(HashMap<String, Vec<Value>>);

    impl MapPolicies {
        fn new(entries: Vec<(&str, Vec<Value>)>) -> Self {
            MapPolicies(
                entries
                    .into_iter()
                    .map(|(name, principals)| (name.to_string(), principals))
                    .collect(),
            )
        }
    }

    impl RepositoryPolicyFetcher for MapPolicies {
        fn policy_principals(&self, repository: &str) -> Result<Vec<Value>, HawkError> {
            Ok(self.0.get(repository).cloned().unwrap_or_default())
        }
    }

    struct FailingPolicies;

    impl RepositoryPolicyFetcher for FailingPolicies {
        fn policy_principals(&self, repository: &str) -> Result<Vec<Value>, HawkError> {
            Err(HawkError::connection(
                "ecr:GetRepositoryPolicy",
                repository,
                "denied",
            ))
        }
    }

    fn repo_record(event_name: &str, repository: Option<&str>) -> LogRecord {
        LogRecord {
            event_time: "2021-03-01T12:00:00Z".to_string(),
            source_ip_address: "52.94.0.1".to_string(),
            user_identity_arn: "arn:aws:iam::111111111111:user/ops".to_string(),
            user_identity_account_id: "111111111111".to_string(),
            user_identity_type: "IAMUser".to_string(),
            event_name: event_name.to_string(),
            request_parameters_repository_name: repository.map(String::from),
        }
    }

    #[test]
    fn wildcard_policy_is_flagged_exactly_once() {
        let records = vec![
            repo_record("CreateRepository", Some("team/api")),
            repo_record("CreateRepository", Some("team/api")),
        ];
        let policies = MapPolicies::new(vec![("team/api", vec![json!("*")])]);

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].repository_name, "team/api");
    }

    #[test]
    fn scoped_principals_are_not_flagged() {
        let records = vec![repo_record("CreateRepository", Some("team/api"))];
        let policies = MapPolicies::new(vec![(
            "team/api",
            vec![
                json!({ "AWS": "arn:aws:iam::222222222222:root" }),
                json!({ "Service": "lambda.amazonaws.com" }),
            ],
        )]);

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn records_for_other_events_are_ignored() {
        let records = vec![repo_record("DeleteRepository", Some("team/api"))];
        let policies = MapPolicies::new(vec![("team/api", vec![json!("*")])]);

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn records_without_repository_names_are_dropped() {
        let records = vec![
            repo_record("CreateRepository", None),
            repo_record("CreateRepository", Some("team/api")),
        ];
        let policies = MapPolicies::new(vec![("team/api", vec![json!("*")])]);

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn findings_keep_first_seen_order() {
        let records = vec![
            repo_record("CreateRepository", Some("team/worker")),
            repo_record("CreateRepository", Some("team/api")),
            repo_record("CreateRepository", Some("team/worker")),
        ];
        let policies = MapPolicies::new(vec![
            ("team/worker", vec![json!("*")]),
            ("team/api", vec![json!("*")]),
        ]);

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        let names: Vec<&str> = findings.iter().map(|f| f.repository_name.as_str()).collect();
        assert_eq!(names, vec!["team/worker", "team/api"]);
    }

    #[test]
    fn policy_fetch_failure_aborts_the_run() {
        let records = vec![repo_record("CreateRepository", Some("team/api"))];

        let err = detect_public_repositories(&records, "CreateRepository", &FailingPolicies)
            .unwrap_err();
        assert!(matches!(err, HawkError::Connection { .. }));
    }

    #[test]
    fn repository_without_a_policy_is_not_flagged() {
        let records = vec![repo_record("CreateRepository", Some("team/api"))];
        let policies = MapPolicies::new(Vec::new());

        let findings =
            detect_public_repositories(&records, "CreateRepository", &policies).unwrap();
        assert!(findings.is_empty());
    }
}
