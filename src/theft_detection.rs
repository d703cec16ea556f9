//! Heuristic for spotting stolen assumed-role credentials.
//!
//! Temporary credentials handed to an AWS service (EC2, ECS, Lambda, ...) are
//! only ever used from inside the provider's own network. An API call made
//! with such credentials from an address outside every published provider
//! range is therefore a strong signal the credentials were exfiltrated. The
//! detector walks the normalized table, narrows it to assumed-role identities,
//! and cross-references each role's trust policy with the provenance of the
//! calling IP.
//!
//! Pre-filters, applied as one conjunction over each row:
//! - an optional event-name equality filter;
//! - `AWSService` identities are dropped (the provider calling itself);
//! - rows are dropped when the identity type is `AWSAccount` *or* the account
//!   id is the anonymous-caller sentinel. The two conditions are a single
//!   OR-grouped exclusion: cross-account and unauthenticated callers are both
//!   out of scope for this heuristic.

use crate::ip_ranges::IpRangeSet;
use crate::log_merging::{LogRecord, ANONYMOUS_PRINCIPAL};
use crate::HawkError;
use log::debug;
use serde_derive::Serialize;
use std::collections::HashMap;

const ASSUMED_ROLE: &str = "AssumedRole";
const AWS_SERVICE: &str = "AWSService";
const AWS_ACCOUNT: &str = "AWSAccount";

/// Domain suffix marking a trusted principal as one of the provider's own
/// service-to-service trust relationships.
pub const SERVICE_DOMAIN_MARKER: &str = "amazonaws.com";

/// Source of trust-policy information for a role, keyed by role name.
///
/// Implementations take their credentials explicitly at construction time;
/// there is no implicit shared session. Lookups are pure within one run.
pub trait RoleTrustFetcher {
    /// Service identifiers permitted to assume the named role. Empty when the
    /// role has no matching trust statements.
    fn trusted_services(&self, role_name: &str) -> Result<Vec<String>, HawkError>;
}

/// One suspected use of stolen credentials: an assumed-role call from outside
/// the provider's ranges, for a role the provider's own services are trusted
/// to assume. One finding is emitted per matching trusted service.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TheftFinding {
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
    #[serde(rename = "roleName")]
    pub role_name: String,
    #[serde(rename = "trustedService")]
    pub trusted_service: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventTime")]
    pub event_time: String,
}

/// Extracts the role name from an assumed-role identity ARN, e.g.
/// `arn:aws:sts::111111111111:assumed-role/deploy-role/session-1` ->
/// `deploy-role`. The ARN must carry six colon-separated segments, the last of
/// which holds the role name right after the role-type marker.
pub fn role_name_from_arn(arn: &str) -> Result<String, HawkError> {
    let segments: Vec<&str> = arn.split(':').collect();
    if segments.len() != 6 {
        return Err(HawkError::MalformedArn(arn.to_string()));
    }
    let resource: Vec<&str> = segments[5].split('/').collect();
    if resource.len() < 2 || resource[1].is_empty() {
        return Err(HawkError::MalformedArn(arn.to_string()));
    }
    Ok(resource[1].to_string())
}

/// Runs the credential-theft heuristic over a normalized table.
///
/// Findings keep table scan order. An empty result means nothing was detected;
/// any lookup or parse failure aborts the whole run instead of producing a
/// partial report.
pub fn detect_credential_theft(
    records: &[LogRecord],
    event_name: Option<&str>,
    provider_ranges: &IpRangeSet,
    role_trust: &dyn RoleTrustFetcher,
) -> Result<Vec<TheftFinding>, HawkError> {
    let mut findings: Vec<TheftFinding> = Vec::new();
    // Trust lookups are pure within a run, so fetch once per distinct role.
    let mut trusted_cache: HashMap<String, Vec<String>> = HashMap::new();

    for record in records {
        if let Some(wanted) = event_name {
            if record.event_name != wanted {
                continue;
            }
        }
        if record.user_identity_type == AWS_SERVICE {
            continue;
        }
        if record.user_identity_type == AWS_ACCOUNT
            || record.user_identity_account_id == ANONYMOUS_PRINCIPAL
        {
            continue;
        }
        if record.user_identity_type != ASSUMED_ROLE {
            continue;
        }

        let role_name = role_name_from_arn(&record.user_identity_arn)?;
        if !trusted_cache.contains_key(&role_name) {
            let services = role_trust.trusted_services(&role_name)?;
            debug!("role {} trusts {:?}", role_name, services);
            trusted_cache.insert(role_name.clone(), services);
        }
        let trusted = &trusted_cache[&role_name];

        if provider_ranges.contains(&record.source_ip_address)? {
            continue;
        }
        for service in trusted.iter() {
            if !service.contains(SERVICE_DOMAIN_MARKER) {
                continue;
            }
            findings.push(TheftFinding {
                source_ip_address: record.source_ip_address.clone(),
                role_name: role_name.clone(),
                trusted_service: service.clone(),
                event_name: record.event_name.clone(),
                event_time: record.event_time.clone(),
            });
        }
    }
    Ok(findings)
}
