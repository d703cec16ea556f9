//! Membership tests against the provider's published IP ranges.
//!
//! AWS publishes the address space it owns as a JSON document
//! (<https://docs.aws.amazon.com/general/latest/gr/aws-ip-ranges.html>) with a
//! `prefixes` array of IPv4 CIDR entries and an `ipv6_prefixes` array of IPv6
//! entries. Per that page, entries tagged with the `AMAZON` service cover all
//! ranges belonging to Amazon, so only those are loaded. The resulting set is
//! immutable for the lifetime of a detection run.
//!
//! The check itself is a linear scan over the loaded prefixes. The reference
//! document holds a few thousand entries and the scan runs once per table row
//! in a batch job, so no interval-tree style optimization is warranted.

use crate::HawkError;
use ipnet::IpNet;
use log::info;
use serde_derive::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Umbrella service identifier covering all provider-owned ranges.
const AMAZON_SERVICE: &str = "AMAZON";

#[derive(Deserialize)]
struct RangeDocument {
    #[serde(default)]
    prefixes: Vec<V4Entry>,
    #[serde(default)]
    ipv6_prefixes: Vec<V6Entry>,
}

#[derive(Deserialize)]
struct V4Entry {
    ip_prefix: String,
    service: String,
}

#[derive(Deserialize)]
struct V6Entry {
    ipv6_prefix: String,
    service: String,
}

/// An ordered set of CIDR prefixes belonging to the cloud provider.
#[derive(Debug, Clone)]
pub struct IpRangeSet {
    networks: Vec<IpNet>,
}

impl IpRangeSet {
    /// Loads the published range document from a local file.
    pub fn from_file(path: &Path) -> Result<Self, HawkError> {
        let text = fs::read_to_string(path).map_err(|e| HawkError::io(path, e))?;
        let ranges = Self::from_json_str(&text)?;
        info!(
            "loaded {} provider prefixes from {}",
            ranges.len(),
            path.display()
        );
        Ok(ranges)
    }

    /// Parses a range document, keeping only entries tagged `AMAZON`.
    pub fn from_json_str(document: &str) -> Result<Self, HawkError> {
        let document: RangeDocument = serde_json::from_str(document)
            .map_err(|e| HawkError::parse("IP range document", e))?;
        let cidrs = document
            .prefixes
            .iter()
            .filter(|entry| entry.service == AMAZON_SERVICE)
            .map(|entry| entry.ip_prefix.as_str())
            .chain(
                document
                    .ipv6_prefixes
                    .iter()
                    .filter(|entry| entry.service == AMAZON_SERVICE)
                    .map(|entry| entry.ipv6_prefix.as_str()),
            );
        Self::from_cidrs(cidrs)
    }

    /// Builds a set directly from CIDR strings, keeping the given order.
    pub fn from_cidrs<'a, I>(cidrs: I) -> Result<Self, HawkError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut networks = Vec::new();
        for cidr in cidrs {
            let network: IpNet = cidr
                .parse()
                .map_err(|e| HawkError::parse(format!("CIDR prefix {:?}", cidr), e))?;
            networks.push(network);
        }
        Ok(IpRangeSet { networks })
    }

    /// Whether `address` falls inside any loaded prefix. The address must be a
    /// valid IPv4 or IPv6 literal.
    pub fn contains(&self, address: &str) -> Result<bool, HawkError> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|e| HawkError::parse(format!("IP address {:?}", address), e))?;
        Ok(self.networks.iter().any(|network| network.contains(&ip)))
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DOCUMENT: &str = r#"{
        "syncToken": "1609459200",
        "createDate": "2021-01-01-00-00-00",
        "prefixes": [
            { "ip_prefix": "52.94.0.0/22", "region": "us-east-1", "service": "AMAZON" },
            { "ip_prefix": "52.94.4.0/24", "region": "eu-west-1", "service": "AMAZON" },
            { "ip_prefix": "198.51.100.0/24", "region": "us-east-1", "service": "CLOUDFRONT" }
        ],
        "ipv6_prefixes": [
            { "ipv6_prefix": "2600:1f00::/24", "region": "us-east-1", "service": "AMAZON" }
        ]
    }"#;

    #[test]
    fn address_inside_a_listed_network_is_contained() {
        let ranges = IpRangeSet::from_json_str(SAMPLE_DOCUMENT).unwrap();
        assert!(ranges.contains("52.94.0.1").unwrap());
        assert!(ranges.contains("52.94.4.200").unwrap());
    }

    #[test]
    fn address_outside_all_networks_is_not_contained() {
        let ranges = IpRangeSet::from_json_str(SAMPLE_DOCUMENT).unwrap();
        assert!(!ranges.contains("8.8.8.8").unwrap());
    }

    #[test]
    fn only_amazon_tagged_entries_are_loaded() {
        let ranges = IpRangeSet::from_json_str(SAMPLE_DOCUMENT).unwrap();
        assert_eq!(ranges.len(), 3);
        assert!(!ranges.contains("198.51.100.7").unwrap());
    }

    #[test]
    fn ipv6_prefixes_are_honored() {
        let ranges = IpRangeSet::from_json_str(SAMPLE_DOCUMENT).unwrap();
        assert!(ranges.contains("2600:1f00::1").unwrap());
        assert!(!ranges.contains("2001:db8::1").unwrap());
    }

    #[test]
    fn malformed_address_is_a_parse_error() {
        let ranges = IpRangeSet::from_json_str(SAMPLE_DOCUMENT).unwrap();
        let err = ranges.contains("not-an-address").unwrap_err();
        assert!(matches!(err, HawkError::Parse { .. }));
    }

    #[test]
    fn malformed_prefix_is_a_parse_error() {
        let err = IpRangeSet::from_cidrs(vec!["52.94.0.0/99"]).unwrap_err();
        assert!(matches!(err, HawkError::Parse { .. }));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = IpRangeSet::from_json_str("{ \"prefixes\": 17 }").unwrap_err();
        assert!(matches!(err, HawkError::Parse { .. }));
    }

    #[test]
    fn empty_set_contains_nothing() {
        let ranges = IpRangeSet::from_cidrs(Vec::new()).unwrap();
        assert!(ranges.is_empty());
        assert!(!ranges.contains("52.94.0.1").unwrap());
    }
}
