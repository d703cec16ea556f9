//! # Trail Hawks
//!
//! Trail Hawks is a Rust crate for investigating suspicious activity in an AWS
//! account using CloudTrail logs. It is split into two parts:
//! 1. A library holding the building blocks: merging raw CloudTrail archives
//! into one flat table, testing IP provenance against the published AWS ranges,
//! and the detection pipelines for stolen credentials and public registries.
//! 2. A set of binaries - * Hawk - that each wire one investigation workflow to
//! the command line and output a JSON array of findings.
//!
//! ## Checking IP provenance
//!
//! The provider publishes its address ranges as a JSON document; only entries
//! tagged with the `AMAZON` umbrella service are kept.
//!
//! ```
//! use trail_hawks::ip_ranges::IpRangeSet;
//! let document = r##"{ "prefixes": [
//!     { "ip_prefix": "52.94.0.0/22", "region": "us-east-1", "service": "AMAZON" }
//! ] }"##;
//! let ranges = IpRangeSet::from_json_str(document).unwrap();
//! assert!(ranges.contains("52.94.0.1").unwrap());
//! assert!(!ranges.contains("8.8.8.8").unwrap());
//! ```
//!
//! ## Extracting the role behind an assumed-role identity
//!
//! ```
//! use trail_hawks::theft_detection::role_name_from_arn;
//! let arn = "arn:aws:sts::111111111111:assumed-role/deploy-role/session-1";
//! assert_eq!(role_name_from_arn(arn).unwrap(), "deploy-role");
//! ```

pub mod aws_clients;
pub mod exposure_detection;
pub mod ip_ranges;
pub mod log_merging;
pub mod theft_detection;

use log::LevelFilter;
use serde::Serialize;
use simple_logger::SimpleLogger;
use std::fmt;
use std::path::PathBuf;
use std::{fs, str};
use thiserror::Error;

/// Failures surfaced by the library.
///
/// Every external-collaborator call is wrapped so that a failure carries the
/// operation and the resource it was issued against; the batch aborts rather
/// than silently dropping rows.
#[derive(Error, Debug)]
pub enum HawkError {
    /// Authentication or network failure against the cloud provider.
    #[error("{operation} failed for {resource}: {message}")]
    Connection {
        operation: String,
        resource: String,
        message: String,
    },
    /// An expected local directory is absent.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    /// Malformed IP literal, CIDR prefix, log file, or policy document.
    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },
    /// An identity ARN that does not split into the expected segments.
    #[error("malformed identity ARN: {0}")]
    MalformedArn(String),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HawkError {
    pub fn connection(operation: &str, resource: &str, err: impl fmt::Display) -> Self {
        HawkError::Connection {
            operation: operation.to_string(),
            resource: resource.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(context: impl Into<String>, err: impl fmt::Display) -> Self {
        HawkError::Parse {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HawkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Helper function to set the global logging level from a `-v` occurrence count.
pub fn set_logging(verbose_level: u64) {
    let logger = SimpleLogger::new();
    match verbose_level {
        0 => logger.with_level(LevelFilter::Warn).init().unwrap(),
        1 => logger.with_level(LevelFilter::Info).init().unwrap(),
        2 => logger.with_level(LevelFilter::Debug).init().unwrap(),
        _ => logger.with_level(LevelFilter::Trace).init().unwrap(),
    }
}

/// Writes findings as a JSON array to `output_path`, or to stdout when no path
/// is given. An empty slice still produces `[]` so "nothing detected" stays
/// distinguishable from a failed run.
pub fn output_findings<T: Serialize>(
    findings: &[T],
    pretty_print: bool,
    output_path: Option<&str>,
) -> Result<(), HawkError> {
    let json_text = if pretty_print {
        serde_json::ser::to_vec_pretty(findings)
    } else {
        serde_json::ser::to_vec(findings)
    }
    .map_err(|e| HawkError::parse("findings", e))?;
    match output_path {
        Some(path) => fs::write(path, json_text).map_err(|e| HawkError::io(path, e))?,
        None => println!("{}", str::from_utf8(&json_text).unwrap_or("<invalid utf-8>")),
    }
    Ok(())
}
