//! Merges compressed CloudTrail log archives into one flat table.
//!
//! CloudTrail delivers gzipped JSON documents, each holding a top-level
//! `Records` array of event objects. This module walks a local directory tree,
//! parses every file matching the configured suffix, projects the handful of
//! identity and request fields the detectors care about, and reads/writes the
//! result as a delimited table suitable for repeated filtering passes.
//!
//! Files that do not match the suffix are skipped with a logged notice. A file
//! that matches but fails to decompress or parse aborts the whole merge; a
//! partially-built table is never written.

use crate::HawkError;
use flate2::read::GzDecoder;
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use walkdir::WalkDir;

/// Sentinel account id CloudTrail assigns to unauthenticated callers.
pub const ANONYMOUS_PRINCIPAL: &str = "ANONYMOUS_PRINCIPAL";

/// One normalized audit event. Column names match the source field paths so
/// the table stays recognizable next to the raw logs. Fields absent in the
/// source event are empty, never defaulted to a non-empty sentinel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    #[serde(rename = "eventTime")]
    pub event_time: String,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
    #[serde(rename = "userIdentityArn")]
    pub user_identity_arn: String,
    #[serde(rename = "userIdentityAccountId")]
    pub user_identity_account_id: String,
    #[serde(rename = "userIdentityType")]
    pub user_identity_type: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "requestParametersRepositoryName")]
    pub request_parameters_repository_name: Option<String>,
}

/// Counters reported back to the caller after a merge.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeSummary {
    pub files_merged: usize,
    pub files_skipped: usize,
}

#[derive(Deserialize)]
struct TrailDocument {
    #[serde(rename = "Records", default)]
    records: Vec<TrailEvent>,
}

#[derive(Deserialize)]
struct TrailEvent {
    #[serde(rename = "eventTime")]
    event_time: Option<String>,
    #[serde(rename = "sourceIPAddress")]
    source_ip_address: Option<String>,
    #[serde(rename = "userIdentity")]
    user_identity: Option<TrailIdentity>,
    #[serde(rename = "eventName")]
    event_name: Option<String>,
    #[serde(rename = "requestParameters")]
    request_parameters: Option<Value>,
}

#[derive(Deserialize, Default)]
struct TrailIdentity {
    arn: Option<String>,
    #[serde(rename = "accountId")]
    account_id: Option<String>,
    #[serde(rename = "type")]
    identity_type: Option<String>,
}

impl TrailEvent {
    fn into_record(self) -> LogRecord {
        let identity = self.user_identity.unwrap_or_default();
        let repository_name = self
            .request_parameters
            .as_ref()
            .and_then(|parameters| parameters.get("repositoryName"))
            .and_then(Value::as_str)
            .map(String::from);
        LogRecord {
            event_time: self.event_time.unwrap_or_default(),
            source_ip_address: self.source_ip_address.unwrap_or_default(),
            user_identity_arn: identity.arn.unwrap_or_default(),
            user_identity_account_id: identity.account_id.unwrap_or_default(),
            user_identity_type: identity.identity_type.unwrap_or_default(),
            event_name: self.event_name.unwrap_or_default(),
            request_parameters_repository_name: repository_name,
        }
    }
}

/// Recursively merges every log archive under `local_dir` whose file name ends
/// with `file_format` (e.g. `.json.gz`) into one record set.
pub fn merge_trail_logs(
    local_dir: &Path,
    file_format: &str,
) -> Result<(Vec<LogRecord>, MergeSummary), HawkError> {
    if !local_dir.is_dir() {
        return Err(HawkError::MissingDirectory(local_dir.to_path_buf()));
    }

    let mut records: Vec<LogRecord> = Vec::new();
    let mut summary = MergeSummary::default();
    for entry in WalkDir::new(local_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !file_name.ends_with(file_format) {
            info!(
                "Skipping file {} as it is not in {} format",
                entry.path().display(),
                file_format
            );
            summary.files_skipped += 1;
            continue;
        }
        let file = File::open(entry.path()).map_err(|e| HawkError::io(entry.path(), e))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let document: TrailDocument = serde_json::from_reader(decoder)
            .map_err(|e| HawkError::parse(format!("log file {}", entry.path().display()), e))?;
        debug!(
            "{}: {} events",
            entry.path().display(),
            document.records.len()
        );
        records.extend(document.records.into_iter().map(TrailEvent::into_record));
        summary.files_merged += 1;
    }
    info!(
        "merged {} files ({} skipped), {} records",
        summary.files_merged,
        summary.files_skipped,
        records.len()
    );
    Ok((records, summary))
}

fn table_error(path: &Path, err: csv::Error) -> HawkError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => HawkError::io(path, source),
        other => HawkError::parse(
            format!("delimited table {}", path.display()),
            format!("{:?}", other),
        ),
    }
}

/// Writes the record set as a delimited table with one header row.
pub fn write_table(records: &[LogRecord], output: &Path) -> Result<(), HawkError> {
    let mut writer = csv::Writer::from_path(output).map_err(|e| table_error(output, e))?;
    for record in records {
        writer.serialize(record).map_err(|e| table_error(output, e))?;
    }
    writer.flush().map_err(|e| HawkError::io(output, e))?;
    Ok(())
}

/// Loads a table previously produced by [`write_table`].
pub fn read_table(input: &Path) -> Result<Vec<LogRecord>, HawkError> {
    let mut reader = csv::Reader::from_path(input).map_err(|e| table_error(input, e))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: LogRecord = row.map_err(|e| table_error(input, e))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::collections::HashSet;
    use std::io::Write;

    fn write_log_file(dir: &Path, name: &str, events: &[Value]) {
        let document = json!({ "Records": events });
        let file = File::create(dir.join(name)).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(document.to_string().as_bytes())
            .unwrap();
        encoder.finish().unwrap();
    }

    fn sample_event(event_name: &str, source_ip: &str) -> Value {
        json!({
            "eventVersion": "1.08",
            "eventTime": "2021-03-01T12:00:00Z",
            "sourceIPAddress": source_ip,
            "userIdentity": {
                "type": "AssumedRole",
                "arn": "arn:aws:sts::111111111111:assumed-role/deploy-role/session-1",
                "accountId": "111111111111"
            },
            "eventName": event_name
        })
    }

    #[test]
    fn merges_records_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write_log_file(dir.path(), "a.json.gz", &[sample_event("PutObject", "8.8.8.8")]);
        write_log_file(
            dir.path(),
            "b.json.gz",
            &[
                sample_event("GetObject", "52.94.0.1"),
                sample_event("CreateRepository", "52.94.0.2"),
            ],
        );

        let (records, summary) = merge_trail_logs(dir.path(), ".json.gz").unwrap();
        assert_eq!(summary.files_merged, 2);
        assert_eq!(summary.files_skipped, 0);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn skips_files_not_matching_the_suffix() {
        let dir = tempfile::tempdir().unwrap();
        write_log_file(dir.path(), "a.json.gz", &[sample_event("PutObject", "8.8.8.8")]);
        std::fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        let (records, summary) = merge_trail_logs(dir.path(), ".json.gz").unwrap();
        assert_eq!(summary.files_merged, 1);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = merge_trail_logs(Path::new("/no/such/dir"), ".json.gz").unwrap_err();
        assert!(matches!(err, HawkError::MissingDirectory(_)));
    }

    #[test]
    fn merge_is_order_independent_across_files() {
        let first = sample_event("PutObject", "8.8.8.8");
        let second = sample_event("GetObject", "52.94.0.1");

        let dir_ab = tempfile::tempdir().unwrap();
        write_log_file(dir_ab.path(), "a.json.gz", &[first.clone()]);
        write_log_file(dir_ab.path(), "b.json.gz", &[second.clone()]);

        let dir_ba = tempfile::tempdir().unwrap();
        write_log_file(dir_ba.path(), "a.json.gz", &[second]);
        write_log_file(dir_ba.path(), "b.json.gz", &[first]);

        let (records_ab, _) = merge_trail_logs(dir_ab.path(), ".json.gz").unwrap();
        let (records_ba, _) = merge_trail_logs(dir_ba.path(), ".json.gz").unwrap();
        let set_ab: HashSet<LogRecord> = records_ab.into_iter().collect();
        let set_ba: HashSet<LogRecord> = records_ba.into_iter().collect();
        assert_eq!(set_ab, set_ba);
    }

    #[test]
    fn repository_name_is_projected_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut event = sample_event("CreateRepository", "52.94.0.1");
        event["requestParameters"] = json!({ "repositoryName": "team/api" });
        write_log_file(dir.path(), "a.json.gz", &[event]);

        let (records, _) = merge_trail_logs(dir.path(), ".json.gz").unwrap();
        assert_eq!(
            records[0].request_parameters_repository_name.as_deref(),
            Some("team/api")
        );
    }

    #[test]
    fn absent_fields_become_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_log_file(dir.path(), "a.json.gz", &[json!({ "eventName": "PutObject" })]);

        let (records, _) = merge_trail_logs(dir.path(), ".json.gz").unwrap();
        let record = &records[0];
        assert_eq!(record.event_name, "PutObject");
        assert_eq!(record.event_time, "");
        assert_eq!(record.user_identity_arn, "");
        assert_eq!(record.user_identity_type, "");
        assert!(record.request_parameters_repository_name.is_none());
    }

    #[test]
    fn corrupt_file_fails_the_whole_merge() {
        let dir = tempfile::tempdir().unwrap();
        write_log_file(dir.path(), "a.json.gz", &[sample_event("PutObject", "8.8.8.8")]);
        std::fs::write(dir.path().join("bad.json.gz"), "definitely not gzip").unwrap();

        let err = merge_trail_logs(dir.path(), ".json.gz").unwrap_err();
        assert!(matches!(err, HawkError::Parse { .. }));
    }

    #[test]
    fn table_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut event = sample_event("CreateRepository", "52.94.0.1");
        event["requestParameters"] = json!({ "repositoryName": "team/api" });
        write_log_file(dir.path(), "a.json.gz", &[event, sample_event("PutObject", "8.8.8.8")]);

        let (records, _) = merge_trail_logs(dir.path(), ".json.gz").unwrap();
        let table = dir.path().join("trail.csv");
        write_table(&records, &table).unwrap();
        let reloaded = read_table(&table).unwrap();
        assert_eq!(records, reloaded);
    }
}
