//! Bulk retrieval of CloudTrail archives from an S3 bucket.
//!
//! Rides on the [rust-s3](https://github.com/durch/rust-s3) library's blocking
//! API. Credentials resolve through the standard AWS credentials files for the
//! given profile.

use crate::HawkError;
use log::{debug, info};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::fs;
use std::path::Path;

/// Downloads every object under `key_prefix` in the named bucket into
/// `local_dir`, using each key's final path segment as the local filename.
/// The directory is created when missing. Returns the number of files
/// downloaded.
pub fn download_bucket(
    bucket_name: &str,
    key_prefix: &str,
    region_name: &str,
    profile: Option<&str>,
    local_dir: &Path,
) -> Result<usize, HawkError> {
    let credentials = Credentials::new(None, None, None, None, profile).map_err(|e| {
        HawkError::connection(
            "loading AWS credentials",
            profile.unwrap_or("default"),
            e,
        )
    })?;
    let region: Region = region_name
        .parse()
        .map_err(|e| HawkError::parse(format!("S3 region {:?}", region_name), e))?;
    let bucket = Bucket::new(bucket_name, region, credentials)
        .map_err(|e| HawkError::connection("opening bucket", bucket_name, e))?;

    let results = bucket
        .list_blocking(key_prefix.to_string(), None)
        .map_err(|e| HawkError::connection("s3:ListObjects", bucket_name, e))?;
    let keys: Vec<String> = results
        .into_iter()
        .flat_map(|(list, _)| list.contents)
        .map(|object| object.key)
        .filter(|key| !key.ends_with('/'))
        .collect();
    debug!("keys: {:?}", keys);

    fs::create_dir_all(local_dir).map_err(|e| HawkError::io(local_dir, e))?;

    let mut downloaded = 0;
    for key in keys {
        let (data, _code) = bucket
            .get_object_blocking(&key)
            .map_err(|e| HawkError::connection("s3:GetObject", &key, e))?;
        let filename = key.rsplit('/').next().unwrap_or(key.as_str());
        let filepath = local_dir.join(filename);
        fs::write(&filepath, data).map_err(|e| HawkError::io(filepath.as_path(), e))?;
        info!("downloaded {} to {}", key, filepath.display());
        downloaded += 1;
    }
    Ok(downloaded)
}
