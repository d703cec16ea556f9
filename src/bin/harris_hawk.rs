//! CloudTrail log retriever in Rust
//!
//! # Usage
//! ```text
//!     harris_hawk [FLAGS] [OPTIONS] <S3URI> <S3REGION> -d <LOCALDIR>
//!
//!FLAGS:
//!    -v, --verbose    Sets the level of debugging information
//!    -h, --help       Prints help information
//!    -V, --version    Prints version information
//!
//!OPTIONS:
//!    -d, --localdir <LOCALDIR>    Directory the log files are downloaded into
//!        --profile <PROFILE>      Use a non-default AWS credentials profile
//!
//!ARGS:
//!    <S3URI>       The bucket holding the CloudTrail logs, written as s3://mybucket[/prefix]
//!    <S3REGION>    Sets the region of the S3 bucket to read from
//! ```

#[macro_use]
extern crate clap;

use clap::ArgMatches;
use log::{self, debug, error, info};
use std::path::Path;
use trail_hawks::aws_clients::s3::download_bucket;
use trail_hawks::{set_logging, HawkError};
use url::Url;

fn main() {
    let matches = clap_app!(harris_hawk =>
        (version: "0.3.2")
        (about: "CloudTrail log retriever in Rust. Downloads a bucket of log archives for offline analysis.")
        (@arg S3URI: +required "The bucket holding the CloudTrail logs. This must be written in the form s3://mybucket[/prefix]")
        (@arg S3REGION: +required "Sets the region of the S3 bucket to read from.")
        (@arg LOCALDIR: -d --localdir +takes_value +required "Directory the log files are downloaded into. Created if it does not exist.")
        (@arg PROFILE: --profile +takes_value "Use a non-default AWS credentials profile")
        (@arg VERBOSE: -v --verbose ... "Sets the level of debugging information")
    )
    .get_matches();
    match run(&matches) {
        Ok(()) => {}
        Err(e) => {
            error!("Error running command: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(arg_matches: &ArgMatches) -> Result<(), HawkError> {
    // Set logging
    set_logging(arg_matches.occurrences_of("VERBOSE"));

    let url: Url = Url::parse(arg_matches.value_of("S3URI").unwrap())
        .map_err(|e| HawkError::parse("S3URI", e))?;
    let bucket_name = url
        .host_str()
        .ok_or_else(|| HawkError::parse("S3URI", "bucket name not detected"))?;
    debug!("bucket_name: {:?}", bucket_name);
    let key_prefix = match url.path() {
        "/" => "",
        path => path.trim_start_matches('/'),
    };

    let region = arg_matches.value_of("S3REGION").unwrap();
    let profile = arg_matches.value_of("PROFILE");
    let local_dir = Path::new(arg_matches.value_of("LOCALDIR").unwrap());

    let downloaded = download_bucket(bucket_name, key_prefix, region, profile, local_dir)?;
    info!("{} objects retrieved from {}", downloaded, bucket_name);
    println!("Number of files downloaded -> {}", downloaded);
    Ok(())
}
