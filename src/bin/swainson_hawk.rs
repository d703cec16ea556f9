//! Public repository detector in Rust
//!
//! Walks the repositories named by a resource-creation or modification event
//! in the normalized CloudTrail table and flags every one whose ECR policy
//! grants access to the wildcard principal.
//!
//! # Usage
//! ```text
//!     swainson_hawk [FLAGS] [OPTIONS] -i <INPUT> -p <PROFILE> -e <EVENT>
//!
//!FLAGS:
//!        --prettyprint    Outputs the JSON in human readable format
//!    -v, --verbose        Sets the level of debugging information
//!    -h, --help           Prints help information
//!    -V, --version        Prints version information
//!
//!OPTIONS:
//!    -i, --inputfile <INPUT>      Table of normalized CloudTrail events to scan
//!    -p, --profile <PROFILE>      AWS credentials profile used for policy lookups
//!    -e, --event <EVENT>          Event name that narrows the scan to repository-scoped records
//!    -o, --outputfile <OUTPUT>    Sets the path to write the findings to (stdout by default)
//! ```

#[macro_use]
extern crate clap;

use clap::ArgMatches;
use log::{self, error, info};
use std::path::Path;
use trail_hawks::aws_clients::ecr::AwsRepositoryPolicies;
use trail_hawks::exposure_detection::detect_public_repositories;
use trail_hawks::log_merging::read_table;
use trail_hawks::{output_findings, set_logging, HawkError};

fn main() {
    let matches = clap_app!(swainson_hawk =>
        (version: "0.3.1")
        (about: "Identifies public container registry repositories in an AWS environment")
        (@arg INPUT: -i --inputfile +takes_value +required "Table of normalized CloudTrail events to scan")
        (@arg PROFILE: -p --profile +takes_value +required "AWS credentials profile used for repository policy lookups")
        (@arg EVENT: -e --event +takes_value +required "An event name as captured by CloudTrail. Only records for this event are analyzed")
        (@arg OUTPUT: -o --outputfile +takes_value "Sets the path to write the findings to (stdout by default)")
        (@arg PRETTYPRINT: --prettyprint "Outputs the JSON in human readable format")
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

    let input_file = Path::new(arg_matches.value_of("INPUT").unwrap());
    let profile = arg_matches.value_of("PROFILE").unwrap();
    let event_name = arg_matches.value_of("EVENT").unwrap();
    let pretty_print = arg_matches.is_present("PRETTYPRINT");
    let output_path = arg_matches.value_of("OUTPUT");

    let records = read_table(input_file)?;
    info!("loaded {} records from {}", records.len(), input_file.display());
    let policies = AwsRepositoryPolicies::new(profile)?;

    let findings = detect_public_repositories(&records, event_name, &policies)?;
    info!("Found {} public repositories", findings.len());
    output_findings(&findings, pretty_print, output_path)?;
    Ok(())
}
