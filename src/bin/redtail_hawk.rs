//! Credential theft detector in Rust
//!
//! Flags CloudTrail events where assumed-role credentials were used from an IP
//! address outside every published AWS range, for roles that AWS services are
//! trusted to assume - the classic signature of exfiltrated instance or task
//! credentials.
//!
//! # Usage
//! ```text
//!     redtail_hawk [FLAGS] [OPTIONS] -i <INPUT> -p <PROFILE>
//!
//!FLAGS:
//!        --prettyprint    Outputs the JSON in human readable format
//!    -v, --verbose        Sets the level of debugging information
//!    -h, --help           Prints help information
//!    -V, --version        Prints version information
//!
//!OPTIONS:
//!    -i, --inputfile <INPUT>      Table of normalized CloudTrail events to scan
//!    -p, --profile <PROFILE>      AWS credentials profile used for role lookups
//!    -e, --event <EVENT>          Only scan events with this name; all events otherwise
//!        --ipranges <IPRANGES>    Path to the published AWS IP ranges document (ip-ranges.json by default)
//!    -o, --outputfile <OUTPUT>    Sets the path to write the findings to (stdout by default)
//! ```

#[macro_use]
extern crate clap;

use clap::ArgMatches;
use log::{self, error, info};
use std::path::Path;
use trail_hawks::aws_clients::iam::AwsRoleTrust;
use trail_hawks::ip_ranges::IpRangeSet;
use trail_hawks::log_merging::read_table;
use trail_hawks::theft_detection::detect_credential_theft;
use trail_hawks::{output_findings, set_logging, HawkError};

fn main() {
    let matches = clap_app!(redtail_hawk =>
        (version: "0.3.2")
        (about: "Identifies credential theft from CloudTrail logs")
        (@arg INPUT: -i --inputfile +takes_value +required "Table of normalized CloudTrail events to scan")
        (@arg PROFILE: -p --profile +takes_value +required "AWS credentials profile used for role trust-policy lookups")
        (@arg EVENT: -e --event +takes_value "An event name as captured by CloudTrail. Optional; if not provided, all events in the table are scanned")
        (@arg IPRANGES: --ipranges +takes_value "Path to the published AWS IP ranges document, ip-ranges.json by default")
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
    let event_name = arg_matches.value_of("EVENT");
    let ranges_path = arg_matches
        .value_of("IPRANGES")
        .unwrap_or("ip-ranges.json");
    let pretty_print = arg_matches.is_present("PRETTYPRINT");
    let output_path = arg_matches.value_of("OUTPUT");

    let records = read_table(input_file)?;
    info!("loaded {} records from {}", records.len(), input_file.display());
    let provider_ranges = IpRangeSet::from_file(Path::new(ranges_path))?;
    let role_trust = AwsRoleTrust::new(profile)?;

    let findings = detect_credential_theft(&records, event_name, &provider_ranges, &role_trust)?;
    info!("Found {} suspected credential theft events", findings.len());
    output_findings(&findings, pretty_print, output_path)?;
    Ok(())
}
