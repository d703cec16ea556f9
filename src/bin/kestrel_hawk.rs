//! Account identity diagnostic in Rust
//!
//! Confirms which account a credentials profile resolves to and lists the
//! buckets it can see. Useful before an investigation to verify that an
//! assumed cross-account role actually lands where expected.
//!
//! # Usage
//! ```text
//!     kestrel_hawk [FLAGS] -p <PROFILE>
//!
//!FLAGS:
//!    -v, --verbose    Sets the level of debugging information
//!    -h, --help       Prints help information
//!    -V, --version    Prints version information
//!
//!OPTIONS:
//!    -p, --profile <PROFILE>    AWS credentials profile to resolve
//! ```

#[macro_use]
extern crate clap;

use clap::ArgMatches;
use log::{self, error};
use trail_hawks::aws_clients::sts::identity_report;
use trail_hawks::{set_logging, HawkError};

fn main() {
    let matches = clap_app!(kestrel_hawk =>
        (version: "0.2.0")
        (about: "Resolves the caller identity behind an AWS credentials profile")
        (@arg PROFILE: -p --profile +takes_value +required "AWS credentials profile to resolve")
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

    let profile = arg_matches.value_of("PROFILE").unwrap();
    let report = identity_report(profile)?;

    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| HawkError::parse("identity report", e))?;
    println!("Account details for profile {}:", profile);
    println!("{}", text);
    Ok(())
}
