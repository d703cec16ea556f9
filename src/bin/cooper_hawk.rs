//! CloudTrail log normalizer in Rust
//!
//! # Usage
//! ```text
//!     cooper_hawk [FLAGS] -d <LOCALDIR> -f <FILEFORMAT> -o <OUTPUT>
//!
//!FLAGS:
//!    -v, --verbose    Sets the level of debugging information
//!    -h, --help       Prints help information
//!    -V, --version    Prints version information
//!
//!OPTIONS:
//!    -d, --localdir <LOCALDIR>        Directory containing the downloaded log archives
//!    -f, --fileformat <FILEFORMAT>    Suffix of the archives to combine (e.g. .json.gz)
//!    -o, --outputfile <OUTPUT>        Path the combined table is written to
//! ```

#[macro_use]
extern crate clap;

use clap::ArgMatches;
use log::{self, error, info};
use std::path::Path;
use trail_hawks::log_merging::{merge_trail_logs, write_table};
use trail_hawks::{set_logging, HawkError};

fn main() {
    let matches = clap_app!(cooper_hawk =>
        (version: "0.3.1")
        (about: "Combines CloudTrail log archives and generates one table for further analysis")
        (@arg LOCALDIR: -d --localdir +takes_value +required "Local directory that contains the files downloaded from the S3 bucket")
        (@arg FILEFORMAT: -f --fileformat +takes_value +required "Suffix of the archives to combine (e.g. .json.gz); anything else is skipped")
        (@arg OUTPUT: -o --outputfile +takes_value +required "Path the combined table is written to")
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

    let local_dir = Path::new(arg_matches.value_of("LOCALDIR").unwrap());
    let file_format = arg_matches.value_of("FILEFORMAT").unwrap();
    let output_file = arg_matches.value_of("OUTPUT").unwrap();

    let (records, summary) = merge_trail_logs(local_dir, file_format)?;
    if summary.files_merged == 0 {
        info!("nothing to combine; no table written");
        println!(
            "No files matching {} found under {}",
            file_format,
            local_dir.display()
        );
        return Ok(());
    }

    write_table(&records, Path::new(output_file))?;
    println!(
        "Combined {} records from {} files into {} ({} files skipped)",
        records.len(),
        summary.files_merged,
        output_file,
        summary.files_skipped
    );
    Ok(())
}
