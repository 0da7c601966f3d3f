//! gotest-teamcity: `go test -v` to TeamCity service messages
//!
//! Reads test output on stdin and writes service messages on stdout.
//!
//! ```text
//! go test -v ./... 2>&1 | gotest-teamcity --name linux
//! ```

use std::io::{self, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use gotest_events::SystemClock;
use gotest_teamcity::config::Config;
use gotest_teamcity::{logging, run, write_summary};
use tracing::error;

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(err) = logging::init(config.log_level()) {
        eprintln!("gotest-teamcity: logging disabled: {err}");
    }

    if let Err(err) = config.validate() {
        error!(%err, "invalid configuration");
        return ExitCode::from(2);
    }

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());

    let summary = match run(&config, stdin, stdout, SystemClock) {
        Ok(summary) => summary,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    if config.summary {
        if let Err(err) = write_summary(&summary, io::stderr().lock()) {
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
