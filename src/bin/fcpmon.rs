#![deny(unsafe_code)]

//! `fcpmon`: console client and monitor for a local Freenet node's FCP
//! port. All behaviour lives in the `cli` crate; this binary only wires the
//! process arguments and standard streams into [`cli::run_with`].

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    ExitCode::from(cli::run_with(std::env::args(), &mut stdout, &mut stderr))
}
