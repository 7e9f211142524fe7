#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the command-line front-end for `fcpmon`: it parses the
//! argument surface (freenet URIs to fetch, identifiers to watch or cancel,
//! job options), connects to the local node's FCP port, assembles a
//! [`Session`](fcpmon_core::Session), and renders the session's event feed
//! as coloured status lines and in-place progress bars.
//!
//! # Design
//!
//! The crate exposes [`run_with`] as the primary entry point. The function
//! accepts an iterator of arguments together with handles for standard
//! output and error, so integration tests can drive the full surface
//! in-process. Argument recognition uses a
//! [`clap`](https://docs.rs/clap/) builder command; positional operands are
//! classified afterwards into URIs and watch identifiers.
//!
//! # Invariants
//!
//! - [`run_with`] never panics; connection and protocol failures surface as
//!   non-zero exit codes with a diagnostic on standard error.
//! - Rendering happens exclusively through the
//!   [`SessionObserver`](fcpmon_core::SessionObserver) boundary; the session
//!   engine never writes to the terminal itself.

use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process;

use protocol::{Message, DEFAULT_FCP_PORT};
use tracing_subscriber::EnvFilter;

use fcpmon_core::exit_code::{FAILURE, SUCCESS, USAGE};
use fcpmon_core::{FetchOptions, Session, SessionConfig, TcpConnection};

pub mod arguments;
pub mod format;
pub mod render;

use arguments::ParsedArgs;
use render::Renderer;

/// Installs the tracing subscriber, filtered by `RUST_LOG`.
///
/// Diagnostics go to standard error so they never interleave with the
/// rendered progress output. A second initialisation (tests drive
/// [`run_with`] repeatedly) is ignored.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

/// Client name advertised when none is configured.
fn default_client_name(args: &ParsedArgs) -> String {
    if args.download_uris.is_empty() {
        format!("fcpmon-monitor-{}", process::id())
    } else {
        "fcpmon".to_owned()
    }
}

/// Runs the monitor with explicit argument and output handles.
///
/// Returns the process exit code: `0` on clean shutdown, `1` on connection
/// or protocol failure, `2` on a usage error.
pub fn run_with<I, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> u8
where
    I: IntoIterator<Item = String>,
    Out: Write,
    Err: Write,
{
    init_tracing();

    let args = match arguments::parse_args(arguments) {
        Ok(args) => args,
        Err(error) => {
            if error.use_stderr() {
                let _ = write!(stderr, "{error}");
                return USAGE;
            }
            // Help and version requests render to stdout and succeed.
            let _ = write!(stdout, "{error}");
            return SUCCESS;
        }
    };

    let client_name = args
        .client_name
        .clone()
        .unwrap_or_else(|| default_client_name(&args));
    let addr = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        args.port.unwrap_or(DEFAULT_FCP_PORT),
    );

    match run_session(&args, &client_name, addr, stdout) {
        Ok(()) => SUCCESS,
        Err(error) => {
            tracing::error!(%error, "session failed");
            let _ = writeln!(stderr, "fcpmon: {error}");
            FAILURE
        }
    }
}

fn run_session<Out: Write>(
    args: &ParsedArgs,
    client_name: &str,
    addr: SocketAddr,
    stdout: &mut Out,
) -> Result<(), fcpmon_core::ClientError> {
    let mut connection = TcpConnection::connect(addr, client_name)?;
    connection.send(&Message::new("WatchGlobal"))?;

    let mut session = Session::new(SessionConfig {
        client_name: client_name.to_owned(),
        fetch_options: FetchOptions {
            persistent: args.persistent,
            extra: args.get_options.clone(),
            ..FetchOptions::default()
        },
    });

    if let Some(directory) = &args.download_dir {
        session.enable_directory(&mut connection, directory)?;
    }
    if !args.download_uris.is_empty() {
        session.fetch(&mut connection, &args.download_uris)?;
    }
    if !args.cancel_identifiers.is_empty() {
        session.cancel(&mut connection, &args.cancel_identifiers)?;
    }
    for identifier in &args.watch_identifiers {
        session.watch(identifier.clone());
    }
    if args.download_uris.is_empty()
        && args.cancel_identifiers.is_empty()
        && args.watch_identifiers.is_empty()
    {
        session.watch_everything();
    }

    let use_colors =
        std::env::var_os("NO_COLOR").is_none() && terminal_size::terminal_size().is_some();
    let mut renderer = Renderer::new(stdout, use_colors);
    session.run(&mut connection, &mut renderer)
}
