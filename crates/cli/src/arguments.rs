//! Command-line argument parsing and operand classification.

use clap::{Arg, ArgAction, Command};

/// Fproxy URL prefix accepted for convenience and stripped before use.
const FPROXY_PREFIX: &str = "http://localhost:8888/";
/// URI scheme accepted and stripped before use.
const URI_SCHEME: &str = "freenet:";
/// Key-type prefixes that mark an operand as a freenet URI.
const KEY_PREFIXES: [&str; 4] = ["CHK@", "KSK@", "SSK@", "USK@"];

/// Parsed command-line arguments for the fcpmon frontend.
///
/// Positional operands are classified after the clap parse: anything that
/// looks like a freenet URI becomes a download, everything else is a job
/// identifier to watch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    /// URIs to fetch, fproxy/scheme prefixes already stripped.
    pub download_uris: Vec<String>,
    /// Existing job identifiers to watch until they resolve.
    pub watch_identifiers: Vec<String>,
    /// Job identifiers to cancel in the node's global queue.
    pub cancel_identifiers: Vec<String>,
    /// Queue fetches persistently in the global disk queue.
    pub persistent: bool,
    /// Extra `ClientGet` fields, applied after the built-in options.
    pub get_options: Vec<(String, String)>,
    /// Directory downloads are written to; enables the directory-access
    /// handshake.
    pub download_dir: Option<String>,
    /// Client name advertised to the node.
    pub client_name: Option<String>,
    /// FCP port on localhost.
    pub port: Option<u16>,
}

/// Builds the clap command definition.
pub fn clap_command() -> Command {
    Command::new("fcpmon")
        .about("Monitor and control downloads on a local Freenet node over FCP 2.0")
        .arg(
            Arg::new("cancel")
                .long("cancel")
                .value_name("ID")
                .action(ArgAction::Append)
                .help("Cancel the job ID in the node's global queue."),
        )
        .arg(
            Arg::new("persist")
                .long("persist")
                .action(ArgAction::SetTrue)
                .help("Queue fetches persistently in the node's global disk queue."),
        )
        .arg(
            Arg::new("option")
                .long("option")
                .short('o')
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Extra ClientGet field, applied after the built-in options."),
        )
        .arg(
            Arg::new("download-dir")
                .long("download-dir")
                .value_name("PATH")
                .help("Directory downloads are written to; tested for direct access first."),
        )
        .arg(
            Arg::new("client-name")
                .long("client-name")
                .value_name("NAME")
                .help("Client name advertised to the node."),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("FCP port on localhost [default: 9481]."),
        )
        .arg(
            Arg::new("operands")
                .value_name("URI|ID")
                .action(ArgAction::Append)
                .help("Freenet URIs to fetch, or job identifiers to watch."),
        )
}

/// Returns whether an operand is a freenet URI rather than a job identifier.
fn is_freenet_uri(text: &str) -> bool {
    text.starts_with(FPROXY_PREFIX)
        || text.starts_with(URI_SCHEME)
        || KEY_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// Strips the fproxy prefix and the `freenet:` scheme.
fn normalize_uri(text: &str) -> &str {
    let text = text.strip_prefix(FPROXY_PREFIX).unwrap_or(text);
    text.strip_prefix(URI_SCHEME).unwrap_or(text)
}

/// Parses argv into [`ParsedArgs`].
///
/// Help and version requests, as well as malformed flags, surface as the
/// underlying [`clap::Error`]; `--option` values missing an `=` are turned
/// into the same error kind so the caller has one failure path.
pub fn parse_args<I>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = String>,
{
    let matches = clap_command().try_get_matches_from(arguments)?;

    let mut parsed = ParsedArgs {
        persistent: matches.get_flag("persist"),
        download_dir: matches.get_one::<String>("download-dir").cloned(),
        client_name: matches.get_one::<String>("client-name").cloned(),
        port: matches.get_one::<u16>("port").copied(),
        ..ParsedArgs::default()
    };

    if let Some(identifiers) = matches.get_many::<String>("cancel") {
        parsed.cancel_identifiers = identifiers.cloned().collect();
    }

    if let Some(options) = matches.get_many::<String>("option") {
        for option in options {
            let Some((key, value)) = option.split_once('=') else {
                return Err(clap::Error::raw(
                    clap::error::ErrorKind::InvalidValue,
                    format!("--option requires KEY=VALUE, got '{option}'\n"),
                ));
            };
            parsed
                .get_options
                .push((key.to_owned(), value.to_owned()));
        }
    }

    if let Some(operands) = matches.get_many::<String>("operands") {
        for operand in operands {
            if is_freenet_uri(operand) {
                parsed.download_uris.push(normalize_uri(operand).to_owned());
            } else {
                parsed.watch_identifiers.push(operand.clone());
            }
        }
    }

    Ok(parsed)
}
