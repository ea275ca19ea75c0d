// Command classification - maps one request line to a command

use regex::Regex;
use std::sync::LazyLock;

use super::prefix::PrefixRequest;

static HELP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^help$").unwrap());

static ASN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ASN?[0-9]+$").unwrap());

// Dotted quad or loose IPv6, optional /bits, optional " peer filter"
static PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}(?:/[0-9]{1,2})?(?: .+)?$",
        r"|(?i)^(?:[A-F0-9]{1,4}:{1,2})+(?:[A-F0-9]{1,4})?(?:/[0-9]{1,3})?(?: .+)?$",
    ))
    .unwrap()
});

/// A classified request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Recognized but not implemented; answered with an empty response
    AsnLookup,
    PrefixLookup(PrefixRequest),
    Invalid,
}

impl Command {
    /// Classify a request line (without its line terminator). First match wins.
    pub fn classify(line: &str) -> Command {
        if HELP.is_match(line) {
            Command::Help
        } else if ASN.is_match(line) {
            Command::AsnLookup
        } else if PREFIX.is_match(line) {
            Command::PrefixLookup(PrefixRequest::parse(line))
        } else {
            Command::Invalid
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::AsnLookup => "asn-lookup",
            Command::PrefixLookup(_) => "prefix-lookup",
            Command::Invalid => "invalid",
        }
    }
}
