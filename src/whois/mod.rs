// Whois module - request classification and the responses to each command

pub mod command;
pub mod format;
pub mod messages;
pub mod prefix;

pub use command::Command;

use crate::store::PrefixStore;

/// Build the response for a classified command.
///
/// `None` means the connection is closed without writing anything.
pub async fn respond<S: PrefixStore>(command: &Command, store: &S, client: &str) -> Option<String> {
    match command {
        Command::Help => {
            tracing::debug!("{}: Request help", client);
            Some(messages::HELP_USAGE.to_string())
        }
        Command::AsnLookup => {
            // ASN lookups are recognized but have no handler
            tracing::debug!("{}: Request ASN lookup", client);
            None
        }
        Command::PrefixLookup(request) => {
            tracing::debug!("{}: Request IP prefix lookup ({})", client, request.network());
            Some(prefix::lookup(store, client, request).await)
        }
        Command::Invalid => {
            tracing::info!("{}: Received request is invalid", client);
            Some(format!("{}{}", messages::INVALID_REQUEST, messages::HELP_USAGE))
        }
    }
}
