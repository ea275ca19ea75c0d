// Canned response texts sent to whois clients

pub const NO_PREFIXES_FOUND: &str = "% No prefixes found.\r\n";
pub const OUT_OF_RESOURCES: &str = "% ERROR: Out of resources, try again later.\r\n";
pub const INVALID_REQUEST: &str = "% ERROR: Invalid request.\r\n";
pub const DB_CONNECT_ERROR: &str = "% ERROR: Cannot process request at this time\r\n";
pub const DB_QUERY_ERROR: &str = "% No entries found for prefix.\r\n";

pub const HELP_USAGE: &str = concat!(
    "Usage: whois -h <server> -p <port> <command>\r\n",
    "\r\nCOMMAND:\r\n\r\n",
    "   ip[/bits] [peer like string] -- Lookup IPv4/IPv6 address or network\r\n",
    "                       Optionally add peer name prefix string (e.g., jfk01) to scope query to specific peer(s)\r\n",
);
