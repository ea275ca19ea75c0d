// Connection worker - one request line in, one response out, then close

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::store::PrefixStore;
use crate::whois::{self, Command};

/// Longest request line accepted, in bytes
const MAX_REQUEST_LEN: u64 = 4096;

/// Read one request line from the stream.
/// Returns `None` when nothing usable was received.
async fn read_request<T>(stream: &mut T) -> Option<String>
where
    T: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_LEN));
    let mut buf = Vec::new();

    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => {
            let line = String::from_utf8_lossy(&buf);
            Some(line.trim_end_matches(['\r', '\n']).to_string())
        }
        Err(e) => {
            tracing::warn!("Error reading request: {}", e);
            None
        }
    }
}

/// Handle one accepted connection from start to close
pub async fn handle_connection<T, S>(mut stream: T, client: &str, store: &S)
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: PrefixStore,
{
    let Some(line) = read_request(&mut stream).await else {
        tracing::debug!("{}: closed without a request", client);
        let _ = stream.shutdown().await;
        return;
    };

    let command = Command::classify(&line);
    tracing::debug!("{}: '{}' classified as {}", client, line, command.name());

    if let Some(response) = whois::respond(&command, store, client).await {
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            tracing::warn!("{}: Error writing response: {}", client, e);
        }
    }

    let _ = stream.shutdown().await;
}
