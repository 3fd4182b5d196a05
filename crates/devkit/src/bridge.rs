use std::io;
use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::{Response, parse_request};
use crate::toolbox::Toolbox;

/// Answer every request line from `input` on `output` until EOF.
///
/// Each request runs in its own task, so responses may come back out of
/// order; a single writer keeps lines whole. Returns the writer once every
/// in-flight request has been answered.
///
/// # Errors
/// Returns the first I/O error from reading `input` or writing `output`.
pub async fn serve<R, W>(toolbox: Arc<Toolbox>, input: R, output: W) -> io::Result<W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(write_responses(receiver, output));

    let mut reader = BufReader::new(input);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_request(line) {
            Ok(request) => {
                let toolbox = Arc::clone(&toolbox);
                let sender = sender.clone();
                tokio::spawn(async move {
                    let response = toolbox.respond(request).await;
                    let _ = sender.send(response);
                });
            }
            Err(response) => {
                warn!("Rejected request line: {line}");
                let _ = sender.send(response);
            }
        }
    }

    debug!("Input closed, waiting for in-flight requests");
    drop(sender);
    writer.await.map_err(io::Error::other)?
}

async fn write_responses<W>(
    mut receiver: mpsc::UnboundedReceiver<Response>,
    mut output: W,
) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = receiver.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(output)
}
