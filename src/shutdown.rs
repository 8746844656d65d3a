use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn the background task that lets the operator stop a run.
///
/// The task blocks on stdin until the operator presses ENTER, cancels the
/// token, and exits. The importer only ever polls `token.is_cancelled()`, so
/// a stop request takes effect at the next record or file boundary rather
/// than interrupting work already in flight.
///
/// A closed stdin (e.g. the importer running non-interactively) is not a
/// stop request; the listener just exits.
pub fn spawn_stop_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) => debug!("stdin closed, stop listener exiting"),
            Ok(_) => {
                info!("Stop requested, finishing the record in flight...");
                token.cancel();
            }
            Err(e) => debug!("stop listener failed to read stdin: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    #[test]
    fn token_observes_cancellation_exactly_once_set() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Polling again keeps returning the latest value.
        assert!(token.is_cancelled());
    }
}
