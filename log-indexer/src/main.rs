use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dotenv::dotenv;
use log_indexer::{Dependencies, IndexOutcome, IndexerError, InvalidEvent};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Counts of request outcomes seen by the collector.
#[derive(Debug, Default)]
struct Summary {
    indexed: usize,
    failed: usize,
    lost: u64,
}

impl Summary {
    fn completed(&self) -> u64 {
        (self.indexed + self.failed) as u64 + self.lost
    }
}

/// Collect outcomes until `expected` is known and reached.
async fn collect(
    mut outcomes: broadcast::Receiver<IndexOutcome>,
    mut expected: watch::Receiver<Option<u64>>,
) -> Summary {
    let mut summary = Summary::default();
    loop {
        if let Some(target) = *expected.borrow() {
            if summary.completed() >= target {
                break;
            }
        }

        tokio::select! {
            received = outcomes.recv() => match received {
                Ok(IndexOutcome::Indexed(_)) => summary.indexed += 1,
                Ok(IndexOutcome::Failed(failure)) => {
                    warn!(
                        id = %failure.event.id,
                        status = failure.status_code(),
                        error = %failure.error,
                        "Event was not indexed"
                    );
                    summary.failed += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Outcome collector lagged");
                    summary.lost += skipped;
                }
                Err(RecvError::Closed) => break,
            },
            changed = expected.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    summary
}

#[tokio::main]
async fn main() -> Result<(), IndexerError> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let dependencies = Dependencies::new().await?;
    let indexer = dependencies.indexer;

    let (expected_tx, expected_rx) = watch::channel(None);
    let collector = tokio::spawn(collect(indexer.subscribe(), expected_rx));

    let invalid = Arc::new(AtomicUsize::new(0));
    let invalid_count = invalid.clone();
    let service = indexer.as_logging_adapter(Some(Arc::new(move |event: InvalidEvent| {
        warn!(reason = %event.reason, "Invalid log event");
        invalid_count.fetch_add(1, Ordering::SeqCst);
    })));

    info!(index = indexer.index_name(), "Reading events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut parsed: u64 = 0;
    let mut unparsable: usize = 0;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(event) => {
                        parsed += 1;
                        service.log(event);
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping line that is not JSON");
                        unparsable += 1;
                    }
                }
            }
            _ = &mut interrupted => {
                info!("Interrupted, waiting for submitted events");
                break;
            }
        }
    }

    let invalid = invalid.load(Ordering::SeqCst);
    let submitted = parsed - invalid as u64;
    let _ = expected_tx.send(Some(submitted));
    let summary = collector.await?;

    info!(
        submitted = submitted,
        indexed = summary.indexed,
        failed = summary.failed,
        lost = summary.lost,
        invalid = invalid,
        unparsable = unparsable,
        "Finished"
    );

    if summary.failed > 0 || summary.lost > 0 || invalid > 0 || unparsable > 0 {
        error!("Some events were not indexed");
        std::process::exit(1);
    }

    Ok(())
}
