use chrono::Utc;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use super::inbound::{parse_line, InboundMessage};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Read inbound lines until EOF or cancellation, forwarding every decoded
/// message. Malformed lines are logged and dropped.
pub async fn ingest_loop<R>(
    reader: R,
    tx: mpsc::Sender<InboundMessage>,
    cancel_token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        log_info!("inbound stream closed");
                        break;
                    }
                    Err(err) => {
                        log_error!("failed to read inbound stream: {err}");
                        break;
                    }
                };

                match parse_line(&line, Utc::now()) {
                    Ok(Some(message)) => {
                        if tx.send(message).await.is_err() {
                            log_warn!("inbound receiver dropped, stopping ingest");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => log_warn!("dropping malformed inbound line {line:?}: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("ingest loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::{Metric, SensorReading};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn forwards_valid_lines_and_skips_malformed_ones() {
        let input = b"focusSense/desk1/distance 42\nnot-a-message\n\n{\"type\":\"stop\"}\nfocusSense/desk1/reed 1\n";
        let (tx, mut rx) = mpsc::channel(8);

        ingest_loop(BufReader::new(&input[..]), tx, CancellationToken::new()).await;

        let mut metrics = Vec::new();
        let mut commands = 0;
        while let Some(message) = rx.recv().await {
            match message {
                InboundMessage::Readings(readings) => {
                    metrics.extend(readings.iter().map(|r: &SensorReading| r.metric))
                }
                InboundMessage::Command(_) => commands += 1,
            }
        }
        assert_eq!(metrics, vec![Metric::Distance, Metric::Holder]);
        assert_eq!(commands, 1);
    }

    #[tokio::test]
    async fn stops_on_cancellation() {
        let (_writer, reader) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        token.cancel();

        ingest_loop(BufReader::new(reader), tx, token).await;
    }
}
