use anyhow::{bail, Context, Result};
use tokio::{io::AsyncBufRead, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use log::info;

use super::{inbound::InboundMessage, loop_worker::ingest_loop};

const INBOUND_CAPACITY: usize = 64;

/// Owns the background task that turns an inbound byte stream into messages.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_ingest<R>(&mut self, reader: R) -> Result<mpsc::Receiver<InboundMessage>>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        if self.handle.is_some() {
            bail!("ingest already active");
        }

        let cancel_token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let handle = tokio::spawn(ingest_loop(reader, tx, cancel_token.clone()));

        info!("Inbound ingest started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(rx)
    }

    pub async fn stop_ingest(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("ingest loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}
