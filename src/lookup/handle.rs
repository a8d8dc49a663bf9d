use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::debug;

use super::clock::Clock;
use super::controller::{LookupController, LookupState};
use crate::errors::ServiceError;
use crate::models::Spool;
use crate::services::SpoolService;

/// Clock backed by the tokio timer, so paused test time applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Runs a [`LookupController`] on a background task.
///
/// Keystrokes go in through [`LookupHandle::input`]; the current
/// [`LookupState`] comes out of a watch channel. Searches run concurrently
/// and their results are matched back to the barcode they were issued for.
pub struct LookupHandle {
    input: mpsc::UnboundedSender<String>,
    state: watch::Receiver<LookupState>,
    task: JoinHandle<()>,
}

impl LookupHandle {
    pub fn spawn(spools: SpoolService, delay: Duration) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LookupState::default());
        let controller = LookupController::new(spools, TokioClock, delay);
        let task = tokio::spawn(run(controller, input_rx, state_tx));
        Self {
            input: input_tx,
            state: state_rx,
            task,
        }
    }

    /// Feeds the full current text of the barcode field.
    pub fn input(&self, text: impl Into<String>) {
        if self.input.send(text.into()).is_err() {
            debug!("Lookup task has stopped; dropping input");
        }
    }

    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.clone()
    }

    /// Stops accepting input and waits for the task to finish. Input that
    /// has not settled yet still settles, and its search is awaited, so the
    /// last published state reflects the final text.
    pub async fn shutdown(self) {
        drop(self.input);
        let _ = self.task.await;
    }
}

type SearchResult = (String, Result<Vec<Spool>, ServiceError>);

async fn run(
    mut controller: LookupController<TokioClock>,
    mut input: mpsc::UnboundedReceiver<String>,
    state: watch::Sender<LookupState>,
) {
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<SearchResult>();
    let mut closed = false;
    let mut in_flight = 0usize;

    loop {
        if closed && controller.deadline().is_none() && in_flight == 0 {
            break;
        }

        let wake_at = controller
            .deadline()
            .map(tokio::time::Instant::from_std)
            .unwrap_or_else(|| tokio::time::Instant::now() + IDLE_WAIT);

        tokio::select! {
            text = input.recv(), if !closed => match text {
                Some(text) => controller.on_input(&text),
                None => {
                    debug!(in_flight, "Lookup input closed");
                    closed = true;
                }
            },
            _ = sleep_until(wake_at), if controller.deadline().is_some() => {
                let settled = controller.poll();
                state.send_replace(controller.state());
                if let Some(barcode) = settled {
                    in_flight += 1;
                    let spools = controller.spools().clone();
                    let results = results_tx.clone();
                    tokio::spawn(async move {
                        let result = spools.search_by_barcode(&barcode).await;
                        if let Err(mpsc::error::SendError((barcode, _))) =
                            results.send((barcode, result))
                        {
                            debug!(barcode = %barcode, "Lookup task stopped before the search finished");
                        }
                    });
                }
            }
            Some((barcode, result)) = results_rx.recv() => {
                in_flight -= 1;
                controller.complete(barcode, result);
                state.send_replace(controller.state());
            }
        }
    }
    debug!("Lookup task stopped");
}
