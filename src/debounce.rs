use std::time::Duration;

use tokio::sync::mpsc;

/// Spawns a debouncer: a value is delivered only after `window` passes with no newer input.
///
/// Dropping the sender flushes the pending value (if any) and ends the task.
pub fn spawn<T: Send + 'static>(
    window: Duration,
) -> (mpsc::UnboundedSender<T>, mpsc::Receiver<T>) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::channel(16);
    tokio::spawn(debounce_loop(in_rx, out_tx, window));
    (in_tx, out_rx)
}

async fn debounce_loop<T>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::Sender<T>,
    window: Duration,
) {
    let mut pending: Option<T> = None;
    let timer = tokio::time::sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            maybe = input.recv() => {
                let Some(value) = maybe else { break; };
                pending = Some(value);
                timer.as_mut().reset(tokio::time::Instant::now() + window);
            }

            _ = &mut timer, if pending.is_some() => {
                if let Some(value) = pending.take() {
                    if output.send(value).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    if let Some(value) = pending {
        let _ = output.send(value).await;
    }
}
