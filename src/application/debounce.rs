// Trailing-edge debouncer
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Runs only the last action scheduled within the delay window; each new
/// call cancels the pending one
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn call<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(String::new()));

        for term in ["l", "la", "lap"] {
            let runs = runs.clone();
            let last = last.clone();
            debouncer
                .call(async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    *last.lock().await = term.to_string();
                })
                .await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(*last.lock().await, "lap");
    }
}
