// Toast notifications with auto-dismiss and manual close
use crate::domain::view::{el, View};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warning,
    Error,
    Info,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Warning => "warning",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "check-circle",
            ToastKind::Warning => "exclamation-triangle",
            ToastKind::Error => "times-circle",
            ToastKind::Info => "info-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Default)]
struct CenterState {
    /// The container exists from the first toast on
    container_created: bool,
    next_id: u64,
    toasts: BTreeMap<u64, (Toast, JoinHandle<()>)>,
}

#[derive(Clone)]
pub struct NotificationCenter {
    default_duration: Duration,
    state: Arc<Mutex<CenterState>>,
}

impl NotificationCenter {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            default_duration,
            state: Arc::new(Mutex::new(CenterState::default())),
        }
    }

    pub async fn notify(&self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.notify_for(kind, message, self.default_duration).await
    }

    /// Shows a toast that dismisses itself after `duration`
    pub async fn notify_for(&self, kind: ToastKind, message: impl Into<String>, duration: Duration) -> u64 {
        let mut state = self.state.lock().await;
        state.container_created = true;
        state.next_id += 1;
        let id = state.next_id;

        let toast = Toast {
            id,
            kind,
            message: message.into(),
        };
        tracing::debug!("Toast {} ({}): {}", id, kind.as_str(), toast.message);

        let shared = self.state.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            shared.lock().await.toasts.remove(&id);
        });
        state.toasts.insert(id, (toast, timer));
        id
    }

    /// Closes a toast before its timer fires. Returns false if it was
    /// already gone.
    pub async fn close(&self, id: u64) -> bool {
        match self.state.lock().await.toasts.remove(&id) {
            Some((_, timer)) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub async fn active(&self) -> Vec<Toast> {
        self.state
            .lock()
            .await
            .toasts
            .values()
            .map(|(toast, _)| toast.clone())
            .collect()
    }

    pub async fn render(&self) -> View {
        let state = self.state.lock().await;
        if !state.container_created {
            return View::empty();
        }
        let toasts = state.toasts.values().map(|(toast, _)| {
            el("div")
                .class(format!("notification notification-{}", toast.kind.as_str()))
                .child(
                    el("div")
                        .class("notification-icon")
                        .child(el("i").class(format!("fas fa-{}", toast.kind.icon()))),
                )
                .child(el("div").class("notification-content").child(el("p").text(toast.message.clone())))
                .child(
                    el("form")
                        .attr("method", "post")
                        .attr("action", format!("/notifications/{}/close", toast.id))
                        .child(el("button").attr("type", "submit").class("notification-close").text("×")),
                )
        });
        el("div").class("notification-container").children(toasts).into()
    }
}
