//! User-facing notices (toasts). Fire-and-forget from the core's point of view.

use tokio::sync::mpsc;

pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn show_error(&self, message: &str);
    fn show_success(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Success(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Error(msg) => write!(f, "error: {msg}"),
            Notice::Success(msg) => write!(f, "ok: {msg}"),
        }
    }
}

/// Forwards every notice to a channel; whoever presents toasts drains it.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, notice: Notice) {
        tracing::debug!(%notice, "notice");
        // A closed receiver means nobody is presenting toasts any more.
        let _ = self.tx.send(notice);
    }
}

impl Notifier for ChannelNotifier {
    fn show_error(&self, message: &str) {
        self.push(Notice::Error(message.to_string()));
    }

    fn show_success(&self, message: &str) {
        self.push(Notice::Success(message.to_string()));
    }
}
