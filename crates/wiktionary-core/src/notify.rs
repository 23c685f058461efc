use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastStyle {
    Success,
    Failure,
}

/// Transient, out-of-band message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub style: ToastStyle,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            style: ToastStyle::Success,
            title: title.into(),
            message: None,
        }
    }

    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: ToastStyle::Failure,
            title: title.into(),
            message: Some(message.into()),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Routes toasts into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.style {
            ToastStyle::Success => info!(
                target: "wiktionary_notify",
                title = %toast.title,
                message = toast.message.as_deref().unwrap_or_default(),
                "notification"
            ),
            ToastStyle::Failure => warn!(
                target: "wiktionary_notify",
                title = %toast.title,
                message = toast.message.as_deref().unwrap_or_default(),
                "notification"
            ),
        }
    }
}

/// Keeps every toast it receives; handy for hosts that batch output.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        if let Ok(mut guard) = self.toasts.lock() {
            guard.push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_drains() {
        let notifier = RecordingNotifier::default();
        notifier.notify(Toast::failure("Oops", "details"));
        assert_eq!(notifier.toasts().len(), 1);
        assert_eq!(notifier.take()[0].title, "Oops");
        assert!(notifier.toasts().is_empty());
    }
}
