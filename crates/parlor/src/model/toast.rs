//! Transient notifications.

use std::time::{Duration, Instant};

/// How long a toast stays visible.
const TOAST_LIFETIME: Duration = Duration::from_secs(3);

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
}

/// A transient notification.
#[derive(Debug, Clone)]
pub struct Toast {
    /// Identifier used to dismiss the toast.
    pub id: u64,
    /// Severity.
    pub kind: ToastKind,
    /// Text shown to the user.
    pub text: String,
    expires_at: Instant,
}

/// Visible toasts, oldest first.
#[derive(Debug, Default)]
pub struct Toasts {
    next_id: u64,
    items: Vec<Toast>,
}

impl Toasts {
    /// Show a success toast.
    pub fn success(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Success, text.into(), Instant::now());
    }

    /// Show an error toast.
    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Error, text.into(), Instant::now());
    }

    fn push(&mut self, kind: ToastKind, text: String, now: Instant) {
        self.next_id += 1;
        self.items.push(Toast {
            id: self.next_id,
            kind,
            text,
            expires_at: now + TOAST_LIFETIME,
        });
    }

    /// Remove a toast.
    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|toast| toast.id != id);
    }

    /// Drop toasts that expired before `now`.
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|toast| toast.expires_at > now);
    }

    /// Visible toasts.
    #[must_use]
    pub fn items(&self) -> &[Toast] {
        &self.items
    }

    /// Returns true if nothing is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
