use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::util::generate_id;

/// Oldest messages are dropped past this many.
const MAX_MESSAGES: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>) -> Self {
        Self {
            id: generate_id("notice"),
            kind,
            text: text.into(),
        }
    }
}

/// User-facing message sink of the host session.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Session message queue the host drains when rendering the next page.
#[derive(Debug, Default)]
pub struct SessionMessages {
    entries: Mutex<Vec<Notification>>,
}

impl SessionMessages {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, kind: NotificationKind, text: &str) {
        let mut entries = self.lock();
        if entries.len() >= MAX_MESSAGES {
            entries.remove(0);
        }
        entries.push(Notification::new(kind, text));
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().clone()
    }
}

impl Notifier for SessionMessages {
    fn success(&self, message: &str) {
        tracing::info!("{message}");
        self.push(NotificationKind::Success, message);
    }

    fn error(&self, message: &str) {
        tracing::warn!("{message}");
        self.push(NotificationKind::Error, message);
    }
}
