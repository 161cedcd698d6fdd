use std::collections::VecDeque;
use std::sync::Arc;

use log::{error, info};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A toast: shown once, then dismissed by whoever drains the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct Notifications {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl Notifications {
    pub fn new() -> Notifications {
        Notifications::default()
    }

    fn push(&self, level: Level, message: String) -> Uuid {
        let id = Uuid::new_v4();
        self.queue.lock().push_back(Notification { id, level, message });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        let message = message.into();
        info!("{}", message);
        self.push(Level::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        let message = message.into();
        error!("{}", message);
        self.push(Level::Error, message)
    }

    /// Surfaces a failed call as an error toast. Validation failures stay on their fields.
    pub fn report<T>(&self, result: Result<T>, fallback: &str) -> Result<T> {
        if let Err(e) = &result {
            if !matches!(e, ApiError::Validation(_)) {
                self.error(e.user_message_or(fallback));
            }
        }
        result
    }

    pub fn latest(&self) -> Option<Notification> {
        self.queue.lock().back().cloned()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
