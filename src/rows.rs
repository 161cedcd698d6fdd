//! Per-row edit and delete state for list views.
//!
//! A list has at most one active row: starting an edit or a delete on another row drops the
//! previous draft. Mutations wait for the server before the row goes back to display; on
//! failure the row keeps its state and an error notification is pushed.

use std::fmt::Debug;
use std::future::Future;

use log::debug;

use crate::error::{Result, FALLBACK_MESSAGE};
use crate::notify::Notifications;

#[derive(Debug, Clone, PartialEq)]
pub enum RowState<Id, Draft> {
    Display,
    Editing { id: Id, draft: Draft },
    ConfirmingDelete { id: Id },
}

pub struct RowEditor<Id, Draft> {
    state: RowState<Id, Draft>,
    notifications: Notifications,
    fallback: &'static str,
}

impl<Id, Draft> RowEditor<Id, Draft>
where
    Id: Clone + PartialEq + Debug,
    Draft: Clone,
{
    pub fn new(notifications: Notifications) -> Self {
        RowEditor {
            state: RowState::Display,
            notifications,
            fallback: FALLBACK_MESSAGE,
        }
    }

    /// Message shown when a failed mutation carries no server text.
    pub fn with_fallback(mut self, fallback: &'static str) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn state(&self) -> &RowState<Id, Draft> {
        &self.state
    }

    pub fn active_id(&self) -> Option<&Id> {
        match &self.state {
            RowState::Display => None,
            RowState::Editing { id, .. } | RowState::ConfirmingDelete { id } => Some(id),
        }
    }

    pub fn is_editing(&self, row: &Id) -> bool {
        matches!(&self.state, RowState::Editing { id, .. } if id == row)
    }

    pub fn is_confirming_delete(&self, row: &Id) -> bool {
        matches!(&self.state, RowState::ConfirmingDelete { id } if id == row)
    }

    pub fn draft(&self, row: &Id) -> Option<&Draft> {
        match &self.state {
            RowState::Editing { id, draft } if id == row => Some(draft),
            _ => None,
        }
    }

    fn replace(&mut self, next: RowState<Id, Draft>) {
        if let Some(previous) = self.active_id() {
            debug!("row {:?} left without saving", previous);
        }
        self.state = next;
    }

    /// The draft starts from the row's current value.
    pub fn begin_edit(&mut self, id: Id, current: Draft) {
        self.replace(RowState::Editing { id, draft: current });
    }

    /// Returns false when no edit is open.
    pub fn update_draft(&mut self, value: Draft) -> bool {
        match &mut self.state {
            RowState::Editing { draft, .. } => {
                *draft = value;
                true
            }
            _ => false,
        }
    }

    pub fn begin_delete(&mut self, id: Id) {
        self.replace(RowState::ConfirmingDelete { id });
    }

    pub fn cancel(&mut self) {
        self.state = RowState::Display;
    }

    /// Submits the open draft. `Ok(None)` when no edit was open.
    pub async fn commit_edit<F, Fut, T>(&mut self, mutate: F) -> Result<Option<T>>
    where
        F: FnOnce(Id, Draft) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (id, draft) = match &self.state {
            RowState::Editing { id, draft } => (id.clone(), draft.clone()),
            _ => return Ok(None),
        };
        match mutate(id, draft).await {
            Ok(value) => {
                self.state = RowState::Display;
                Ok(Some(value))
            }
            Err(e) => {
                self.notifications.error(e.user_message_or(self.fallback));
                Err(e)
            }
        }
    }

    /// Runs the delete for the row awaiting confirmation. `Ok(None)` when none was.
    pub async fn confirm_delete<F, Fut, T>(&mut self, delete: F) -> Result<Option<T>>
    where
        F: FnOnce(Id) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let id = match &self.state {
            RowState::ConfirmingDelete { id } => id.clone(),
            _ => return Ok(None),
        };
        match delete(id).await {
            Ok(value) => {
                self.state = RowState::Display;
                Ok(Some(value))
            }
            Err(e) => {
                self.notifications.error(e.user_message_or(self.fallback));
                Err(e)
            }
        }
    }
}

/// Confirmation dialog keyed by the row it was opened for.
pub struct ConfirmDialog<Id, Action> {
    pending: Option<(Id, Action)>,
    notifications: Notifications,
}

impl<Id, Action> ConfirmDialog<Id, Action>
where
    Id: Clone + Debug,
    Action: Clone + Debug,
{
    pub fn new(notifications: Notifications) -> Self {
        ConfirmDialog {
            pending: None,
            notifications,
        }
    }

    pub fn open(&mut self, id: Id, action: Action) {
        debug!("confirm {:?} on {:?}", action, id);
        self.pending = Some((id, action));
    }

    pub fn close(&mut self) {
        self.pending = None;
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&(Id, Action)> {
        self.pending.as_ref()
    }

    /// Runs the pending action; the dialog closes only when it succeeds. `fallback` is shown
    /// when a failure carries no server message.
    pub async fn confirm<F, Fut, T>(&mut self, fallback: &str, run: F) -> Result<Option<T>>
    where
        F: FnOnce(Id, Action) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (id, action) = match &self.pending {
            Some(pending) => pending.clone(),
            None => return Ok(None),
        };
        match run(id, action).await {
            Ok(value) => {
                self.pending = None;
                Ok(Some(value))
            }
            Err(e) => {
                self.notifications.error(e.user_message_or(fallback));
                Err(e)
            }
        }
    }
}
