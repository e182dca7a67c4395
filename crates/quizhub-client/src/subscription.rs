//! Scoped live views.
//!
//! A [`RegistrationWatch`] owns a background task that rebuilds the
//! organizer's registrations view whenever the store reports a change and
//! publishes each snapshot through a `watch` channel. The task and the
//! store subscription live exactly as long as the watch.

use std::sync::Arc;

use domain::services::{ChangeFeed, QuizRegistrationsView};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::services::RegistrationService;

/// Immutable state a screen renders.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(Arc<T>),
    Failed(ClientError),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value.as_ref()),
            _ => None,
        }
    }
}

type RegistrationsState = ViewState<QuizRegistrationsView>;

/// Live registrations view of one quiz.
///
/// Dropping the watch cancels its task and releases the store
/// subscription.
pub struct RegistrationWatch {
    quiz_id: Uuid,
    receiver: watch::Receiver<RegistrationsState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RegistrationWatch {
    pub(crate) fn spawn(service: RegistrationService, quiz_id: Uuid, feed: ChangeFeed) -> Self {
        let (sender, receiver) = watch::channel(ViewState::Loading);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(service, quiz_id, feed, sender, cancel.clone()));
        Self {
            quiz_id,
            receiver,
            cancel,
            task: Some(task),
        }
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    /// The latest published state.
    pub fn current(&self) -> RegistrationsState {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published state.
    pub async fn changed(&mut self) -> ClientResult<RegistrationsState> {
        self.receiver
            .changed()
            .await
            .map_err(|_| ClientError::Cancelled)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> ClientResult<RegistrationsState>
    where
        F: FnMut(&RegistrationsState) -> bool,
    {
        let state = self
            .receiver
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| ClientError::Cancelled)?;
        Ok(state.clone())
    }

    /// Cancels the task and waits for it to release the subscription.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(quiz_id = %self.quiz_id, error = %e, "Registration watch task failed");
            }
        }
    }
}

impl Drop for RegistrationWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    service: RegistrationService,
    quiz_id: Uuid,
    mut feed: ChangeFeed,
    sender: watch::Sender<RegistrationsState>,
    cancel: CancellationToken,
) {
    if publish(&service, quiz_id, &sender, &cancel).await {
        loop {
            let change = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                change = feed.next() => change,
            };

            let Some(change) = change else {
                sender.send_replace(ViewState::Failed(ClientError::StoreUnavailable(
                    "Registration updates stopped".to_string(),
                )));
                break;
            };

            // One reload covers every change already queued.
            let mut coalesced = 0usize;
            while feed.try_next().is_some() {
                coalesced += 1;
            }
            debug!(
                quiz_id = %quiz_id,
                registration_id = %change.registration_id,
                kind = ?change.kind,
                coalesced,
                "Registration change received"
            );

            if !publish(&service, quiz_id, &sender, &cancel).await {
                break;
            }
        }
    }
    debug!(quiz_id = %quiz_id, "Registration watch stopped");
}

/// Rebuilds and publishes the view. Returns `false` once nobody listens
/// or the watch was cancelled.
async fn publish(
    service: &RegistrationService,
    quiz_id: Uuid,
    sender: &watch::Sender<RegistrationsState>,
    cancel: &CancellationToken,
) -> bool {
    let state = match service.load_view(quiz_id, cancel).await {
        Ok(view) => ViewState::Ready(Arc::new(view)),
        Err(ClientError::Cancelled) => return false,
        Err(e) => {
            warn!(quiz_id = %quiz_id, error = %e, "Failed to refresh registrations view");
            ViewState::Failed(e)
        }
    };
    sender.send(state).is_ok()
}
