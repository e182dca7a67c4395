//! Concurrent profile lookups for the registration views.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::models::User;
use domain::services::UserStore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Fetches every distinct profile in `ids` concurrently and waits for all
/// of them.
///
/// A lookup that fails, times out, or finds no profile is left out of the
/// result so the view falls back to a placeholder name. Only cancellation
/// fails the whole gather.
pub async fn fetch_users<I>(
    users: Arc<dyn UserStore>,
    ids: I,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ClientResult<HashMap<Uuid, User>>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut distinct: Vec<Uuid> = ids.into_iter().collect();
    distinct.sort();
    distinct.dedup();

    let mut tasks = JoinSet::new();
    for id in distinct {
        let users = Arc::clone(&users);
        tasks.spawn(async move { (id, tokio::time::timeout(timeout, users.get_user(id)).await) });
    }

    let mut found = HashMap::new();
    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                return Err(ClientError::Cancelled);
            }
            joined = tasks.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok((id, Ok(Ok(Some(user))))) => {
                found.insert(id, user);
            }
            Ok((id, Ok(Ok(None)))) => {
                debug!(user_id = %id, "No profile stored for user");
            }
            Ok((id, Ok(Err(e)))) => {
                warn!(user_id = %id, error = %e, "Profile lookup failed");
            }
            Ok((id, Err(_))) => {
                warn!(user_id = %id, timeout_ms = timeout.as_millis() as u64, "Profile lookup timed out");
            }
            Err(e) => {
                warn!(error = %e, "Profile lookup task did not complete");
            }
        }
    }

    Ok(found)
}

/// Display names keyed by user id.
pub fn display_names(users: &HashMap<Uuid, User>) -> HashMap<Uuid, String> {
    users
        .iter()
        .map(|(id, user)| (*id, user.name.clone()))
        .collect()
}
