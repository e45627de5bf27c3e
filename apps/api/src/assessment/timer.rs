//! Timed stage controller for the coding challenge.
//!
//! One cooperative countdown per session, armed when the challenge is
//! generated. On expiry it drives the state machine's forced-submission
//! path; a client submission cancels it through the store's timer registry.
//! Either way the losing side is a no-op, guaranteed by the stage check
//! under the session write lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::machine;
use super::store::SessionStore;

/// Arms the countdown for a session's code stage.
pub fn spawn_code_countdown(store: Arc<SessionStore>, session_id: Uuid, deadline: DateTime<Utc>) {
    // The remaining budget is fixed at arm time; a negative remainder
    // (already past the deadline) fires immediately.
    let remaining = (deadline - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);

    let task_store = store.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(remaining).await;
        expire(task_store, session_id).await;
    });
    store.arm_timer(session_id, handle.abort_handle());
}

async fn expire(store: Arc<SessionStore>, session_id: Uuid) {
    let Ok(slot) = store.get(session_id).await else {
        return;
    };

    let fired = {
        let mut session = slot.write().await;
        machine::force_expire_code(&mut session, Utc::now())
    };

    if fired {
        info!("Code stage time box expired for session {session_id}; forced submission recorded");
    } else {
        debug!("Code stage countdown for session {session_id} lost the race to a client submit");
    }
    store.disarm_timer(session_id);
}
