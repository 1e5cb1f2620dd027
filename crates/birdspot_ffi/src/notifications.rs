//! Notification sink that hands requests to Dart.
//!
//! Rust decides what to notify; the Flutter side drains the queue and
//! schedules each request with the platform plugin.

use async_trait::async_trait;
use birdspot_core::{NotificationError, NotificationRequest, NotificationSink, PermissionStatus};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub(crate) struct QueuedNotificationSink {
    permission: Mutex<PermissionStatus>,
    pending: Mutex<VecDeque<NotificationRequest>>,
}

impl QueuedNotificationSink {
    pub(crate) fn new() -> Self {
        Self {
            permission: Mutex::new(PermissionStatus::Undetermined),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Records the permission state reported by the platform.
    pub(crate) fn set_permission(&self, status: PermissionStatus) {
        *lock(&self.permission) = status;
    }

    /// Removes and returns every queued request in scheduling order.
    pub(crate) fn drain(&self) -> Vec<NotificationRequest> {
        lock(&self.pending).drain(..).collect()
    }
}

#[async_trait]
impl NotificationSink for QueuedNotificationSink {
    async fn permission_status(&self) -> PermissionStatus {
        *lock(&self.permission)
    }

    // The platform prompt runs in Dart, so this only reports the last known state.
    async fn request_permission(&self) -> PermissionStatus {
        *lock(&self.permission)
    }

    async fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        if !lock(&self.permission).is_granted() {
            return Err(NotificationError::PermissionDenied);
        }
        lock(&self.pending).push_back(request);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), NotificationError> {
        lock(&self.pending).clear();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
