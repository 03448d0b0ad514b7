use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::{AlarmRequest, NotificationCenter};

/// Keeps pending alarms in memory and records every revocation request.
#[derive(Default)]
pub struct InMemoryNotificationCenter {
    pending: Mutex<Vec<AlarmRequest>>,
    removed: Mutex<Vec<String>>,
    reject_adds: AtomicBool,
    deny_authorization: AtomicBool,
}

impl InMemoryNotificationCenter {
    /// Make subsequent registrations fail.
    pub fn reject_adds(&self, reject: bool) {
        self.reject_adds.store(reject, Ordering::SeqCst);
    }

    pub fn deny_authorization(&self, deny: bool) {
        self.deny_authorization.store(deny, Ordering::SeqCst);
    }

    /// Every identifier passed to `remove_pending`, in call order.
    pub fn removed(&self) -> Vec<String> {
        lock(&self.removed).clone()
    }
}

#[async_trait]
impl NotificationCenter for InMemoryNotificationCenter {
    async fn request_authorization(&self) -> Result<bool> {
        Ok(!self.deny_authorization.load(Ordering::SeqCst))
    }

    async fn add(&self, request: AlarmRequest) -> Result<()> {
        if self.reject_adds.load(Ordering::SeqCst) {
            bail!("notification center rejected {}", request.identifier);
        }
        let mut pending = lock(&self.pending);
        pending.retain(|r| r.identifier != request.identifier);
        pending.push(request);
        Ok(())
    }

    fn remove_pending(&self, identifiers: &[String]) {
        lock(&self.pending).retain(|r| !identifiers.contains(&r.identifier));
        lock(&self.removed).extend(identifiers.iter().cloned());
    }

    fn pending(&self) -> Vec<AlarmRequest> {
        lock(&self.pending).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
