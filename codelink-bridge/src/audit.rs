//! Operational audit trail.
//!
//! An append-only record of who did what: submissions, confirmations,
//! overrides, eligibility checks. Events are never edited or removed once
//! appended; reads hand out snapshots so callers never hold the lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

/// Who performed an audited action.
#[derive(Clone, Debug, Serialize)]
pub struct AuditActor {
    pub user: String,
    /// Source address when the action arrived over the network.
    pub ip: Option<String>,
}

impl AuditActor {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ip: None,
        }
    }

    pub fn with_ip(user: &str, ip: &str) -> Self {
        Self {
            user: user.to_string(),
            ip: Some(ip.to_string()),
        }
    }
}

/// One immutable audit record.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Short machine-readable action name, e.g. "claim-submitted".
    pub event_type: String,
    pub actor: AuditActor,
    /// Free-form human detail for the record.
    pub detail: String,
}

/// Append-only, thread-safe audit log.
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: RwLock<Vec<AuditEvent>>,
    counter: AtomicU64,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time and a monotonic id.
    pub fn record(&self, event_type: &str, actor: AuditActor, detail: &str) -> AuditEvent {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let event = AuditEvent {
            id: format!("aud-{:06}", seq),
            timestamp: Utc::now().fixed_offset(),
            event_type: event_type.to_string(),
            actor,
            detail: detail.to_string(),
        };
        self.events
            .write()
            .expect("audit log lock poisoned")
            .push(event.clone());
        log::debug!("audit: {} by {}: {}", event.event_type, event.actor.user, detail);
        event
    }

    /// A point-in-time copy of the full trail, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events.read().expect("audit log lock poisoned").clone()
    }

    /// The most recent `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let mut events = self.snapshot();
        events.reverse();
        events.truncate(limit);
        events
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("audit log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_zero_padded() {
        let trail = AuditTrail::new();
        let first = trail.record("claim-submitted", AuditActor::new("op-1"), "claim c-1");
        let second = trail.record("claim-confirmed", AuditActor::new("op-1"), "claim c-1");
        assert_eq!(first.id, "aud-000001");
        assert_eq!(second.id, "aud-000002");
    }

    #[test]
    fn snapshot_is_oldest_first_and_detached() {
        let trail = AuditTrail::new();
        trail.record("a", AuditActor::new("u"), "first");
        trail.record("b", AuditActor::new("u"), "second");

        let snap = trail.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].detail, "first");

        // the snapshot is a copy; later appends do not grow it
        trail.record("c", AuditActor::new("u"), "third");
        assert_eq!(snap.len(), 2);
        assert_eq!(trail.len(), 3);
    }

    #[test]
    fn recent_returns_newest_first_and_respects_limit() {
        let trail = AuditTrail::new();
        for i in 0..5 {
            trail.record("tick", AuditActor::new("u"), &format!("event {}", i));
        }
        let recent = trail.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].detail, "event 4");
        assert_eq!(recent[1].detail, "event 3");
    }

    #[test]
    fn poisoned_trail_fails_loud_instead_of_dropping_records() {
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::sync::Arc;

        let trail = Arc::new(AuditTrail::new());
        let poisoner = Arc::clone(&trail);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.events.write().unwrap();
            panic!("poisoning the audit lock");
        })
        .join();

        let result = catch_unwind(AssertUnwindSafe(|| {
            trail.record("claim-submitted", AuditActor::new("op-1"), "claim c-9");
        }));
        assert!(
            result.is_err(),
            "an append on a poisoned trail must panic rather than lose the record silently"
        );
    }

    #[test]
    fn actor_ip_is_optional() {
        let bare = AuditActor::new("op-2");
        assert!(bare.ip.is_none());
        let networked = AuditActor::with_ip("op-2", "10.0.0.4");
        assert_eq!(networked.ip.as_deref(), Some("10.0.0.4"));
    }
}
