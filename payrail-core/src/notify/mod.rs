//! User notification delivery.
//!
//! Notification events carry their kind as a free-form string because
//! other producers also write to the notification channel. The router
//! parses the kind and hands the message to the matching sink; what a
//! sink does with it (SMTP, SMS gateway, push provider) is behind the
//! [`NotificationSink`] trait.

pub mod log_sinks;

pub use log_sinks::{LogEmailSink, LogPushSink, LogSmsSink};

use async_trait::async_trait;
use payrail_sdk::objects::{NotificationEvent, NotificationKind};
use std::sync::Arc;
use thiserror::Error;

/// Delivery failure inside a sink.
#[derive(Debug, Error)]
#[error("notification sink failure: {reason}")]
pub struct SinkError {
    pub reason: String,
}

/// One delivery channel (email, SMS, push).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, user_id: &str, message: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event named a kind no sink handles.
    #[error("unknown notification kind: {kind}")]
    UnknownKind { kind: String },

    /// The resolved sink failed to deliver.
    #[error("'{kind}' sink error: {source}")]
    Sink {
        kind: NotificationKind,
        source: SinkError,
    },
}

/// Routes notification events to the sink matching their kind.
pub struct NotificationRouter {
    email: Arc<dyn NotificationSink>,
    sms: Arc<dyn NotificationSink>,
    push: Arc<dyn NotificationSink>,
}

impl NotificationRouter {
    pub fn new(
        email: Arc<dyn NotificationSink>,
        sms: Arc<dyn NotificationSink>,
        push: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { email, sms, push }
    }

    /// Router backed by the log-only sinks.
    pub fn logging() -> Self {
        Self::new(
            Arc::new(LogEmailSink),
            Arc::new(LogSmsSink),
            Arc::new(LogPushSink),
        )
    }

    /// Parses the event's kind and delivers through the matching sink.
    /// Returns the parsed kind so callers can log it.
    pub async fn dispatch(
        &self,
        event: &NotificationEvent,
    ) -> Result<NotificationKind, DispatchError> {
        let Some(kind) = NotificationKind::parse(&event.kind) else {
            return Err(DispatchError::UnknownKind {
                kind: event.kind.clone(),
            });
        };
        let sink = match kind {
            NotificationKind::Email => &self.email,
            NotificationKind::Sms => &self.sms,
            NotificationKind::Push => &self.push,
        };
        sink.send(&event.user_id, &event.message)
            .await
            .map_err(|source| DispatchError::Sink { kind, source })?;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, notification_event};

    fn router_with(email: Arc<RecordingSink>) -> NotificationRouter {
        NotificationRouter::new(
            email,
            Arc::new(RecordingSink::new()),
            Arc::new(RecordingSink::new()),
        )
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let email = Arc::new(RecordingSink::new());
        let sms = Arc::new(RecordingSink::new());
        let router = NotificationRouter::new(
            Arc::clone(&email) as Arc<dyn NotificationSink>,
            Arc::clone(&sms) as Arc<dyn NotificationSink>,
            Arc::new(RecordingSink::new()),
        );

        let result = router.dispatch(&notification_event("u1", "email")).await;
        assert!(matches!(result, Ok(NotificationKind::Email)));
        assert_eq!(email.sent().len(), 1);
        assert!(sms.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_is_reported() {
        let email = Arc::new(RecordingSink::new());
        let router = router_with(Arc::clone(&email));

        let result = router.dispatch(&notification_event("u1", "FAX")).await;
        assert!(matches!(
            result,
            Err(DispatchError::UnknownKind { kind }) if kind == "FAX"
        ));
        assert!(email.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_carries_the_kind() {
        let email = Arc::new(RecordingSink::failing_first(1));
        let router = router_with(Arc::clone(&email));

        let result = router.dispatch(&notification_event("u1", "EMAIL")).await;
        assert!(matches!(
            result,
            Err(DispatchError::Sink {
                kind: NotificationKind::Email,
                ..
            })
        ));
    }
}
