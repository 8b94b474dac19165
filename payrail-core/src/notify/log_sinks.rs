//! Log-only sinks, the default wiring until real providers exist.

use crate::notify::{NotificationSink, SinkError};
use async_trait::async_trait;
use tracing::info;

pub struct LogEmailSink;

#[async_trait]
impl NotificationSink for LogEmailSink {
    async fn send(&self, user_id: &str, message: &str) -> Result<(), SinkError> {
        info!(user_id = %user_id, message = %message, "Email sent");
        Ok(())
    }
}

pub struct LogSmsSink;

#[async_trait]
impl NotificationSink for LogSmsSink {
    async fn send(&self, user_id: &str, message: &str) -> Result<(), SinkError> {
        info!(user_id = %user_id, message = %message, "Sms sent");
        Ok(())
    }
}

pub struct LogPushSink;

#[async_trait]
impl NotificationSink for LogPushSink {
    async fn send(&self, user_id: &str, message: &str) -> Result<(), SinkError> {
        info!(user_id = %user_id, message = %message, "Push notification sent");
        Ok(())
    }
}
