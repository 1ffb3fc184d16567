//! Notification persistence and delivery.
//!
//! Every message is first written to the `notifications` table — that row
//! is the delivery history and thread bookkeeping — and then pushed over
//! email when both an SMTP transport and a recipient directory are
//! configured. Email addresses belong to the host platform, so resolution
//! goes through the [`RecipientDirectory`] seam.

use std::sync::Arc;

use async_trait::async_trait;

use prolong_core::types::DbId;
use prolong_db::repositories::NotificationRepo;
use prolong_db::DbPool;

use crate::aggregate::NotificationMessage;
use crate::delivery::email::{EmailConfig, EmailDelivery};

/// Resolves host user ids to email addresses.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// The address for a user, or `None` when the user cannot receive
    /// email.
    async fn email_for(&self, user_id: DbId) -> Option<String>;
}

/// Writes notification rows and pushes them through the configured
/// delivery channel.
pub struct NotificationDispatcher {
    pool: DbPool,
    email: Option<EmailDelivery>,
    directory: Option<Arc<dyn RecipientDirectory>>,
}

impl NotificationDispatcher {
    pub fn new(
        pool: DbPool,
        email: Option<EmailDelivery>,
        directory: Option<Arc<dyn RecipientDirectory>>,
    ) -> Self {
        Self {
            pool,
            email,
            directory,
        }
    }

    /// Build a dispatcher from the environment: SMTP is enabled when
    /// `SMTP_HOST` is set, and external delivery additionally needs a
    /// recipient directory.
    pub fn from_env(pool: DbPool, directory: Option<Arc<dyn RecipientDirectory>>) -> Self {
        let email = EmailConfig::from_env().map(EmailDelivery::new);
        if email.is_none() {
            tracing::info!("SMTP not configured, notifications will only be recorded");
        }
        Self::new(pool, email, directory)
    }

    /// Persist and deliver a batch of messages.
    ///
    /// Returns the number delivered externally. A failed email leaves the
    /// notification row undelivered and moves on; the row is the source of
    /// truth either way.
    pub async fn dispatch(&self, messages: &[NotificationMessage]) -> Result<usize, sqlx::Error> {
        let mut delivered = 0;
        for message in messages {
            let notification_id = NotificationRepo::insert(
                &self.pool,
                message.request_id,
                message.user_id,
                &message.subject,
                &message.body,
                message.thread_key,
            )
            .await?;

            if self.deliver_external(message).await {
                NotificationRepo::mark_delivered(&self.pool, notification_id).await?;
                delivered += 1;
            }
        }

        if !messages.is_empty() {
            tracing::info!(
                recorded = messages.len(),
                delivered,
                "Dispatched notifications"
            );
        }
        Ok(delivered)
    }

    async fn deliver_external(&self, message: &NotificationMessage) -> bool {
        let (Some(email), Some(directory)) = (&self.email, &self.directory) else {
            return false;
        };
        let Some(address) = directory.email_for(message.user_id).await else {
            tracing::debug!(user_id = message.user_id, "No email address for recipient");
            return false;
        };
        match email.deliver(&address, message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    user_id = message.user_id,
                    error = %e,
                    "Failed to deliver notification email"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticDirectory(HashMap<DbId, String>);

    #[async_trait]
    impl RecipientDirectory for StaticDirectory {
        async fn email_for(&self, user_id: DbId) -> Option<String> {
            self.0.get(&user_id).cloned()
        }
    }

    #[tokio::test]
    async fn directory_resolves_known_users_only() {
        let directory = StaticDirectory(HashMap::from([(7, "t@example.edu".to_string())]));
        assert_eq!(directory.email_for(7).await.as_deref(), Some("t@example.edu"));
        assert_eq!(directory.email_for(8).await, None);
    }
}
