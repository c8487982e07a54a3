use crate::models::{DbEngagement, DbUser};
use crate::services::localization::Localization;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub engagement_id: Option<String>,
}

#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn send(&self, fcm_token: &str, message: &PushMessage) -> Result<(), String>;
}

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

/// Firebase Cloud Messaging over its HTTP endpoint.
pub struct FcmNotifier {
    client: reqwest::Client,
    server_key: String,
}

impl FcmNotifier {
    pub fn new(server_key: String) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(FcmNotifier { client, server_key })
    }
}

#[async_trait]
impl PushNotifier for FcmNotifier {
    async fn send(&self, fcm_token: &str, message: &PushMessage) -> Result<(), String> {
        let payload = serde_json::json!({
            "to": fcm_token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": {
                "engagementId": message.engagement_id,
            }
        });

        let response = self
            .client
            .post(FCM_ENDPOINT)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("FCM request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("FCM responded with {}", response.status()));
        }
        Ok(())
    }
}

/// Used when no FCM key is configured.
pub struct NoopNotifier;

#[async_trait]
impl PushNotifier for NoopNotifier {
    async fn send(&self, fcm_token: &str, message: &PushMessage) -> Result<(), String> {
        log::debug!("Push disabled, dropping '{}' for token {}", message.title, fcm_token);
        Ok(())
    }
}

/// Builds localized push messages and hands them to the configured notifier.
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn PushNotifier>,
    localization: Localization,
}

impl Notifications {
    pub fn new(notifier: Arc<dyn PushNotifier>, localization: Localization) -> Self {
        Notifications { notifier, localization }
    }

    /// Sends nothing when the user never registered a device token.
    async fn dispatch(&self, user: &DbUser, message: PushMessage) -> bool {
        let Some(token) = user.fcm_token.as_deref().filter(|t| !t.is_empty()) else {
            return false;
        };
        match self.notifier.send(token, &message).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("⚠️  Push notification to {} failed: {}", user.id, e);
                false
            }
        }
    }

    pub async fn assigned_engagement(&self, user: &DbUser, engagement: &DbEngagement, locale: &str) -> bool {
        let message = PushMessage {
            title: self.localization.t("notifications.assignedTitle", locale, &[]),
            body: self.localization.t(
                "notifications.assignedBody",
                locale,
                &[("title", engagement.title.as_str())],
            ),
            engagement_id: Some(engagement.id.clone()),
        };
        self.dispatch(user, message).await
    }

    pub async fn mentioned(
        &self,
        user: &DbUser,
        author: &DbUser,
        engagement: &DbEngagement,
        locale: &str,
    ) -> bool {
        let author_name = author.display_name();
        let message = PushMessage {
            title: self.localization.t("notifications.mentionTitle", locale, &[]),
            body: self.localization.t(
                "notifications.mentionBody",
                locale,
                &[("user", author_name.as_str()), ("title", engagement.title.as_str())],
            ),
            engagement_id: Some(engagement.id.clone()),
        };
        self.dispatch(user, message).await
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, PushMessage)>>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<(String, PushMessage)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PushNotifier for RecordingNotifier {
        async fn send(&self, fcm_token: &str, message: &PushMessage) -> Result<(), String> {
            self.sent.lock().unwrap().push((fcm_token.to_string(), message.clone()));
            Ok(())
        }
    }
}
