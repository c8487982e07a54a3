pub mod authenticator;
pub mod localization;
pub mod mailer;
pub mod notifications;
pub mod publisher;
pub mod telemetry;

pub use authenticator::{Authenticator, Claims, TokenIssuer};
pub use localization::Localization;
pub use mailer::{MailMessage, Mailer, NoopMailer, SmtpMailer};
pub use notifications::{FcmNotifier, NoopNotifier, Notifications, PushNotifier};
pub use publisher::Publisher;
pub use telemetry::Telemetry;

use crate::config::AppConfig;
use crate::database::Collections;
use std::sync::Arc;

/// Everything an interactor may touch, assembled once at startup.
#[derive(Clone)]
pub struct Services {
    pub config: AppConfig,
    pub collections: Collections,
    pub authenticator: Authenticator,
    pub token_issuer: TokenIssuer,
    pub publisher: Publisher,
    pub notifications: Notifications,
    pub mailer: Arc<dyn Mailer>,
    pub telemetry: Telemetry,
    pub localization: Localization,
}

impl Services {
    pub fn new(
        config: AppConfig,
        collections: Collections,
        notifier: Arc<dyn PushNotifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let localization = Localization::new(&config.default_locale);
        Services {
            authenticator: Authenticator::new(&config),
            token_issuer: TokenIssuer,
            publisher: Publisher::new(config.subscription_buffer),
            notifications: Notifications::new(notifier, localization.clone()),
            mailer,
            telemetry: Telemetry,
            localization,
            collections,
            config,
        }
    }

    /// Push and mail backends chosen from configuration.
    pub fn from_config(config: AppConfig, collections: Collections) -> Self {
        let notifier: Arc<dyn PushNotifier> = match config.fcm_server_key.clone() {
            Some(key) => match FcmNotifier::new(key) {
                Ok(fcm) => Arc::new(fcm),
                Err(e) => {
                    log::warn!("⚠️  Push notifications disabled: {}", e);
                    Arc::new(NoopNotifier)
                }
            },
            None => {
                log::info!("ℹ️  FCM_SERVER_KEY not set, push notifications disabled");
                Arc::new(NoopNotifier)
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => match SmtpMailer::new(smtp) {
                Ok(mailer) => Arc::new(mailer),
                Err(e) => {
                    log::warn!("⚠️  Mail disabled: {}", e);
                    Arc::new(NoopMailer)
                }
            },
            None => {
                log::info!("ℹ️  SMTP_HOST not set, outgoing mail disabled");
                Arc::new(NoopMailer)
            }
        };

        Services::new(config, collections, notifier, mailer)
    }

    pub fn t(&self, key: &str, locale: &str) -> String {
        self.localization.t(key, locale, &[])
    }

    pub fn t_with(&self, key: &str, locale: &str, args: &[(&str, &str)]) -> String {
        self.localization.t(key, locale, args)
    }
}
