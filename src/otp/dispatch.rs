//!
//! # Delivery Dispatcher
//!
//! Formats the OTP message for a channel and hands it to a [`ChannelSender`],
//! the seam behind which the actual SMS/email transport lives. Sends carry a
//! bounded timeout; a slow or failing transport surfaces as
//! `OtpError::DeliveryFailed` and never hangs the caller.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{Channel, OtpError};
use crate::users::Account;

/// Transport-level failure, opaque to the OTP core.
#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel-specific senders. Implementations wrap the real SMS gateway and
/// mail provider; tests use recording fakes.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), TransportError>;

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

/// Development transport that logs instead of transmitting.
pub struct LogSender;

#[async_trait]
impl ChannelSender for LogSender {
    async fn send_sms(&self, to: &str, _body: &str) -> Result<(), TransportError> {
        log::info!("OTP sms dispatched to {}", to);
        Ok(())
    }

    async fn send_email(&self, to: &str, _subject: &str, _body: &str) -> Result<(), TransportError> {
        log::info!("OTP email dispatched to {}", to);
        Ok(())
    }
}

/// Sends a generated code to the account's registered address for the chosen
/// channel.
pub struct Dispatcher {
    sender: Arc<dyn ChannelSender>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn ChannelSender>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    /// Transmits `code` over `channel` to the account's registered address.
    ///
    /// Callers decide what a failure means: the lifecycle manager keeps the
    /// stored challenge valid even when delivery fails (store-then-send).
    pub async fn send(
        &self,
        channel: Channel,
        account: &Account,
        code: &str,
    ) -> Result<(), OtpError> {
        let send = async {
            match channel {
                Channel::Sms => {
                    let phone = account.phone.as_deref().ok_or_else(|| {
                        TransportError("no phone number on file".to_string())
                    })?;
                    self.sender.send_sms(phone, &sms_body(code)).await
                }
                Channel::Email => {
                    self.sender
                        .send_email(
                            &account.email,
                            EMAIL_SUBJECT,
                            &email_body(&account.display_name, code),
                        )
                        .await
                }
            }
        };

        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(OtpError::DeliveryFailed(err.to_string())),
            Err(_) => Err(OtpError::DeliveryFailed("send timed out".to_string())),
        }
    }
}

const EMAIL_SUBJECT: &str = "Your verification code";

fn sms_body(code: &str) -> String {
    format!("Your verification code is {}. It expires in 5 minutes.", code)
}

fn email_body(display_name: &str, code: &str) -> String {
    format!(
        "Hi {},\n\nWe received a request to verify your account. Your one-time \
         passcode is {}.\n\nThis code is valid for 5 minutes. Do not share it \
         with anyone.\n",
        display_name, code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ChannelSender for RecordingSender {
        async fn send_sms(&self, to: &str, body: &str) -> Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok(())
        }

        async fn send_email(
            &self,
            to: &str,
            _subject: &str,
            body: &str,
        ) -> Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl ChannelSender for FailingSender {
        async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), TransportError> {
            Err(TransportError("gateway rejected message".to_string()))
        }

        async fn send_email(
            &self,
            _to: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<(), TransportError> {
            Err(TransportError("smtp connection refused".to_string()))
        }
    }

    struct SlowSender;

    #[async_trait]
    impl ChannelSender for SlowSender {
        async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }

        async fn send_email(
            &self,
            _to: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }
    }

    fn test_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            display_name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: Some("9876543210".to_string()),
            picture_url: None,
            password_hash: "digest".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_sms_goes_to_registered_phone() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(sender.clone(), Duration::from_secs(1));

        dispatcher
            .send(Channel::Sms, &test_account(), "123456")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "9876543210");
        assert!(sent[0].1.contains("123456"));
    }

    #[actix_rt::test]
    async fn test_email_body_addresses_the_account() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(sender.clone(), Duration::from_secs(1));

        dispatcher
            .send(Channel::Email, &test_account(), "654321")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].0, "test@example.com");
        assert!(sent[0].1.contains("Test User"));
        assert!(sent[0].1.contains("654321"));
    }

    #[actix_rt::test]
    async fn test_transport_failure_surfaces_as_delivery_failed() {
        let dispatcher = Dispatcher::new(Arc::new(FailingSender), Duration::from_secs(1));

        let result = dispatcher.send(Channel::Sms, &test_account(), "123456").await;
        assert!(matches!(result, Err(OtpError::DeliveryFailed(_))));
    }

    #[actix_rt::test]
    async fn test_missing_phone_fails_delivery() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(sender, Duration::from_secs(1));
        let account = Account {
            phone: None,
            ..test_account()
        };

        let result = dispatcher.send(Channel::Sms, &account, "123456").await;
        assert!(matches!(result, Err(OtpError::DeliveryFailed(_))));
    }

    #[actix_rt::test]
    async fn test_slow_transport_times_out() {
        let dispatcher = Dispatcher::new(Arc::new(SlowSender), Duration::from_millis(10));

        let result = dispatcher.send(Channel::Sms, &test_account(), "123456").await;
        assert!(matches!(result, Err(OtpError::DeliveryFailed(_))));
    }
}
