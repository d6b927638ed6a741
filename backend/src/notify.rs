use std::sync::Arc;

use async_trait::async_trait;
use shared::SmsNotification;
use tracing::{error, info};

use crate::config::SmsConfig;

/// Outbound absence notifications.
///
/// Implementations must never fail: any provider or transport problem is
/// folded into the returned [`SmsNotification`], so callers can treat the
/// outcome as data and attendance writes are never blocked.
#[async_trait]
pub trait AbsenceNotifier: Send + Sync {
    async fn notify_absence(&self, student_name: &str, parent_phone: &str) -> SmsNotification;
}

/// Pick the notifier variant once at startup: live Twilio dispatch when all
/// credentials are configured, mock otherwise.
pub fn notifier_from_config(config: &SmsConfig) -> Arc<dyn AbsenceNotifier> {
    match (
        config.account_sid.clone(),
        config.auth_token.clone(),
        config.from_number.clone(),
    ) {
        (Some(sid), Some(token), Some(from)) => {
            info!("📱 SMS notifications enabled (Twilio)");
            Arc::new(TwilioSmsNotifier::new(sid, token, from))
        }
        _ => {
            info!("📱 SMS not configured, absence notifications will be mocked");
            Arc::new(MockSmsNotifier)
        }
    }
}

fn absence_message(student_name: &str) -> String {
    format!(
        "Dear Parent, this is to inform you that your child {student_name} was marked absent today. Please contact the school if you have any questions."
    )
}

/// No-credentials mode: logs the would-be message and reports success.
pub struct MockSmsNotifier;

#[async_trait]
impl AbsenceNotifier for MockSmsNotifier {
    async fn notify_absence(&self, student_name: &str, parent_phone: &str) -> SmsNotification {
        info!(
            "📱 SMS (Mock): Would send absence notification for {} to {}",
            student_name, parent_phone
        );
        SmsNotification::mock()
    }
}

/// Live dispatch through the Twilio Messages API.
pub struct TwilioSmsNotifier {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsNotifier {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    async fn send(&self, to: &str, body: &str) -> Result<String, String> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;

        if status.is_success() {
            payload
                .get("sid")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| "Provider response missing message sid".to_string())
        } else {
            Err(payload
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("SMS provider error")
                .to_string())
        }
    }
}

#[async_trait]
impl AbsenceNotifier for TwilioSmsNotifier {
    async fn notify_absence(&self, student_name: &str, parent_phone: &str) -> SmsNotification {
        match self.send(parent_phone, &absence_message(student_name)).await {
            Ok(sid) => {
                info!("📱 SMS sent: {}", sid);
                SmsNotification::sent(sid)
            }
            Err(err) => {
                error!("📱 SMS error: {}", err);
                SmsNotification::failed(err)
            }
        }
    }
}
