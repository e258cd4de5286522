//! Outbound email via a provider HTTP API
//!
//! The provider is an external collaborator: we POST a JSON payload and log
//! the outcome. Registration OTP sends are awaited so a failed send fails the
//! request; everything else goes out fire-and-forget.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

pub struct EmailService {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: String,
    from: String,
    admin_email: Option<String>,
}

impl EmailService {
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: std::env::var("EMAIL_API_URL").ok(),
            api_key: std::env::var("EMAIL_API_KEY").unwrap_or_default(),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@pickvault.app".to_string()),
            admin_email: std::env::var("ADMIN_NOTIFICATION_EMAIL").ok(),
        }
    }

    /// Send one email, awaiting the provider response.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some(api_url) = &self.api_url else {
            tracing::warn!(to, subject, "email provider not configured; dropping email");
            return Ok(());
        };

        let response = self
            .client
            .post(api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .context("email provider request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("email provider returned {}", response.status());
        }

        tracing::info!(to, subject, "email sent");
        Ok(())
    }

    /// Fire-and-forget send for non-critical notifications; failures are
    /// logged, never surfaced to the caller.
    pub fn send_detached(self: &Arc<Self>, to: String, subject: String, body: String) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.send(&to, &subject, &body).await {
                tracing::error!(error = %e, to, "notification email failed");
            }
        });
    }

    pub async fn send_otp(&self, to: &str, name: &str, otp: &str) -> Result<()> {
        self.send(
            to,
            "Verify your email",
            &format!(
                "Hi {name},\n\nYour verification code is {otp}. It expires in 15 minutes.\n"
            ),
        )
        .await
    }

    pub async fn send_password_reset(&self, to: &str, code: &str) -> Result<()> {
        self.send(
            to,
            "Password reset code",
            &format!("Your password reset code is {code}. It expires in 15 minutes.\n"),
        )
        .await
    }

    pub fn send_welcome(self: &Arc<Self>, to: &str, name: &str) {
        self.send_detached(
            to.to_string(),
            "Welcome to PickVault".to_string(),
            format!("Hi {name},\n\nYour account is ready. Good luck out there.\n"),
        );
    }

    pub fn send_account_created(self: &Arc<Self>, to: &str, name: &str, password: &str) {
        self.send_detached(
            to.to_string(),
            "Your PickVault account".to_string(),
            format!(
                "Hi {name},\n\nAn account was created for you with your subscription.\n\
                 Temporary password: {password}\nPlease change it after logging in.\n"
            ),
        );
    }

    pub fn send_payment_decision(self: &Arc<Self>, to: &str, approved: bool) {
        let (subject, body) = if approved {
            (
                "Payment approved",
                "Your payment request has been approved and applied to your account.\n",
            )
        } else {
            (
                "Payment rejected",
                "Your payment request was rejected. Contact support for details.\n",
            )
        };
        self.send_detached(to.to_string(), subject.to_string(), body.to_string());
    }

    pub fn notify_admin_contact(self: &Arc<Self>, from_name: &str, subject: &str) {
        let Some(admin) = self.admin_email.clone() else {
            return;
        };
        self.send_detached(
            admin,
            format!("New contact inquiry: {subject}"),
            format!("New inquiry from {from_name}.\n"),
        );
    }
}
