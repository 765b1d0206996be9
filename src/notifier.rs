//! Best-effort email delivery through an HTTP mail-relay API. A failed or
//! unconfigured send must never affect the request that triggered it.

use std::env;
use std::time::Duration;

/// Fires off a confirmation email in a background task. Skipped when
/// `MAIL_API_URL` is unset or the recipient address is empty; any delivery
/// failure is logged and swallowed.
pub fn send_best_effort(recipient: &str, subject: &str, body: &str) {
    let Ok(api_url) = env::var("MAIL_API_URL") else {
        tracing::debug!("MAIL_API_URL not set, skipping email to {}", recipient);
        return;
    };

    if recipient.is_empty() {
        tracing::debug!("No recipient address, skipping email");
        return;
    }

    let token = env::var("MAIL_API_TOKEN").ok();
    let from = env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@donatehub.local".to_string());
    let payload = serde_json::json!({
        "from": from,
        "to": recipient,
        "subject": subject,
        "text": body,
    });
    let recipient = recipient.to_string();

    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Mail client build failed: {}", e);
                return;
            }
        };

        let mut request = client.post(&api_url).json(&payload);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("Confirmation email queued for {}", recipient);
            }
            Ok(resp) => {
                tracing::warn!("Mail relay returned status {} for {}", resp.status(), recipient);
            }
            Err(e) => {
                tracing::warn!("Mail delivery failed for {}: {}", recipient, e);
            }
        }
    });
}
