//! Friendly Captcha verification.
//!
//! One outbound POST per contact submission. The verifier fails closed:
//! an empty solution, a non-success HTTP status, a malformed body, or any
//! transport error all reject the submission.

use serde_json::json;

use crate::config::CaptchaConfig;

/// Verify a CAPTCHA solution token against the configured API.
pub async fn verify_captcha(config: &CaptchaConfig, solution: &str) -> bool {
    if solution.trim().is_empty() {
        tracing::warn!("empty CAPTCHA solution");
        return false;
    }

    let client = match reqwest::Client::builder().timeout(config.timeout()).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build CAPTCHA client");
            return false;
        }
    };

    let body = json!({
        "solution": solution,
        "secret": config.secret,
        "sitekey": config.site_key,
    });

    let response = match client.post(&config.verify_url).json(&body).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "CAPTCHA verification request failed");
            return false;
        }
    };

    if !response.status().is_success() {
        tracing::error!(status = %response.status(), "CAPTCHA API returned an error status");
        return false;
    }

    let result: serde_json::Value = match response.json().await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "CAPTCHA API returned an invalid body");
            return false;
        }
    };

    let success = result["success"].as_bool().unwrap_or(false);
    if !success {
        tracing::warn!(errors = %result["errors"], "CAPTCHA verification rejected");
    }
    success
}
