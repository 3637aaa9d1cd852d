//! Contact form validation and email rendering.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Rough shape check, not RFC 5322: something before an `@`, a dot in the
/// domain, no whitespace.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles"));

/// The raw contact submission as form-encoded fields. Every field is
/// optional at the extraction layer so missing ones can be reported by
/// name instead of failing deserialization.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub consent: Option<String>,
    #[serde(rename = "frc-captcha-solution")]
    pub captcha_solution: Option<String>,
}

impl ContactForm {
    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let blank = |field: &Option<String>| {
            field.as_deref().map_or(true, |value| value.trim().is_empty())
        };

        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.email) {
            missing.push("email");
        }
        if blank(&self.message) {
            missing.push("message");
        }
        if blank(&self.consent) {
            missing.push("consent");
        }
        if blank(&self.captcha_solution) {
            missing.push("frc-captcha-solution");
        }
        missing
    }

    pub fn email_is_valid(&self) -> bool {
        self.email
            .as_deref()
            .map_or(false, |email| EMAIL_RE.is_match(email.trim()))
    }

    /// Consent must be an affirmative value: `on`, `true`, or `1`,
    /// case-insensitive.
    pub fn consent_given(&self) -> bool {
        matches!(
            self.consent
                .as_deref()
                .map(|value| value.trim().to_ascii_lowercase())
                .as_deref(),
            Some("on") | Some("true") | Some("1")
        )
    }

    /// Subject and plain-text body of the outbound contact email.
    pub fn render_email(&self) -> (String, String) {
        let name = self.name.as_deref().unwrap_or_default();
        let email = self.email.as_deref().unwrap_or_default();
        let message = self.message.as_deref().unwrap_or_default();

        let subject = format!("New contact from {}", name);
        let rule = "-".repeat(40);
        let body = format!(
            "New Contact Submission\n{rule}\nName: {name}\nEmail: {email}\nMessage: {message}\n{rule}\n"
        );
        (subject, body)
    }
}
