//! Webhook notification sinks
//!
//! Every review transition and form submission is announced to a chat
//! webhook as a Discord-style embed. Notifications are advisory only:
//! failures are logged and swallowed, never retried, and never surface as
//! an error for the state change itself.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::db::schemas::ScriptDoc;
use crate::review::{Decision, DecisionOutcome};
use crate::types::{KioskError, Result};

/// Which webhook URL a notification goes to, selected by submission type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    ScriptsReview,
    BetaSignup,
    FeaturedTool,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScriptsReview => "scripts-review",
            Self::BetaSignup => "beta-signup",
            Self::FeaturedTool => "featured-tool",
        }
    }

    /// Parse a form kind from the URL path. Review notifications are
    /// internal and not addressable from the forms endpoint.
    pub fn from_form_kind(kind: &str) -> Option<Self> {
        match kind {
            "beta-signup" => Some(Self::BetaSignup),
            "featured-tool" => Some(Self::FeaturedTool),
            _ => None,
        }
    }
}

/// One name/value line in an embed
#[derive(Serialize, Clone, Debug)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl EmbedField {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: None,
        }
    }

    pub fn inline(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: Some(true),
        }
    }
}

/// Discord-style embed body
#[derive(Serialize, Clone, Debug)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    embeds: [&'a Embed; 1],
}

/// Capability trait so the catalog service stays testable without
/// network mocking
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, kind: SinkKind, embed: Embed) -> Result<()>;
}

/// Production sink posting to the configured webhook URLs
pub struct WebhookSink {
    http: reqwest::Client,
    scripts_review: Option<String>,
    beta_signup: Option<String>,
    featured_tool: Option<String>,
}

impl WebhookSink {
    pub fn from_args(args: &Args) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            scripts_review: args.webhook_scripts_review.clone(),
            beta_signup: args.webhook_beta_signup.clone(),
            featured_tool: args.webhook_featured_tool.clone(),
        }
    }

    fn url_for(&self, kind: SinkKind) -> Option<&str> {
        match kind {
            SinkKind::ScriptsReview => self.scripts_review.as_deref(),
            SinkKind::BetaSignup => self.beta_signup.as_deref(),
            SinkKind::FeaturedTool => self.featured_tool.as_deref(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, kind: SinkKind, embed: Embed) -> Result<()> {
        let url = match self.url_for(kind) {
            Some(u) => u,
            None => {
                debug!(sink = kind.as_str(), "No webhook URL configured, dropping notification");
                return Ok(());
            }
        };

        let payload = WebhookPayload { embeds: [&embed] };
        let response = self.http.post(url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(KioskError::Upstream(format!(
                "Webhook sink {} returned {}",
                kind.as_str(),
                response.status()
            )));
        }

        Ok(())
    }
}

/// Embed for a moderator decision
pub fn decision_embed(entry: &ScriptDoc, outcome: &DecisionOutcome) -> Embed {
    let color = match outcome.decision {
        Decision::Accepted => 0x2ecc71,
        Decision::Denied => 0xe74c3c,
        Decision::ChangesRequested => 0xe67e22,
    };

    let mut fields = vec![
        EmbedField::inline("Script", entry.name.clone()),
        EmbedField::inline("Author", entry.author.clone()),
        EmbedField::inline("Version", outcome.version.clone()),
    ];
    if let Some(ref hash) = outcome.hash {
        fields.push(EmbedField::inline("Commit", hash.clone()));
    }
    if let Some(ref feedback) = outcome.feedback {
        fields.push(EmbedField::new("Feedback", feedback.clone()));
    }

    Embed {
        title: format!("Review: {} — {}", entry.name, outcome.decision.as_str()),
        color,
        fields,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Embed for a new submission or a resubmitted edit
pub fn submission_embed(entry: &ScriptDoc, resubmission: bool) -> Embed {
    let title = if resubmission {
        format!("Resubmission: {}", entry.name)
    } else {
        format!("New submission: {}", entry.name)
    };

    let hash = entry
        .pending
        .as_ref()
        .map(|p| p.hash.clone())
        .or_else(|| entry.history.get(&entry.version).cloned())
        .unwrap_or_default();

    Embed {
        title,
        color: 0x3498db,
        fields: vec![
            EmbedField::inline("Author", entry.author.clone()),
            EmbedField::inline("Version", entry.version.clone()),
            EmbedField::inline("Commit", hash),
            EmbedField::new("URL", entry.url.clone()),
        ],
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Embed for a forwarded marketing form, one field per form entry
pub fn form_embed(kind: SinkKind, values: &serde_json::Map<String, serde_json::Value>) -> Embed {
    let fields = values
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            EmbedField::new(name, rendered)
        })
        .collect();

    Embed {
        title: format!("Form submission: {}", kind.as_str()),
        color: 0x9b59b6,
        fields,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording sink for service tests

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(SinkKind, Embed)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, kind: SinkKind, embed: Embed) -> Result<()> {
            self.sent.lock().unwrap().push((kind, embed));
            if self.fail {
                return Err(KioskError::Upstream("sink down".to_string()));
            }
            Ok(())
        }
    }
}
