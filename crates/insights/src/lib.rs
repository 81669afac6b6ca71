//! AI productivity summaries over the caller's task list. Every failure mode
//! here is survivable; callers fall back to [`FALLBACK_INSIGHT`].

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tasks::{TaskPriority, TaskStatus};
use thiserror::Error;
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: u32 = 512;
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are a productivity coach inside a personal task tracker. \
     Reply with a short encouraging summary of the user's situation, 3 to 4 plain sentences, \
     no lists, ending with the single most useful next step.";

/// Served whenever a summary cannot be produced.
pub const FALLBACK_INSIGHT: &str = "Keep chipping away at your list: finish what is already \
     in progress before starting anything new, and give overdue tasks the first slot of your day.";

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No API key configured")]
    MissingApiKey,
}

/// What the client sends along for summarizing. Extra fields are ignored;
/// unreadable elements degrade to defaults instead of failing the call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct InsightsService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl InsightsService {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        if api_key.is_none() {
            info!("No AI API key configured; insights will serve the fallback summary");
        }

        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Asks the model for a summary of the supplied tasks.
    pub async fn generate(&self, tasks: &[TaskSnapshot]) -> Result<String, InsightsError> {
        let api_key = self.api_key.as_ref().ok_or(InsightsError::MissingApiKey)?;

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(tasks),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
        };

        let response = self
            .client
            .post(format!("{}{MESSAGES_PATH}", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InsightsError::Api(format!("API returned {status}: {body}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|err| InsightsError::Parse(err.to_string()))?;

        let text = parsed
            .content
            .first()
            .map(|block| block.text.trim())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(InsightsError::Parse(
                "response carried no text".to_string(),
            ));
        }

        Ok(text.to_string())
    }
}

/// Counts fed to the prompt. Unknown status/priority strings count as the
/// field defaults, matching how the API itself fills absent fields.
#[derive(Debug, Default, PartialEq)]
struct TaskDigest {
    total: usize,
    pending: usize,
    in_progress: usize,
    done: usize,
    low: usize,
    medium: usize,
    high: usize,
    overdue: usize,
}

impl TaskDigest {
    fn from_snapshots(tasks: &[TaskSnapshot], today: NaiveDate) -> Self {
        let mut digest = Self {
            total: tasks.len(),
            ..Self::default()
        };

        for task in tasks {
            let status = parse_or_default::<TaskStatus>(task.status.as_deref());
            match status {
                TaskStatus::Pending => digest.pending += 1,
                TaskStatus::InProgress => digest.in_progress += 1,
                TaskStatus::Done => digest.done += 1,
            }

            match parse_or_default::<TaskPriority>(task.priority.as_deref()) {
                TaskPriority::Low => digest.low += 1,
                TaskPriority::Medium => digest.medium += 1,
                TaskPriority::High => digest.high += 1,
            }

            if status != TaskStatus::Done
                && let Some(due) = task.due_date.as_deref().and_then(parse_date)
                && due < today
            {
                digest.overdue += 1;
            }
        }

        digest
    }
}

fn parse_or_default<T>(raw: Option<&str>) -> T
where
    T: std::str::FromStr + Default,
{
    raw.and_then(|value| value.parse().ok()).unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|timestamp| timestamp.date_naive())
    })
}

fn build_prompt(tasks: &[TaskSnapshot]) -> String {
    let digest = TaskDigest::from_snapshots(tasks, chrono::Utc::now().date_naive());
    if digest.total == 0 {
        return "The user's task list is empty. Suggest an encouraging way to get started."
            .to_string();
    }

    format!(
        "The user tracks {} tasks: {} pending, {} in progress, {} done. \
         Priorities: {} high, {} medium, {} low. \
         {} open tasks are past their due date. \
         Summarize how they are doing and what to tackle next.",
        digest.total,
        digest.pending,
        digest.in_progress,
        digest.done,
        digest.high,
        digest.medium,
        digest.low,
        digest.overdue,
    )
}
