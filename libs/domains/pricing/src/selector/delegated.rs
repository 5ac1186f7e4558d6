//! LLM-backed selection
//!
//! For each provider group, a completion endpoint (Ollama-style
//! `{model, prompt, stream}` request, `{response}` reply) is asked to
//! pick one candidate by id. Any failure skips that group.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{PlanSelector, group_by_provider};
use crate::config::{LlmConfig, SelectionPolicy};
use crate::models::{CloudPlan, CloudProvider, OperatingSystem};

const INSTRUCTION: &str = "You are a cloud cost advisor. From the candidate plans below, \
choose the single plan offering the best value for money (CPU and RAM per monthly price). \
Reply with only a JSON object of the form {\"id\": \"<candidate id>\"}.";

#[derive(Error, Debug)]
enum SelectorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("no JSON object in response")]
    NoJson,

    #[error("malformed choice: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown candidate id '{0}'")]
    UnknownId(String),
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct Candidate<'a> {
    id: String,
    name: &'a str,
    region: &'a str,
    operating_system: OperatingSystem,
    cpu: i32,
    ram_gb: f64,
    price_monthly: f64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    id: serde_json::Value,
}

pub struct DelegatedSelector {
    config: LlmConfig,
    client: Client,
}

impl DelegatedSelector {
    pub fn new(config: LlmConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn choose(
        &self,
        provider: CloudProvider,
        group: &[&CloudPlan],
        custom_prompt: Option<&str>,
    ) -> Option<CloudPlan> {
        match self.ask(provider, group, custom_prompt).await {
            Ok(plan) => Some(plan),
            Err(e @ (SelectorError::NoJson | SelectorError::UnknownId(_))) => {
                debug!(provider = %provider, error = %e, "Skipping provider group");
                None
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "LLM selection failed, skipping provider group");
                None
            }
        }
    }

    async fn ask(
        &self,
        provider: CloudProvider,
        group: &[&CloudPlan],
        custom_prompt: Option<&str>,
    ) -> Result<CloudPlan, SelectorError> {
        let candidates: Vec<Candidate> = group
            .iter()
            .enumerate()
            .map(|(index, plan)| Candidate {
                id: candidate_id(plan, index),
                name: &plan.name,
                region: &plan.region,
                operating_system: plan.operating_system,
                cpu: plan.cpu,
                ram_gb: plan.ram_gb,
                price_monthly: plan.price_monthly,
            })
            .collect();

        let request = GenerateRequest {
            model: &self.config.model,
            prompt: build_prompt(provider, &candidates, custom_prompt)?,
            stream: false,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .timeout(self.config.timeout())
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SelectorError::Status(response.status().as_u16()));
        }

        let body: GenerateResponse = response.json().await?;
        let object = extract_json_object(&body.response).ok_or(SelectorError::NoJson)?;
        let choice: Choice = serde_json::from_str(object)?;
        let id = match choice.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        candidates
            .iter()
            .position(|c| c.id == id)
            .map(|index| group[index].clone())
            .ok_or(SelectorError::UnknownId(id))
    }
}

#[async_trait]
impl PlanSelector for DelegatedSelector {
    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy::Llm
    }

    async fn select(&self, plans: &[CloudPlan], custom_prompt: Option<&str>) -> Vec<CloudPlan> {
        let groups = group_by_provider(plans);
        let choices = groups
            .iter()
            .map(|(provider, group)| self.choose(*provider, group, custom_prompt));

        join_all(choices).await.into_iter().flatten().collect()
    }
}

/// Stored id when present, otherwise `<provider>-<index>` within the group.
fn candidate_id(plan: &CloudPlan, index: usize) -> String {
    match plan.id {
        Some(id) => id.to_string(),
        None => format!("{}-{}", plan.provider, index),
    }
}

fn build_prompt(
    provider: CloudProvider,
    candidates: &[Candidate<'_>],
    custom_prompt: Option<&str>,
) -> Result<String, SelectorError> {
    let mut prompt = format!("{INSTRUCTION}\nProvider: {provider}\n");
    if let Some(extra) = custom_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str(&format!("User requirements: {extra}\n"));
    }
    prompt.push_str("Candidates:\n");
    prompt.push_str(&serde_json::to_string(candidates)?);
    Ok(prompt)
}

/// The first balanced `{...}` object in `text`, ignoring braces inside
/// JSON strings. Models often wrap the answer in prose or code fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
