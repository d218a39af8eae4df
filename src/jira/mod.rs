
use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::JiraConfig;
use crate::openai::build_agent;
use crate::{Result, TestGenError};

/// Anything that can hand back the text of a ticket field
pub trait TicketSource {
    fn fetch(&self, ticket_id: &str, field: &str) -> Result<String>;
}

/// Blocking JIRA REST client using basic auth
#[derive(Debug, Clone)]
pub struct JiraClient {
    endpoint: String,
    authorization: String,
    agent: ureq::Agent,
}

impl JiraClient {
    #[inline]
    pub fn new(config: &JiraConfig) -> anyhow::Result<Self> {
        Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid JIRA endpoint: '{}'", config.endpoint))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            authorization: basic_auth(&config.username, &config.api_token),
            agent: build_agent(config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    fn ticket_url(&self, ticket_id: &str, field: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.endpoint, ticket_id))
            .with_context(|| format!("Invalid ticket URL for '{ticket_id}'"))?;
        url.query_pairs_mut().append_pair("fields", field);
        Ok(url)
    }

    fn get_ticket(&self, ticket_id: &str, field: &str) -> Result<Value> {
        let url = self.ticket_url(ticket_id, field)?;

        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .call()
            .map_err(|e| retrieval_error(ticket_id, format!("request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(retrieval_error(
                ticket_id,
                format!("API response: {}", status.as_u16()),
            ));
        }

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| retrieval_error(ticket_id, format!("unreadable response body: {e}")))?;

        serde_json::from_str(&text)
            .map_err(|e| retrieval_error(ticket_id, format!("invalid response body: {e}")))
    }
}

impl TicketSource for JiraClient {
    fn fetch(&self, ticket_id: &str, field: &str) -> Result<String> {
        info!(
            "Retrieving ticket information for '{}' from field '{}'...",
            ticket_id, field
        );

        let body = self.get_ticket(ticket_id, field)?;
        let info = field_text(&body, ticket_id, field)?;

        debug!("Ticket information for '{}':\n{}", ticket_id, info);
        Ok(info)
    }
}

/// Pull `fields.<field>` out of an issue document as text
#[inline]
pub fn field_text(issue: &Value, ticket_id: &str, field: &str) -> Result<String> {
    let fields = issue.get("fields").ok_or_else(|| {
        retrieval_error(
            ticket_id,
            format!("ticket does not contain the field '{field}'"),
        )
    })?;

    let text = match fields.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string(other)
            .map_err(|e| TestGenError::Other(anyhow!("failed to render field '{field}': {e}")))?,
    };

    if text.is_empty() {
        return Err(retrieval_error(
            ticket_id,
            format!("No ticket information from field '{field}'"),
        ));
    }

    Ok(text)
}

fn basic_auth(username: &str, api_token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{api_token}")))
}

fn retrieval_error(ticket_id: &str, message: String) -> TestGenError {
    TestGenError::TicketRetrieval {
        ticket: ticket_id.to_string(),
        message,
    }
}
