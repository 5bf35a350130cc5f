//! Generation-agent session client.
//!
//! The agent is an opaque HTTP boundary: sessions are created, prompts
//! submitted, sessions deleted. Aggregation and recovery never call it; they
//! only depend on the run artifact it leaves behind and on the two failure
//! markers rendered into that artifact when a run cannot complete.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File recording the latest generation attempt's outcome.
pub const RUN_ARTIFACT_NAME: &str = "run_output.json";

/// Marker written when the agent could not be reached or answered garbage.
pub const CONNECTION_FAILURE_MARKER: &str = "connection error";

/// Marker written when every retry of a request failed.
pub const RETRY_EXHAUSTED_MARKER: &str = "max retries exceeded";

const DEFAULT_MAX_RETRIES: u32 = 3;

// The aggregation and recovery surfaces never drive the agent directly;
// the client below belongs to the generation harness that produces the run
// artifacts these tools consume.

/// A failed agent interaction, renderable as run-artifact sentinel text.
#[derive(Debug)]
#[allow(dead_code)]
pub enum AgentFailure {
    Connection { detail: String },
    RetriesExhausted { attempts: u32, last_error: String },
}

impl AgentFailure {
    #[allow(dead_code)]
    pub fn sentinel_text(&self) -> String {
        match self {
            AgentFailure::Connection { detail } => {
                format!("{CONNECTION_FAILURE_MARKER}: {detail}")
            }
            AgentFailure::RetriesExhausted {
                attempts,
                last_error,
            } => {
                format!("{RETRY_EXHAUSTED_MARKER} after {attempts} attempts: {last_error}")
            }
        }
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub enum AgentOutcome {
    Response(Value),
    Failure(AgentFailure),
}

/// Write the run artifact for a project. The schema is otherwise opaque;
/// only the failure markers inside it are load-bearing.
#[allow(dead_code)]
pub fn write_run_artifact(project_dir: &Path, outcome: &AgentOutcome) -> Result<()> {
    let payload = match outcome {
        AgentOutcome::Response(value) => json!({ "response": value }),
        AgentOutcome::Failure(failure) => json!({ "error": failure.sentinel_text() }),
    };
    let path = project_dir.join(RUN_ARTIFACT_NAME);
    let body = serde_json::to_string_pretty(&payload).context("serialize run artifact")?;
    fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[allow(dead_code)]
pub struct AgentClient {
    base_url: String,
    agent: ureq::Agent,
    max_retries: u32,
}

#[allow(dead_code)]
impl AgentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        AgentClient {
            base_url: base_url.into(),
            agent: config.new_agent(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn create_session(&self) -> Result<String, AgentFailure> {
        let value = self.post_json(&format!("{}/sessions", self.base_url), &json!({}))?;
        value
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AgentFailure::Connection {
                detail: "response missing session_id".to_string(),
            })
    }

    pub fn submit_prompt(&self, session_id: &str, prompt: &str) -> Result<Value, AgentFailure> {
        self.post_json(
            &format!("{}/sessions/{session_id}/prompt", self.base_url),
            &json!({ "prompt": prompt }),
        )
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), AgentFailure> {
        let url = format!("{}/sessions/{session_id}", self.base_url);
        self.agent
            .delete(&url)
            .call()
            .map_err(|err| AgentFailure::Connection {
                detail: err.to_string(),
            })?;
        Ok(())
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, AgentFailure> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match self.agent.post(url).send_json(body) {
                Ok(mut response) => {
                    return response.body_mut().read_json().map_err(|err| {
                        AgentFailure::Connection {
                            detail: err.to_string(),
                        }
                    });
                }
                Err(err) => {
                    last_error = err.to_string();
                    tracing::debug!(attempt, url, error = %last_error, "agent request failed");
                }
            }
        }
        Err(AgentFailure::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }
}
