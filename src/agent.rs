//! Named agents bound to a shared gateway

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use chrono::Utc;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use crate::config::{AgentConfig, DEFAULT_MAX_HISTORY};
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::history::{History, ReasoningKind, ReasoningRecord, TaskRecord};

/// Filler for subtask fields the model left out
pub const NOT_SPECIFIED: &str = "Not specified";

/// Longest raw-response preview kept in a fallback subtask
pub const PREVIEW_CHARS: usize = 200;

/// One entry of a task decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask
{   pub description: String
  , pub resources: String
  , pub expected_outcome: String
  , /// Set only on the fallback entry produced from unparseable output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_error: Option<String>
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T>
{   mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A role and instruction bundle that prompts through a gateway.
///
/// Every call is independent. Histories are appended under a per-agent lock
/// after the model answers, so the same agent can serve concurrent calls.
pub struct Agent
{   name: String
  , role: String
  , instructions: String
  , gateway: Arc<Gateway>
  , task_history: Mutex<History<TaskRecord>>
  , reasoning_history: Mutex<History<ReasoningRecord>>
  , memory: Mutex<HashMap<String, serde_json::Value>>
}

impl fmt::Debug for Agent
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("Agent")
          .field("name", &self.name)
          .field("role", &self.role)
          .finish_non_exhaustive()
    }
}

impl fmt::Display for Agent
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "Agent(name='{}', role='{}')", self.name, self.role)
    }
}

impl Agent
{   pub fn new(
      name: &str
    , role: &str
    , instructions: &str
    , gateway: Arc<Gateway>
    ) -> Result<Self>
    {   let name = name.trim();
        if name.is_empty()
        {   return Err(Error::Validation(
              "agent name must be a non-empty string".to_string()
            ));
        }
        info!("Agent '{}' initialized with role '{}'", name, role);
        Ok(Agent
        {   name: name.to_string()
          , role: role.to_string()
          , instructions: instructions.to_string()
          , gateway
          , task_history: Mutex::new(History::new(DEFAULT_MAX_HISTORY))
          , reasoning_history: Mutex::new(History::new(DEFAULT_MAX_HISTORY))
          , memory: Mutex::new(HashMap::new())
        })
    }

    pub fn from_config(
      config: &AgentConfig
    , gateway: Arc<Gateway>
    ) -> Result<Self>
    {   let agent = Agent::new(
          &config.name,
          &config.role,
          &config.instructions,
          gateway
        )?;
        agent.set_max_history_entries(config.max_history)?;
        Ok(agent)
    }

    pub fn name(&self) -> &str
    {   &self.name
    }

    pub fn role(&self) -> &str
    {   &self.role
    }

    pub fn instructions(&self) -> &str
    {   &self.instructions
    }

    pub fn gateway(&self) -> &Arc<Gateway>
    {   &self.gateway
    }

    // ===== History =====

    pub fn max_history_entries(&self) -> usize
    {   lock(&self.task_history).max()
    }

    /// Bound both histories; shrinking trims them right away
    pub fn set_max_history_entries(&self, max: usize) -> Result<()>
    {   if max == 0
        {   return Err(Error::Validation(
              "max history entries must be at least 1".to_string()
            ));
        }
        debug!("Agent '{}' history bound set to {}", self.name, max);
        lock(&self.task_history).set_max(max);
        lock(&self.reasoning_history).set_max(max);
        Ok(())
    }

    /// Oldest first
    pub fn task_history(&self) -> Vec<TaskRecord>
    {   lock(&self.task_history).snapshot()
    }

    /// Oldest first
    pub fn reasoning_history(&self) -> Vec<ReasoningRecord>
    {   lock(&self.reasoning_history).snapshot()
    }

    fn record_task(
      &self
    , task: &str
    , context: Option<&serde_json::Value>
    , result: &str
    )
    {   lock(&self.task_history).push(TaskRecord
        {   task: task.to_string()
          , context: context.cloned()
          , result: result.to_string()
          , timestamp: Utc::now()
        });
    }

    fn record_reasoning(&self, kind: ReasoningKind, result: &str)
    {   lock(&self.reasoning_history).push(ReasoningRecord
        {   kind
          , result: result.to_string()
          , timestamp: Utc::now()
        });
    }

    // ===== Memory =====

    pub fn remember(&self, key: impl Into<String>, value: serde_json::Value)
    {   lock(&self.memory).insert(key.into(), value);
    }

    pub fn recall(&self, key: &str) -> Option<serde_json::Value>
    {   lock(&self.memory).get(key).cloned()
    }

    pub fn clear_memory(&self)
    {   lock(&self.memory).clear();
    }

    // ===== Prompts =====

    /// Prompt used by [`Agent::execute_task`]
    pub fn task_prompt(
      &self
    , task: &str
    , context: Option<&serde_json::Value>
    ) -> String
    {   let context = render_context(context);
        format!(
"You are {name}, a {role}.
{instructions}

Task: {task}

Context: {context}

Please provide a detailed response to the task.",
          name = self.name,
          role = self.role,
          instructions = self.instructions,
          task = task,
          context = context
        )
    }

    // ===== Operations =====

    /// Run a task through the gateway and log it
    pub async fn execute_task(
      &self
    , task: &str
    , context: Option<&serde_json::Value>
    ) -> Result<String>
    {   if task.trim().is_empty()
        {   return Err(Error::Validation(
              "task must be a non-empty string".to_string()
            ));
        }
        debug!("Executing task '{}' for agent '{}'", task, self.name);

        let prompt = self.task_prompt(task, context);
        trace!("Task prompt: {}", prompt);
        let result = self.gateway.request(&prompt).await.map_err(|e| {
          error!(
            "Failed to execute task '{}' for agent '{}': {}",
            task, self.name, e
          );
          e.context(format!(
            "failed to execute task '{}' for agent '{}'", task, self.name
          ))
        })?;

        self.record_task(task, context, &result);
        debug!("Task '{}' completed for agent '{}'", task, self.name);
        Ok(result)
    }

    /// Ask for a reasoning breakdown in `steps` stages
    pub async fn think_step_by_step(
      &self
    , problem: &str
    , steps: usize
    ) -> Result<String>
    {   if problem.trim().is_empty()
        {   return Err(Error::Validation(
              "problem must be a non-empty string".to_string()
            ));
        }
        if steps == 0
        {   return Err(Error::Validation(
              "steps must be at least 1".to_string()
            ));
        }
        debug!("Agent '{}' reasoning in {} steps", self.name, steps);

        let prompt = format!(
"Break down the following problem into {steps} clear reasoning steps:
Problem: {problem}

Provide a structured approach with exactly {steps} numbered steps, moving
from initial analysis through key considerations to a solution approach."
        );
        let result = self.gateway.request(&prompt).await
          .map_err(|e| e.context(format!("agent '{}' reasoning", self.name)))?;

        self.record_reasoning(
          ReasoningKind::StepByStep
          {   problem: problem.to_string()
            , steps
          },
          &result
        );
        Ok(result)
    }

    /// Revise a response given feedback
    pub async fn self_correct(
      &self
    , initial_response: &str
    , feedback: &str
    ) -> Result<String>
    {   debug!("Agent '{}' self-correcting", self.name);
        let prompt = format!(
"Improve the following response based on feedback:

Original response: {initial_response}
Feedback: {feedback}

Please revise your response to be more accurate and complete."
        );
        let result = self.gateway.request(&prompt).await
          .map_err(|e| e.context(format!("agent '{}' correction", self.name)))?;

        self.record_reasoning(
          ReasoningKind::Correction
          {   original: initial_response.to_string()
            , feedback: feedback.to_string()
          },
          &result
        );
        Ok(result)
    }

    /// Split a task into at most `max_subtasks` structured subtasks.
    ///
    /// Output that is not JSON at all yields a single fallback entry with
    /// `parsing_error` set instead of an error.
    pub async fn decompose_task(
      &self
    , task: &str
    , max_subtasks: usize
    ) -> Result<Vec<Subtask>>
    {   if task.trim().is_empty()
        {   return Err(Error::Validation(
              "task must be a non-empty string".to_string()
            ));
        }
        if max_subtasks == 0
        {   return Err(Error::Validation(
              "max_subtasks must be at least 1".to_string()
            ));
        }
        debug!("Agent '{}' decomposing '{}'", self.name, task);

        let prompt = decomposition_prompt(task, max_subtasks);
        let raw = self.gateway.request(&prompt).await.map_err(|e| {
          error!("Decomposition of '{}' failed: {}", task, e);
          e.context(format!("failed to decompose task '{}'", task))
        })?;

        self.record_reasoning(
          ReasoningKind::Decomposition
          {   task: task.to_string()
          },
          &raw
        );

        parse_subtasks(task, &raw, max_subtasks)
          .map_err(|e| e.context(format!("failed to decompose task '{}'", task)))
    }
}

fn decomposition_prompt(task: &str, max_subtasks: usize) -> String
{   format!(
r#"Decompose the following task into {max_subtasks} or fewer subtasks.
Return your response as a JSON array of objects.

Task: {task}

For each subtask, provide an object with these exact keys:
- "description": A clear description of the subtask
- "resources": Required resources (tools, data, skills needed)
- "expected_outcome": What successful completion looks like

Return ONLY the JSON array, no additional text.
Example format:
[
    {{
        "description": "Research existing solutions",
        "resources": "Internet access, documentation",
        "expected_outcome": "List of 3-5 comparable solutions with pros/cons"
    }}
]"#
    )
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(raw: &str) -> &str
{   let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```json")
    {   body = rest;
    } else if let Some(rest) = body.strip_prefix("```")
    {   body = rest;
    }
    if let Some(rest) = body.strip_suffix("```")
    {   body = rest;
    }
    body.trim()
}

/// First `PREVIEW_CHARS` characters, with an ellipsis when cut
pub fn preview(raw: &str) -> String
{   if raw.chars().count() > PREVIEW_CHARS
    {   let head: String = raw.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else
    {   raw.to_string()
    }
}

fn field_text(entry: &serde_json::Map<String, serde_json::Value>, keys: &[&str])
  -> String
{   keys.iter()
      .filter_map(|key| entry.get(*key))
      .find(|value| !value.is_null())
      .map(|value| match value
      {   serde_json::Value::String(text) => text.clone()
        , other => other.to_string()
      })
      .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn normalize(entry: &serde_json::Value) -> Subtask
{   match entry
    {   serde_json::Value::Object(map) => Subtask
        {   description: field_text(map, &["description"])
          , resources: field_text(map, &["resources"])
          , expected_outcome: field_text(
              map, &["expected_outcome", "expectedOutcome"]
            )
          , parsing_error: None
        }
      , other => Subtask
        {   description: match other
            {   serde_json::Value::String(text) => text.clone()
              , value => value.to_string()
            }
          , resources: NOT_SPECIFIED.to_string()
          , expected_outcome: NOT_SPECIFIED.to_string()
          , parsing_error: None
        }
    }
}

/// Single-line JSON with a space after `:` and `,`
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter
{   fn begin_array_value<W>(&mut self, writer: &mut W, first: bool)
      -> std::io::Result<()>
    where W: ?Sized + std::io::Write
    {   if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool)
      -> std::io::Result<()>
    where W: ?Sized + std::io::Write
    {   if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W)
      -> std::io::Result<()>
    where W: ?Sized + std::io::Write
    {   writer.write_all(b": ")
    }
}

/// Context as it appears in prompts; absent, null or empty renders `None`
pub fn render_context(context: Option<&serde_json::Value>) -> String
{   let value = match context
    {   None | Some(serde_json::Value::Null) => return "None".to_string()
      , Some(serde_json::Value::Object(map)) if map.is_empty() => {
          return "None".to_string();
        }
      , Some(value) => value
    };
    let mut buf = Vec::new();
    let written = {
      let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
      value.serialize(&mut ser)
    };
    match written
    {   Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
      , Err(e) => {
          warn!("Could not render context: {}", e);
          value.to_string()
        }
    }
}

/// Turn raw model output into subtasks
pub fn parse_subtasks(
  task: &str
, raw: &str
, max_subtasks: usize
) -> Result<Vec<Subtask>>
{   let body = strip_code_fence(raw);
    match serde_json::from_str::<serde_json::Value>(body)
    {   Ok(serde_json::Value::Array(entries)) => {
          Ok(entries.iter().take(max_subtasks).map(normalize).collect())
        }
      , Ok(_) => {
          error!("Decomposition response is not a JSON array");
          Err(Error::Parse("response is not a JSON array".to_string()))
        }
      , Err(e) => {
          warn!("Decomposition response is not JSON: {}", e);
          Ok(vec![Subtask
          {   description: format!("Task: {}", task)
            , resources: "See LLM response".to_string()
            , expected_outcome: preview(raw)
            , parsing_error: Some(format!(
                "Failed to parse LLM response as JSON: {}", e
              ))
          }])
        }
    }
}
