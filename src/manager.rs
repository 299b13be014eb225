//! Registry of agents and sequential coordination over them

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use indexmap::IndexMap;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::gateway::Gateway;

/// One task handed to [`AgentManager::coordinate_agents`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec
{   #[serde(default)]
    pub agent: Option<String>
  , #[serde(default)]
    pub task: Option<String>
  , #[serde(default)]
    pub context: Option<serde_json::Value>
}

impl TaskSpec
{   pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self
    {   TaskSpec
        {   agent: Some(agent.into())
          , task: Some(task.into())
          , context: None
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self
    {   self.context = Some(context);
        self
    }
}

/// One step handed to [`AgentManager::run_workflow`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep
{   #[serde(default)]
    pub name: Option<String>
  , #[serde(default)]
    pub agent: Option<String>
  , #[serde(default)]
    pub task: Option<String>
  , #[serde(default)]
    pub context: Option<serde_json::Value>
}

impl WorkflowStep
{   pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self
    {   WorkflowStep
        {   agent: Some(agent.into())
          , task: Some(task.into())
          , ..WorkflowStep::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self
    {   self.name = Some(name.into());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self
    {   self.context = Some(context);
        self
    }
}

/// Outcome of one workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult
{   pub agent: String
  , pub task: String
  , pub result: String
}

/// Both fields present and non-blank, else the entry is skipped
fn runnable<'a>(
  agent: &'a Option<String>
, task: &'a Option<String>
) -> Option<(&'a str, &'a str)>
{   match (agent.as_deref(), task.as_deref())
    {   (Some(agent), Some(task))
          if !agent.trim().is_empty() && !task.trim().is_empty() => {
          Some((agent, task))
        }
      , _ => None
    }
}

/// Registry of agents sharing a default gateway.
///
/// The registry sits behind a lock, but the coordination methods run their
/// tasks one after another in list order. A failing task aborts the rest.
pub struct AgentManager
{   gateway: Arc<Gateway>
  , agents: RwLock<IndexMap<String, Arc<Agent>>>
}

impl std::fmt::Debug for AgentManager
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("AgentManager")
          .field("agents", &self.list_agents())
          .finish_non_exhaustive()
    }
}

impl AgentManager
{   pub fn new(gateway: Arc<Gateway>) -> Self
    {   info!("AgentManager initialized");
        AgentManager
        {   gateway
          , agents: RwLock::new(IndexMap::new())
        }
    }

    /// Build a manager and register a roster on the default gateway
    pub fn from_configs(
      gateway: Arc<Gateway>
    , configs: &[AgentConfig]
    ) -> Result<Self>
    {   let manager = AgentManager::new(gateway);
        for config in configs
        {   let agent = Agent::from_config(config, manager.gateway.clone())?;
            manager.register(Arc::new(agent));
        }
        Ok(manager)
    }

    pub fn gateway(&self) -> &Arc<Gateway>
    {   &self.gateway
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<Agent>>>
    {   self.agents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<Agent>>>
    {   self.agents.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, agent: Arc<Agent>)
    {   let name = agent.name().to_string();
        if self.write().insert(name.clone(), agent).is_some()
        {   debug!("Replaced existing agent '{}'", name);
        }
    }

    /// Create and register an agent, replacing any with the same name.
    /// Without an explicit gateway the manager's default is used.
    pub fn add_agent(
      &self
    , name: &str
    , role: &str
    , instructions: &str
    , gateway: Option<Arc<Gateway>>
    ) -> Result<Arc<Agent>>
    {   let gateway = gateway.unwrap_or_else(|| self.gateway.clone());
        let agent = Arc::new(Agent::new(name, role, instructions, gateway)?);
        self.register(agent.clone());
        info!("Added agent '{}' with role '{}'", agent.name(), role);
        Ok(agent)
    }

    pub fn get_agent(&self, name: &str) -> Option<Arc<Agent>>
    {   self.read().get(name).cloned()
    }

    pub fn remove_agent(&self, name: &str) -> Option<Arc<Agent>>
    {   let removed = self.write().shift_remove(name);
        if removed.is_some()
        {   info!("Removed agent '{}'", name);
        }
        removed
    }

    /// Names in registration order
    pub fn list_agents(&self) -> Vec<String>
    {   self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize
    {   self.read().len()
    }

    pub fn is_empty(&self) -> bool
    {   self.read().is_empty()
    }

    /// Run a task on a named agent
    pub async fn assign_task(
      &self
    , agent_name: &str
    , task: &str
    , context: Option<&serde_json::Value>
    ) -> Result<String>
    {   if agent_name.trim().is_empty()
        {   return Err(Error::Validation(
              "agent name must be a non-empty string".to_string()
            ));
        }
        if task.trim().is_empty()
        {   return Err(Error::Validation(
              "task must be a non-empty string".to_string()
            ));
        }

        // Clone out of the registry so no lock is held across the call
        let agent = self.get_agent(agent_name).ok_or_else(|| {
          error!("Agent '{}' not found", agent_name);
          Error::AgentNotFound(agent_name.to_string())
        })?;

        agent.execute_task(task, context).await.map_err(|e| {
          e.context(format!(
            "failed to assign task '{}' to agent '{}'", task, agent_name
          ))
        })
    }

    /// Run tasks in order, keyed by task text.
    ///
    /// Duplicate task strings overwrite earlier results.
    pub async fn coordinate_agents(
      &self
    , tasks: &[TaskSpec]
    ) -> Result<IndexMap<String, String>>
    {   debug!("Coordinating {} tasks", tasks.len());
        let mut results: IndexMap<String, String> = IndexMap::new();
        for spec in tasks
        {   let Some((agent, task)) = runnable(&spec.agent, &spec.task)
            else
            {   debug!("Skipping task entry without agent or task");
                continue;
            };
            let result = self
              .assign_task(agent, task, spec.context.as_ref())
              .await?;
            results.insert(task.to_string(), result);
        }
        Ok(results)
    }

    /// One-shot prompt on the default gateway asking the model to play
    /// the named agents together. The agents themselves are not called.
    pub async fn collaborative_task(
      &self
    , task: &str
    , agent_names: &[&str]
    , context: Option<&serde_json::Value>
    ) -> Result<String>
    {   if task.trim().is_empty()
        {   return Err(Error::Validation(
              "task must be a non-empty string".to_string()
            ));
        }
        let context = crate::agent::render_context(context);
        let prompt = format!(
"You are coordinating a group of agents to solve a task.

Task: {task}

Agents involved: {agents}

Context: {context}

Please provide a coordinated response that synthesizes input from all agents.",
          task = task,
          agents = agent_names.join(", "),
          context = context
        );
        debug!("Collaborative task across {} agents", agent_names.len());
        self.gateway.request(&prompt).await
          .map_err(|e| e.context(format!("collaborative task '{}'", task)))
    }

    /// Run workflow steps in order, keyed by step name.
    /// Unnamed steps are called `step_<results so far>`.
    pub async fn run_workflow(
      &self
    , steps: &[WorkflowStep]
    ) -> Result<IndexMap<String, StepResult>>
    {   debug!("Running workflow of {} steps", steps.len());
        let mut results: IndexMap<String, StepResult> = IndexMap::new();
        for step in steps
        {   let step_name = step.name
              .clone()
              .unwrap_or_else(|| format!("step_{}", results.len()));
            let Some((agent, task)) = runnable(&step.agent, &step.task)
            else
            {   debug!("Skipping workflow step '{}'", step_name);
                continue;
            };
            let result = self
              .assign_task(agent, task, step.context.as_ref())
              .await?;
            results.insert(step_name, StepResult
            {   agent: agent.to_string()
              , task: task.to_string()
              , result
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn manager() -> AgentManager
    {   AgentManager::new(Arc::new(
          Gateway::new("localhost", "11434", "llama3", 0.7).unwrap()
        ))
    }

    #[test]
    fn registry_keeps_insertion_order()
    {   let manager = manager();
        manager.add_agent("Researcher", "researcher", "", None).unwrap();
        manager.add_agent("Writer", "writer", "", None).unwrap();
        manager.add_agent("Critic", "critic", "", None).unwrap();
        assert_eq!(manager.list_agents(), vec!["Researcher", "Writer", "Critic"]);

        manager.add_agent("Writer", "editor", "", None).unwrap();
        assert_eq!(manager.list_agents(), vec!["Researcher", "Writer", "Critic"]);
        assert_eq!(manager.get_agent("Writer").unwrap().role(), "editor");

        assert!(manager.remove_agent("Researcher").is_some());
        assert!(manager.remove_agent("Researcher").is_none());
        assert_eq!(manager.list_agents(), vec!["Writer", "Critic"]);
        assert!(manager.get_agent("Nobody").is_none());
    }

    #[test]
    fn agents_may_use_their_own_gateway()
    {   let manager = manager();
        let other = Arc::new(
          Gateway::new("localhost", "11500", "mistral", 0.2).unwrap()
        );
        let agent = manager
          .add_agent("Coder", "coder", "", Some(other.clone()))
          .unwrap();
        assert!(Arc::ptr_eq(agent.gateway(), &other));
        let default = manager.add_agent("Writer", "writer", "", None).unwrap();
        assert!(Arc::ptr_eq(default.gateway(), manager.gateway()));
    }

    #[test]
    fn invalid_names_rejected()
    {   let manager = manager();
        assert!(matches!(
          manager.add_agent(" ", "r", "i", None),
          Err(Error::Validation(_))
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn unknown_agent_is_not_found()
    {   let manager = manager();
        let err = tokio_test::block_on(
          manager.assign_task("Ghost", "Haunt", None)
        ).unwrap_err();
        assert_eq!(err, Error::AgentNotFound("Ghost".to_string()));
    }

    #[test]
    fn skipped_entries_do_not_touch_the_network()
    {   let manager = manager();
        let tasks = vec![
          TaskSpec::default()
        , TaskSpec { agent: Some("A".into()), ..TaskSpec::default() }
        , TaskSpec { task: Some("t".into()), ..TaskSpec::default() }
        , TaskSpec::new("", "t")
        ];
        let results = tokio_test::block_on(manager.coordinate_agents(&tasks))
          .unwrap();
        assert!(results.is_empty());

        let steps = vec![WorkflowStep::default().named("nothing")];
        let results = tokio_test::block_on(manager.run_workflow(&steps))
          .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn roster_from_json()
    {   let configs: Vec<AgentConfig> = serde_json::from_str(r#"[
          {"name": "Researcher", "role": "researcher", "max_history": 10},
          {"name": "Writer", "role": "writer"}
        ]"#).unwrap();
        let manager = AgentManager::from_configs(
          Arc::new(Gateway::new("localhost", "11434", "llama3", 0.7).unwrap()),
          &configs
        ).unwrap();
        assert_eq!(manager.len(), 2);
        assert_eq!(
          manager.get_agent("Researcher").unwrap().max_history_entries(),
          10
        );
    }
}
