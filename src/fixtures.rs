//! In-memory inventory of agents, skills and models.
//!
//! These collections stand in for the real OpenClaw inventory until
//! the dashboard is wired to it. They live for the process lifetime
//! and are mutated only through the specific operations below — there
//! is no general CRUD surface, and the registry is the sole writer.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Main,
    Service,
    Skill,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Service => "service",
            Self::Skill => "skill",
        }
    }
}

/// An OpenClaw agent and its relations to other agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub relations: Vec<String>,
}

/// An installed skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub enabled: bool,
}

/// An available LLM with its per-1k-token pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
    pub active: bool,
}

struct FixtureState {
    agents: Vec<Agent>,
    skills: Vec<Skill>,
    models: Vec<Model>,
}

/// Owner of the fixture collections. Injected into handlers through
/// the shared application state rather than living as module globals.
pub struct FixtureRegistry {
    inner: RwLock<FixtureState>,
}

impl Default for FixtureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FixtureState {
                agents: default_agents(),
                skills: default_skills(),
                models: default_models(),
            }),
        }
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.inner.read().await.agents.clone()
    }

    pub async fn list_skills(&self) -> Vec<Skill> {
        self.inner.read().await.skills.clone()
    }

    pub async fn list_models(&self) -> Vec<Model> {
        self.inner.read().await.models.clone()
    }

    /// Flip a skill's `enabled` flag. Returns the updated skill, or
    /// `None` for an unknown id.
    pub async fn toggle_skill(&self, id: &str) -> Option<Skill> {
        let mut state = self.inner.write().await;
        let skill = state.skills.iter_mut().find(|s| s.id == id)?;
        skill.enabled = !skill.enabled;
        Some(skill.clone())
    }

    /// Activate one model and deactivate every other — at most one
    /// model is active at any time. Repeated activation of the same
    /// model is idempotent. Returns the full updated collection, or
    /// `None` for an unknown id.
    pub async fn activate_model(&self, id: &str) -> Option<Vec<Model>> {
        let mut state = self.inner.write().await;
        if !state.models.iter().any(|m| m.id == id) {
            return None;
        }
        for model in &mut state.models {
            model.active = model.id == id;
        }
        Some(state.models.clone())
    }

    /// Update an agent's status. Returns the updated agent, or `None`
    /// for an unknown id.
    pub async fn set_agent_status(&self, id: &str, status: AgentStatus) -> Option<Agent> {
        let mut state = self.inner.write().await;
        let agent = state.agents.iter_mut().find(|a| a.id == id)?;
        agent.status = status;
        Some(agent.clone())
    }
}

fn agent(
    id: &str,
    name: &str,
    status: AgentStatus,
    kind: AgentKind,
    relations: &[&str],
) -> Agent {
    Agent {
        id: id.to_string(),
        name: name.to_string(),
        status,
        kind,
        relations: relations.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn default_agents() -> Vec<Agent> {
    vec![
        agent(
            "agent-1",
            "Claude Desktop",
            AgentStatus::Online,
            AgentKind::Main,
            &["agent-2", "agent-3"],
        ),
        agent(
            "agent-2",
            "Scheduler",
            AgentStatus::Online,
            AgentKind::Service,
            &["agent-1"],
        ),
        agent(
            "agent-3",
            "Email Assistant",
            AgentStatus::Offline,
            AgentKind::Skill,
            &["agent-1"],
        ),
        agent(
            "agent-4",
            "File Manager",
            AgentStatus::Online,
            AgentKind::Skill,
            &[],
        ),
        agent(
            "agent-5",
            "Web Search",
            AgentStatus::Online,
            AgentKind::Skill,
            &["agent-1"],
        ),
    ]
}

fn skill(id: &str, name: &str, description: &str, version: &str, enabled: bool) -> Skill {
    Skill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        version: version.to_string(),
        enabled,
    }
}

fn default_skills() -> Vec<Skill> {
    vec![
        skill("skill-1", "gcal", "Google Calendar integration", "1.2.0", true),
        skill(
            "skill-2",
            "gmail",
            "Gmail integration for email management",
            "2.1.0",
            true,
        ),
        skill("skill-3", "slack", "Slack workspace integration", "1.5.2", false),
        skill("skill-4", "github", "GitHub repository management", "3.0.1", true),
        skill("skill-5", "weather", "Weather forecast and alerts", "1.0.0", true),
        skill("skill-6", "stocks", "Stock market data and alerts", "2.2.0", false),
    ]
}

fn model(
    id: &str,
    name: &str,
    provider: &str,
    cost_per_1k_input: f64,
    cost_per_1k_output: f64,
    active: bool,
) -> Model {
    Model {
        id: id.to_string(),
        name: name.to_string(),
        provider: provider.to_string(),
        cost_per_1k_input,
        cost_per_1k_output,
        active,
    }
}

fn default_models() -> Vec<Model> {
    vec![
        model(
            "claude-sonnet-4-20250514",
            "Claude 4 Sonnet",
            "Anthropic",
            0.003,
            0.015,
            true,
        ),
        model(
            "claude-opus-4-20250514",
            "Claude 4 Opus",
            "Anthropic",
            0.015,
            0.075,
            false,
        ),
        model("gpt-4o", "GPT-4o", "OpenAI", 0.005, 0.015, false),
        model(
            "gemini-2.5-pro",
            "Gemini 2.5 Pro",
            "Google",
            0.00125,
            0.01,
            false,
        ),
    ]
}
