//! Chat route: which session is open and what is pre-selected.
//!
//! Routes have the shape `/chat[/<session-id>][?agentId=<id>&workflowId=<id>]`.

use crate::core::error::DomainError;
use crate::core::id::SessionId;

/// Path prefix of every chat route.
pub const CHAT_BASE_PATH: &str = "/chat";

/// Route parameters of the chat view (Value Object)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRoute {
    /// `params.id`, absent for a new session.
    pub session_id: Option<SessionId>,
    /// `query.agentId`
    pub agent_id: Option<String>,
    /// `query.workflowId`
    pub workflow_id: Option<String>,
}

impl ChatRoute {
    /// Route of a brand-new session.
    pub fn new_session() -> Self {
        Self::default()
    }

    pub fn session(id: SessionId) -> Self {
        Self {
            session_id: Some(id),
            ..Self::default()
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Same query, different session.
    pub fn with_session(&self, id: SessionId) -> Self {
        Self {
            session_id: Some(id),
            ..self.clone()
        }
    }

    pub fn is_new_session(&self) -> bool {
        self.session_id.is_none()
    }

    /// Parse a route path.
    ///
    /// Unknown query keys are ignored; empty values count as absent.
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let rest = path
            .trim_end_matches('/')
            .strip_prefix(CHAT_BASE_PATH)
            .ok_or_else(|| DomainError::InvalidRoute(path.to_string()))?;

        let session_id = match rest.strip_prefix('/') {
            Some(id) if id.contains('/') => {
                return Err(DomainError::InvalidRoute(path.to_string()));
            }
            Some(id) if !id.is_empty() => Some(SessionId::new(id)),
            Some(_) => None,
            None if rest.is_empty() => None,
            None => return Err(DomainError::InvalidRoute(path.to_string())),
        };

        let mut route = Self {
            session_id,
            ..Self::default()
        };

        for pair in query.unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if value.is_empty() {
                continue;
            }
            match key {
                "agentId" => route.agent_id = Some(value.to_string()),
                "workflowId" => route.workflow_id = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(route)
    }

    /// Render back to a path.
    pub fn to_path(&self) -> String {
        let mut path = CHAT_BASE_PATH.to_string();
        if let Some(id) = &self.session_id {
            path.push('/');
            path.push_str(id.as_str());
        }
        let mut query = Vec::new();
        if let Some(agent) = &self.agent_id {
            query.push(format!("agentId={}", agent));
        }
        if let Some(workflow) = &self.workflow_id {
            query.push(format!("workflowId={}", workflow));
        }
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }
        path
    }
}

impl std::fmt::Display for ChatRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

impl std::str::FromStr for ChatRoute {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
