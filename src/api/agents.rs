//! Agent management API handlers
//!
//! HTTP request handlers for agent CRUD, lifecycle, and exec operations.

use crate::agent::Agent;
use crate::api::AppCtx;
use crate::error::AppError;
use crate::state::{AgentConfig, AgentId, AgentStatus, StatusCell};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Full agent view returned by list/detail endpoints
#[derive(Debug, Serialize)]
pub struct AgentDetail {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// The agent's configuration
    pub config: AgentConfig,
    /// Current lifecycle status
    pub status: AgentStatus,
}

/// Agents list response
#[derive(Serialize)]
pub struct AgentsListResponse {
    /// All registered agents
    pub agents: Vec<AgentDetail>,
    /// Total number of agents
    pub count: usize,
}

/// One id/status pair for the status listing
#[derive(Debug, Serialize)]
pub struct StatusEntry {
    /// Agent identifier
    pub id: AgentId,
    /// Current lifecycle status
    pub status: AgentStatus,
}

/// Response for agent creation
#[derive(Serialize)]
pub struct CreateResponse {
    /// Generated identifier of the new agent
    pub id: AgentId,
}

/// Message response
#[derive(Serialize)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
    /// Status indicator (e.g., "ok")
    pub status: String,
}

/// Exec request body
#[derive(Deserialize)]
pub struct ExecRequest {
    /// Routine to run: `share_link`, `list_participants`, or `cold_start`
    pub code: String,
}

/// Clones of the per-agent handles needed by a handler, fetched under a
/// short read lock so the registry lock is never held across browser work.
async fn lookup(
    ctx: &AppCtx,
    id: &AgentId,
) -> Result<(Arc<Mutex<Agent>>, Arc<StatusCell>, AgentConfig), AppError> {
    let state = ctx.state.read().await;
    let handle = state
        .get(id)
        .ok_or_else(|| AppError::AgentNotFound(id.clone()))?;
    Ok((
        handle.agent.clone(),
        handle.status.clone(),
        handle.config.clone(),
    ))
}

/// GET /agents.list - All agents with config and status
pub async fn list_agents(State(ctx): State<AppCtx>) -> Result<Json<AgentsListResponse>, AppError> {
    let state = ctx.state.read().await;
    let agents: Vec<AgentDetail> = state
        .agents_list()
        .into_iter()
        .map(|(id, handle)| AgentDetail {
            id: id.clone(),
            config: handle.config.clone(),
            status: handle.status.get(),
        })
        .collect();

    Ok(Json(AgentsListResponse {
        count: agents.len(),
        agents,
    }))
}

/// GET /agents.status - Id/status pairs only
pub async fn agents_status(State(ctx): State<AppCtx>) -> Result<Json<Vec<StatusEntry>>, AppError> {
    let state = ctx.state.read().await;
    let entries = state
        .agents_list()
        .into_iter()
        .map(|(id, handle)| StatusEntry {
            id: id.clone(),
            status: handle.status.get(),
        })
        .collect();
    Ok(Json(entries))
}

/// POST /agent/create - Register a new idle agent
pub async fn create_agent(
    State(ctx): State<AppCtx>,
    Json(config): Json<AgentConfig>,
) -> Result<(StatusCode, Json<CreateResponse>), AppError> {
    let mut state = ctx.state.write().await;
    let id = state
        .create_agent(config)
        .map_err(AppError::InvalidAgentConfig)?;
    Ok((StatusCode::CREATED, Json(CreateResponse { id })))
}

/// GET /agent/:id - Full detail for one agent
pub async fn get_agent(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<AgentDetail>, AppError> {
    let (_, status, config) = lookup(&ctx, &id).await?;
    Ok(Json(AgentDetail {
        id,
        config,
        status: status.get(),
    }))
}

/// GET /agent/:id/status
pub async fn get_agent_status(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<StatusEntry>, AppError> {
    let (_, status, _) = lookup(&ctx, &id).await?;
    Ok(Json(StatusEntry {
        id,
        status: status.get(),
    }))
}

/// GET /agent/:id/config
pub async fn get_agent_config(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<AgentConfig>, AppError> {
    let (_, _, config) = lookup(&ctx, &id).await?;
    Ok(Json(config))
}

/// GET /agent/:id/screenshot - PNG bytes of the live page
pub async fn get_agent_screenshot(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<impl IntoResponse, AppError> {
    let (agent, status, _) = lookup(&ctx, &id).await?;
    if status.get() != AgentStatus::Running {
        return Err(AppError::NoActiveSession(id));
    }
    // The page is live at this point; a failed capture is a server fault,
    // not a state conflict.
    let bytes = agent
        .lock()
        .await
        .screenshot()
        .await
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("screenshot capture failed")))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// POST /agent/:id/start - Launch the browser and join the room
pub async fn start_agent(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<StatusEntry>, AppError> {
    let (agent, status, _) = lookup(&ctx, &id).await?;
    agent.lock().await.start().await?;
    Ok(Json(StatusEntry {
        id,
        status: status.get(),
    }))
}

/// POST /agent/:id/stop - Tear the session down (idempotent)
pub async fn stop_agent(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<StatusEntry>, AppError> {
    let (agent, status, _) = lookup(&ctx, &id).await?;
    agent.lock().await.stop().await;
    Ok(Json(StatusEntry {
        id,
        status: status.get(),
    }))
}

/// POST /agent/:id/exec - Run a named interaction routine
pub async fn exec_agent(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
    Json(request): Json<ExecRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (agent, _, _) = lookup(&ctx, &id).await?;
    match request.code.as_str() {
        "share_link" => {
            let link = agent.lock().await.click_share_link().await;
            Ok(Json(json!({ "code": "share_link", "link": link })))
        }
        "list_participants" => {
            let participants = agent.lock().await.list_participants().await;
            Ok(Json(
                json!({ "code": "list_participants", "participants": participants }),
            ))
        }
        "cold_start" => {
            // Independent smoke test; the agent's own session is untouched.
            let ok = Agent::cold_start(&ctx.config.automation).await;
            Ok(Json(json!({ "code": "cold_start", "ok": ok })))
        }
        other => Err(AppError::UnknownCommand(other.to_string())),
    }
}

/// DELETE /agent/:id - Stop (best-effort) and remove an agent
pub async fn delete_agent(
    State(ctx): State<AppCtx>,
    Path(id): Path<AgentId>,
) -> Result<Json<MessageResponse>, AppError> {
    let (agent, _, _) = lookup(&ctx, &id).await?;
    agent.lock().await.stop().await;
    ctx.state.write().await.remove_agent(&id);

    Ok(Json(MessageResponse {
        message: "Agent deleted".to_string(),
        status: "ok".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AutomationConfig, Config, ConferenceConfig, LicenseConfig, PersistenceConfig, ServerConfig,
    };
    use tempfile::TempDir;

    fn test_ctx() -> (AppCtx, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            persistence: PersistenceConfig {
                data_dir: dir.path().to_path_buf(),
            },
            automation: AutomationConfig::default(),
            conference: ConferenceConfig {
                api_url: "http://127.0.0.1:1".to_string(),
                invite_host: "meet.example.com".to_string(),
            },
            license: LicenseConfig {
                api_url: "http://127.0.0.1:1".to_string(),
                key: None,
            },
        };
        (AppCtx::new(config), dir)
    }

    fn room_config() -> AgentConfig {
        AgentConfig::new("https://meet.example.com/room/test")
    }

    #[tokio::test]
    async fn test_list_agents_empty() {
        let (ctx, _dir) = test_ctx();
        let response = list_agents(State(ctx)).await.unwrap();
        assert_eq!(response.count, 0);
        assert!(response.agents.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (ctx, _dir) = test_ctx();
        let (status, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(!created.id.is_empty());

        let response = list_agents(State(ctx)).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.agents[0].id, created.id);
        assert_eq!(response.agents[0].status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_url() {
        let (ctx, _dir) = test_ctx();
        let result = create_agent(State(ctx), Json(AgentConfig::new(""))).await;
        assert!(matches!(result, Err(AppError::InvalidAgentConfig(_))));
    }

    #[tokio::test]
    async fn test_get_agent_not_found() {
        let (ctx, _dir) = test_ctx();
        let result = get_agent(State(ctx), Path("nope".to_string())).await;
        assert!(matches!(result, Err(AppError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_exec_unknown_command() {
        let (ctx, _dir) = test_ctx();
        let (_, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();
        let result = exec_agent(
            State(ctx),
            Path(created.id),
            Json(ExecRequest {
                code: "dance".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn test_screenshot_without_session_is_conflict() {
        let (ctx, _dir) = test_ctx();
        let (_, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();
        let result = get_agent_screenshot(State(ctx.clone()), Path(created.id.clone())).await;
        assert!(matches!(result, Err(AppError::NoActiveSession(_))));

        // Still a conflict after a stop, not a server fault.
        stop_agent(State(ctx.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        let result = get_agent_screenshot(State(ctx), Path(created.id)).await;
        assert!(matches!(result, Err(AppError::NoActiveSession(_))));
    }

    #[tokio::test]
    async fn test_screenshot_capture_failure_is_internal() {
        let (ctx, _dir) = test_ctx();
        let (_, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();

        // Force the running state without a page; the capture then fails
        // and must surface as an internal error, not a conflict.
        {
            let state = ctx.state.read().await;
            let handle = state.get(&created.id).unwrap();
            handle.status.transition(AgentStatus::Starting).unwrap();
            handle.status.transition(AgentStatus::Running).unwrap();
        }
        let result = get_agent_screenshot(State(ctx), Path(created.id)).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_stop_idle_agent_is_ok_and_idempotent() {
        let (ctx, _dir) = test_ctx();
        let (_, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();

        let first = stop_agent(State(ctx.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(first.status, AgentStatus::Stopped);
        let second = stop_agent(State(ctx), Path(created.id)).await.unwrap();
        assert_eq!(second.status, AgentStatus::Stopped);
    }

    #[tokio::test]
    async fn test_delete_agent_removes_it() {
        let (ctx, _dir) = test_ctx();
        let (_, Json(created)) = create_agent(State(ctx.clone()), Json(room_config()))
            .await
            .unwrap();

        delete_agent(State(ctx.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        let result = get_agent(State(ctx), Path(created.id)).await;
        assert!(matches!(result, Err(AppError::AgentNotFound(_))));
    }
}
