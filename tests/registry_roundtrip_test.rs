//! Registry persistence across a simulated process restart

use axum::extract::{Path, State};
use axum::Json;
use room_agent_backend::api::{agents, AppCtx};
use room_agent_backend::config::{
    AutomationConfig, Config, ConferenceConfig, LicenseConfig, PersistenceConfig, ServerConfig,
};
use room_agent_backend::state::{AgentConfig, AgentStatus};
use tempfile::TempDir;

fn ctx_for(dir: &TempDir) -> AppCtx {
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
    AppCtx::new(config)
}

#[tokio::test]
async fn create_survives_restart_as_idle() {
    let dir = TempDir::new().unwrap();

    // First process: register three agents over the API.
    let ctx = ctx_for(&dir);
    let mut ids = Vec::new();
    for (name, headless) in [("alpha", true), ("beta", false), ("gamma", true)] {
        let mut config = AgentConfig::new(format!("https://meet.example.com/room/{}", name));
        config.name = name.to_string();
        config.headless = headless;
        config.scrape_on_start = name == "beta";
        let (_, Json(created)) = agents::create_agent(State(ctx.clone()), Json(config.clone()))
            .await
            .unwrap();
        ids.push((created.id, config));
    }

    // Second process: same data dir, fresh state, snapshot reload.
    let restarted = ctx_for(&dir);
    let loaded = restarted.state.write().await.load();
    assert_eq!(loaded, 3);

    let Json(listing) = agents::list_agents(State(restarted.clone())).await.unwrap();
    assert_eq!(listing.count, 3);

    for (id, config) in &ids {
        let Json(detail) = agents::get_agent(State(restarted.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(&detail.config, config);
        assert_eq!(detail.status, AgentStatus::Idle);

        // Reloaded agents have no live session.
        let screenshot =
            agents::get_agent_screenshot(State(restarted.clone()), Path(id.clone())).await;
        assert!(screenshot.is_err());
    }
}

#[tokio::test]
async fn delete_is_persisted() {
    let dir = TempDir::new().unwrap();

    let ctx = ctx_for(&dir);
    let (_, Json(first)) = agents::create_agent(
        State(ctx.clone()),
        Json(AgentConfig::new("https://meet.example.com/room/1")),
    )
    .await
    .unwrap();
    let (_, Json(second)) = agents::create_agent(
        State(ctx.clone()),
        Json(AgentConfig::new("https://meet.example.com/room/2")),
    )
    .await
    .unwrap();

    agents::delete_agent(State(ctx.clone()), Path(first.id.clone()))
        .await
        .unwrap();

    let restarted = ctx_for(&dir);
    assert_eq!(restarted.state.write().await.load(), 1);
    assert!(
        agents::get_agent(State(restarted.clone()), Path(first.id))
            .await
            .is_err()
    );
    assert!(
        agents::get_agent(State(restarted), Path(second.id))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn missing_snapshot_yields_empty_registry() {
    let dir = TempDir::new().unwrap();
    let ctx = ctx_for(&dir);
    assert_eq!(ctx.state.write().await.load(), 0);
    let Json(listing) = agents::list_agents(State(ctx)).await.unwrap();
    assert_eq!(listing.count, 0);
}
