//! The engine host: deploys bundles as bytes and cold-starts them on use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use ferry_core::{ConstructionError, Deferred, InvocationContext, ResourceFactory, TransportError};

use crate::app::{AgentApp, AppRequest, AppResponse};
use crate::bundle::{DeployBundle, DeployManifest};
use crate::config::HostEnv;
use crate::session::{
    EventRole, InMemorySessionStore, SessionEvent, SessionId, SessionRecord, SessionStore,
};

/// Errors from host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// No engine registered under that ID
    #[error("No engine with id {0}")]
    EngineNotFound(Uuid),

    /// Bundle or app could not be encoded or decoded
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Cold start failed
    #[error(transparent)]
    ColdStart(#[from] ConstructionError),

    /// The app failed while serving the request
    #[error(transparent)]
    App(#[from] anyhow::Error),
}

/// Rebuilds a deployed app from its bundle bytes and brings it up.
///
/// Cold start *is* deferred construction. The host wraps this factory in
/// a [`Deferred`], so racing first queries share one start, and a failed
/// start is retried by the next query instead of bricking the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdStartFactory {
    bundle: Vec<u8>,
}

impl ColdStartFactory {
    /// A factory over already-encoded bundle bytes.
    pub fn new(bundle: Vec<u8>) -> Self {
        Self { bundle }
    }
}

#[async_trait]
impl ResourceFactory for ColdStartFactory {
    type Resource = AgentApp;

    fn kind(&self) -> &'static str {
        "cold-start"
    }

    async fn build(&self) -> anyhow::Result<AgentApp> {
        let bundle = DeployBundle::from_bytes(&self.bundle)?;
        let app = AgentApp::unpack(&bundle.app)?;
        app.set_up().await?;
        info!(display_name = %bundle.manifest.display_name, "cold start complete");
        Ok(app)
    }
}

/// One row in the host's engine listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSummary {
    /// Engine identifier
    pub id: Uuid,
    /// Display name from the deploy manifest
    pub display_name: String,
    /// When the bundle was deployed
    pub deployed_at: DateTime<Utc>,
    /// Whether the engine has been cold-started
    pub ready: bool,
}

struct HostedEngine {
    manifest: DeployManifest,
    deployed_at: DateTime<Utc>,
    app: Deferred<ColdStartFactory>,
    sessions: InMemorySessionStore,
}

/// An in-process stand-in for a managed agent-engine service.
///
/// `deploy` reduces the bundle to bytes and keeps only the bytes. That is
/// the honest process boundary: an app that cannot survive serialization
/// fails here, on the deploying side, instead of in a remote log later.
pub struct EngineHost {
    env: HostEnv,
    engines: RwLock<HashMap<Uuid, Arc<HostedEngine>>>,
}

impl EngineHost {
    /// A host running under the given configuration.
    pub fn new(env: HostEnv) -> Self {
        Self {
            env,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration this host runs under.
    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    /// Register a bundle and return its engine ID.
    ///
    /// Nothing starts here; the engine cold-starts on its first query or
    /// an explicit [`cold_start`](EngineHost::cold_start).
    pub async fn deploy(&self, bundle: &DeployBundle) -> Result<Uuid, HostError> {
        let bytes = bundle.to_bytes()?;
        let id = Uuid::new_v4();
        let hosted = HostedEngine {
            manifest: bundle.manifest.clone(),
            deployed_at: Utc::now(),
            app: Deferred::new(ColdStartFactory::new(bytes)),
            sessions: InMemorySessionStore::new(),
        };
        self.engines.write().await.insert(id, Arc::new(hosted));
        info!(
            engine_id = %id,
            display_name = %bundle.manifest.display_name,
            project = ?self.env.project,
            "deployed engine"
        );
        Ok(id)
    }

    async fn engine(&self, id: Uuid) -> Result<Arc<HostedEngine>, HostError> {
        self.engines
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(HostError::EngineNotFound(id))
    }

    /// Bring a deployed engine up now instead of on first query.
    pub async fn cold_start(&self, id: Uuid) -> Result<(), HostError> {
        let hosted = self.engine(id).await?;
        hosted.app.acquire().await?;
        Ok(())
    }

    /// Serve one request, cold-starting the engine first if needed.
    ///
    /// When the context carries a session ID, the exchange lands in that
    /// session's history.
    pub async fn query(
        &self,
        id: Uuid,
        ctx: &InvocationContext,
        request: AppRequest,
    ) -> Result<AppResponse, HostError> {
        let hosted = self.engine(id).await?;
        let app = hosted.app.acquire().await?;
        let response = app.query(ctx, request.clone()).await?;

        if let Some(session_id) = &ctx.session_id {
            record_exchange(
                &hosted.sessions,
                session_id,
                ctx.user_id.as_deref(),
                &request,
                &response,
            )
            .await;
        }
        Ok(response)
    }

    /// Deployed engines, oldest first.
    pub async fn list(&self) -> Vec<EngineSummary> {
        let engines = self.engines.read().await;
        let mut summaries: Vec<_> = engines
            .iter()
            .map(|(id, hosted)| EngineSummary {
                id: *id,
                display_name: hosted.manifest.display_name.clone(),
                deployed_at: hosted.deployed_at,
                ready: hosted.app.is_built(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.deployed_at);
        summaries
    }

    /// Remove an engine and everything recorded about it.
    pub async fn delete(&self, id: Uuid) -> Result<(), HostError> {
        match self.engines.write().await.remove(&id) {
            Some(_) => {
                info!(engine_id = %id, "deleted engine");
                Ok(())
            }
            None => Err(HostError::EngineNotFound(id)),
        }
    }

    /// Session IDs recorded for an engine.
    pub async fn list_sessions(&self, id: Uuid) -> Result<Vec<SessionId>, HostError> {
        let hosted = self.engine(id).await?;
        Ok(hosted.sessions.list_sessions().await?)
    }

    /// One session's history.
    pub async fn session_history(
        &self,
        id: Uuid,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, HostError> {
        let hosted = self.engine(id).await?;
        Ok(hosted.sessions.session(session_id).await?)
    }

    /// Every session of an engine, as export-friendly JSON.
    pub async fn export_history(&self, id: Uuid) -> Result<Value, HostError> {
        let hosted = self.engine(id).await?;
        let mut out = Vec::new();
        for session_id in hosted.sessions.list_sessions().await? {
            let Some(record) = hosted.sessions.session(&session_id).await? else {
                continue;
            };
            out.push(serde_json::json!({
                "engine_id": id,
                "session_id": record.session_id,
                "user_id": record.user_id,
                "create_time": record.created_at.to_rfc3339(),
                "history": record
                    .events
                    .iter()
                    .map(|event| {
                        serde_json::json!({
                            "role": event.role,
                            "text": event.text,
                            "time": event.at.to_rfc3339(),
                        })
                    })
                    .collect::<Vec<_>>(),
            }));
        }
        Ok(Value::Array(out))
    }
}

impl std::fmt::Debug for EngineHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHost").field("env", &self.env).finish()
    }
}

/// Record one request/response pair. Recording failures are logged, never
/// surfaced; history is best effort and must not fail the query.
async fn record_exchange(
    store: &InMemorySessionStore,
    session_id: &SessionId,
    user_id: Option<&str>,
    request: &AppRequest,
    response: &AppResponse,
) {
    let request_text = match request {
        AppRequest::Describe => "describe".to_string(),
        AppRequest::ListTools => "list tools".to_string(),
        AppRequest::CallTool { tool, .. } => format!("call {}", tool),
    };
    let reply = match response {
        AppResponse::Description(descriptor) => {
            SessionEvent::now(EventRole::Agent, descriptor.name.clone())
        }
        AppResponse::Tools { tools } => {
            SessionEvent::now(EventRole::Agent, format!("{} tools available", tools.len()))
        }
        AppResponse::ToolOutput { text, .. } => SessionEvent::now(EventRole::Tool, text.clone()),
    };

    let user_event = SessionEvent::now(EventRole::User, request_text);
    for event in [user_event, reply] {
        if let Err(err) = store.append_event(session_id, user_id, event).await {
            warn!(session_id = %session_id, error = %err, "failed to record session event");
        }
    }
}
