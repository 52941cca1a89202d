//! The deferred agent app: a blueprint now, a live engine on first use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ferry_core::{
    ConstructionError, Deferred, Envelope, InvocationContext, ResourceFactory, TransportError,
};
use ferry_toolset::protocol::RemoteTool;

use crate::blueprint::AppBlueprint;
use crate::config::HostEnv;
use crate::engine::Engine;

/// Factory for a live [`Engine`]: the blueprint plus the host environment
/// it runs under. Both halves are plain data, which is what lets an
/// unstarted app travel between hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFactory {
    /// The app being described
    pub blueprint: AppBlueprint,
    /// Host configuration captured when the app was declared
    pub env: HostEnv,
}

#[async_trait]
impl ResourceFactory for EngineFactory {
    type Resource = Engine;

    fn kind(&self) -> &'static str {
        "agent-app"
    }

    async fn build(&self) -> anyhow::Result<Engine> {
        Engine::bring_up(&self.blueprint, &self.env).await
    }
}

/// Requests an app can serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AppRequest {
    /// Describe the app
    Describe,
    /// List every tool across the app's toolsets
    ListTools,
    /// Call one tool by its prefixed name
    CallTool {
        /// Prefixed tool name, e.g. `bq_execute_sql`
        tool: String,
        /// Arguments as the tool's input schema expects them
        #[serde(default)]
        args: Value,
    },
}

/// Replies to [`AppRequest`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppResponse {
    /// The app's descriptor
    Description(AppDescriptor),
    /// Tools available across all toolsets
    Tools {
        /// Prefixed tool listings
        tools: Vec<RemoteTool>,
    },
    /// Rendered output of one tool call
    ToolOutput {
        /// Prefixed tool name that was called
        tool: String,
        /// Text rendering of the tool's reply
        text: String,
    },
}

/// The shape of a running app, as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Agent name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Model the engine resolved to
    pub model: String,
    /// Number of toolsets the engine connected
    pub toolsets: usize,
}

/// An agent app: a blueprint wrapped around a deferred engine.
///
/// Declaring an app is free and touches nothing outside the process.
/// The engine, with its connections and subprocesses, comes up on
/// [`set_up`](AgentApp::set_up) or the first [`query`](AgentApp::query),
/// whichever happens first. Until then the app can [`pack`](AgentApp::pack)
/// itself for transport and the receiving host builds its own engine.
#[derive(Debug)]
pub struct AgentApp {
    engine: Deferred<EngineFactory>,
}

impl AgentApp {
    /// Declare an app. Nothing connects yet.
    pub fn new(blueprint: AppBlueprint, env: HostEnv) -> Self {
        Self {
            engine: Deferred::new(EngineFactory { blueprint, env }),
        }
    }

    /// The blueprint this app was declared with.
    pub fn blueprint(&self) -> &AppBlueprint {
        &self.engine.factory().blueprint
    }

    /// Whether the engine is up.
    pub fn is_ready(&self) -> bool {
        self.engine.is_built()
    }

    /// The running engine, if one has been built.
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.peek()
    }

    /// Bring the engine up now.
    ///
    /// Idempotent; concurrent callers share one bring-up, and a failed
    /// one is retried by the next call.
    pub async fn set_up(&self) -> Result<(), ConstructionError> {
        self.engine.acquire().await?;
        Ok(())
    }

    /// Serve one request, bringing the engine up first if nobody has.
    pub async fn query(
        &self,
        ctx: &InvocationContext,
        request: AppRequest,
    ) -> anyhow::Result<AppResponse> {
        let engine = self.engine.acquire().await?;
        engine.dispatch(ctx, request).await
    }

    /// Pack the app for transport.
    ///
    /// Fails with [`TransportError::NonTransportableResource`] once the
    /// engine is up; live engines stay on the host that built them.
    pub fn pack(&self) -> Result<Envelope, TransportError> {
        self.engine.pack()
    }

    /// Rebuild an app from a packed envelope. The engine is not built
    /// until the app is used.
    pub fn unpack(envelope: &Envelope) -> Result<Self, TransportError> {
        Ok(Self {
            engine: Deferred::unpack(envelope)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolless_app() -> AgentApp {
        let blueprint = AppBlueprint::new("notes", "Keep notes.").with_model("pilot-1");
        AgentApp::new(blueprint, HostEnv::default())
    }

    #[tokio::test]
    async fn declaring_an_app_builds_nothing() {
        let app = toolless_app();
        assert!(!app.is_ready());
        assert!(app.engine().is_none());
        assert_eq!(app.blueprint().name, "notes");
    }

    #[tokio::test]
    async fn query_brings_the_engine_up_lazily() {
        let app = toolless_app();

        let response = app
            .query(&InvocationContext::new(), AppRequest::Describe)
            .await
            .unwrap();

        assert!(app.is_ready());
        match response {
            AppResponse::Description(descriptor) => {
                assert_eq!(descriptor.name, "notes");
                assert_eq!(descriptor.model, "pilot-1");
                assert_eq!(descriptor.toolsets, 0);
            }
            other => panic!("expected description, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn set_up_is_idempotent() {
        let app = toolless_app();
        app.set_up().await.unwrap();
        app.set_up().await.unwrap();
        assert!(app.is_ready());
    }

    #[tokio::test]
    async fn packed_app_rebuilds_on_the_other_side() {
        let app = toolless_app();
        let envelope = app.pack().unwrap();

        // What travels is the factory, not an engine.
        let restored = AgentApp::unpack(&envelope).unwrap();
        assert!(!restored.is_ready());
        assert_eq!(restored.blueprint(), app.blueprint());

        restored.set_up().await.unwrap();
        assert!(restored.is_ready());
    }

    #[tokio::test]
    async fn live_app_refuses_to_pack() {
        let app = toolless_app();
        app.set_up().await.unwrap();

        let err = app.pack().unwrap_err();
        assert!(err.is_non_transportable());

        // Still serving; a failed pack changes nothing.
        app.query(&InvocationContext::new(), AppRequest::Describe)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unpack_rejects_other_kinds() {
        let mut envelope = toolless_app().pack().unwrap();
        envelope.kind = "toolset".to_string();
        let err = AgentApp::unpack(&envelope).unwrap_err();
        assert!(err.is_kind_mismatch());
    }

    #[test]
    fn requests_serialize_tagged() {
        let request = AppRequest::CallTool {
            tool: "bq_execute_sql".to_string(),
            args: serde_json::json!({ "query": "SELECT 1" }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["op"], "call_tool");
        assert_eq!(value["tool"], "bq_execute_sql");

        let back: AppRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }
}
