//! The live side of an agent app: connected toolsets plus request dispatch.

use anyhow::Context as _;
use tracing::{debug, warn};

use ferry_core::{InvocationContext, ResourceFactory};
use ferry_toolset::Toolset;

use crate::app::{AppDescriptor, AppRequest, AppResponse};
use crate::blueprint::AppBlueprint;
use crate::config::HostEnv;

/// A running agent app.
///
/// Engines are built by [`EngineFactory`](crate::app::EngineFactory) and
/// hold live connections, so they never serialize. Packing an app that
/// already has one fails; the engine stays on the host that built it.
pub struct Engine {
    descriptor: AppDescriptor,
    toolsets: Vec<Toolset>,
}

impl Engine {
    /// Connect every toolset in the blueprint.
    ///
    /// One unreachable server fails the whole bring-up. A partially wired
    /// engine would silently answer with a subset of its tools, which is
    /// harder to notice than a failed start.
    pub(crate) async fn bring_up(blueprint: &AppBlueprint, env: &HostEnv) -> anyhow::Result<Self> {
        let model = blueprint
            .model
            .clone()
            .or_else(|| env.default_model.clone())
            .unwrap_or_else(|| "unspecified".to_string());

        let mut toolsets = Vec::with_capacity(blueprint.toolsets.len());
        for spec in &blueprint.toolsets {
            let toolset = spec
                .build()
                .await
                .with_context(|| format!("Toolset '{}' failed to connect", spec.name_prefix))?;
            toolsets.push(toolset);
        }
        debug!(app = %blueprint.name, toolsets = toolsets.len(), model = %model, "engine up");

        Ok(Self {
            descriptor: AppDescriptor {
                name: blueprint.name.clone(),
                description: blueprint.description.clone(),
                model,
                toolsets: blueprint.toolsets.len(),
            },
            toolsets,
        })
    }

    /// The app as seen from outside.
    pub fn descriptor(&self) -> &AppDescriptor {
        &self.descriptor
    }

    /// Serve one request.
    pub(crate) async fn dispatch(
        &self,
        ctx: &InvocationContext,
        request: AppRequest,
    ) -> anyhow::Result<AppResponse> {
        match request {
            AppRequest::Describe => Ok(AppResponse::Description(self.descriptor.clone())),
            AppRequest::ListTools => {
                let mut tools = Vec::new();
                for toolset in &self.toolsets {
                    match toolset.list_tools(ctx).await {
                        Ok(mut listed) => tools.append(&mut listed),
                        Err(err) => {
                            // One unreachable server should not hide the others' tools.
                            warn!(
                                prefix = %toolset.name_prefix(),
                                error = %err,
                                "toolset listing failed; continuing without it"
                            );
                        }
                    }
                }
                Ok(AppResponse::Tools { tools })
            }
            AppRequest::CallTool { tool, args } => {
                let Some(toolset) = self.toolsets.iter().find(|t| t.owns(&tool)) else {
                    return Ok(AppResponse::ToolOutput {
                        text: format!("Tool '{}' is not available", tool),
                        tool,
                    });
                };
                match toolset.call_tool(ctx, &tool, args).await {
                    Ok(text) => Ok(AppResponse::ToolOutput { tool, text }),
                    // The server answered; a refusal is an answer, not an outage.
                    Err(err) if err.is_server_error() => Ok(AppResponse::ToolOutput {
                        text: format!("Error calling tool '{}': {}", tool, err),
                        tool,
                    }),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_toolset::protocol::{RequestId, RpcRequest, RpcResponse, JSONRPC_VERSION};
    use ferry_toolset::{ToolTransport, ToolsetError};
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Replays canned responses; the request id is echoed back.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        responses: Arc<Mutex<VecDeque<RpcResponse>>>,
        seen_methods: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn push_result(&self, result: serde_json::Value) {
            self.responses.lock().unwrap().push_back(RpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: RequestId::Number(0),
                result: Some(result),
                error: None,
            });
        }

        fn methods(&self) -> Vec<String> {
            self.seen_methods.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolTransport for ScriptedTransport {
        async fn exchange(
            &self,
            request: RpcRequest,
            _headers: &HashMap<String, String>,
        ) -> Result<RpcResponse, ToolsetError> {
            self.seen_methods.lock().unwrap().push(request.method.clone());
            let mut response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ToolsetError::transport("script exhausted"))?;
            response.id = request.id;
            Ok(response)
        }
    }

    /// Always fails at the wire level.
    struct DeadTransport;

    #[async_trait]
    impl ToolTransport for DeadTransport {
        async fn exchange(
            &self,
            _request: RpcRequest,
            _headers: &HashMap<String, String>,
        ) -> Result<RpcResponse, ToolsetError> {
            Err(ToolsetError::transport("connection refused"))
        }
    }

    fn engine_with(toolsets: Vec<Toolset>) -> Engine {
        Engine {
            descriptor: AppDescriptor {
                name: "test-app".to_string(),
                description: String::new(),
                model: "pilot-1".to_string(),
                toolsets: toolsets.len(),
            },
            toolsets,
        }
    }

    fn text_result(text: &str) -> serde_json::Value {
        json!({ "content": [{ "type": "text", "text": text }] })
    }

    #[tokio::test]
    async fn call_routes_to_the_owning_toolset() {
        let bq = ScriptedTransport::default();
        bq.push_result(text_result("2 rows"));
        let mon = ScriptedTransport::default();

        let engine = engine_with(vec![
            Toolset::new("bq".to_string(), None, Box::new(bq.clone())),
            Toolset::new("mon".to_string(), None, Box::new(mon.clone())),
        ]);

        let response = engine
            .dispatch(
                &InvocationContext::new(),
                AppRequest::CallTool {
                    tool: "bq_execute_sql".to_string(),
                    args: json!({ "query": "SELECT 1" }),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            response,
            AppResponse::ToolOutput {
                tool: "bq_execute_sql".to_string(),
                text: "2 rows".to_string(),
            }
        );
        assert_eq!(bq.methods(), vec!["tools/call".to_string()]);
        assert!(mon.methods().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_answer_not_an_error() {
        let engine = engine_with(vec![]);
        let response = engine
            .dispatch(
                &InvocationContext::new(),
                AppRequest::CallTool {
                    tool: "nope_anything".to_string(),
                    args: json!({}),
                },
            )
            .await
            .unwrap();

        match response {
            AppResponse::ToolOutput { text, .. } => {
                assert_eq!(text, "Tool 'nope_anything' is not available");
            }
            other => panic!("expected tool output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_reported_failure_renders_as_text() {
        let transport = ScriptedTransport::default();
        transport.responses.lock().unwrap().push_back(RpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(0),
            result: None,
            error: Some(ferry_toolset::protocol::RpcError {
                code: -32602,
                message: "unknown table".to_string(),
                data: None,
            }),
        });

        let engine = engine_with(vec![Toolset::new(
            "bq".to_string(),
            None,
            Box::new(transport),
        )]);

        let response = engine
            .dispatch(
                &InvocationContext::new(),
                AppRequest::CallTool {
                    tool: "bq_execute_sql".to_string(),
                    args: json!({}),
                },
            )
            .await
            .unwrap();

        match response {
            AppResponse::ToolOutput { text, .. } => {
                assert!(text.starts_with("Error calling tool 'bq_execute_sql':"), "{}", text);
                assert!(text.contains("unknown table"), "{}", text);
            }
            other => panic!("expected tool output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wire_failure_during_call_propagates() {
        let engine = engine_with(vec![Toolset::new(
            "bq".to_string(),
            None,
            Box::new(DeadTransport),
        )]);

        let err = engine
            .dispatch(
                &InvocationContext::new(),
                AppRequest::CallTool {
                    tool: "bq_execute_sql".to_string(),
                    args: json!({}),
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn listing_skips_unreachable_toolsets() {
        let alive = ScriptedTransport::default();
        alive.push_result(json!({
            "tools": [{ "name": "search", "inputSchema": { "type": "object" } }]
        }));

        let engine = engine_with(vec![
            Toolset::new("dead".to_string(), None, Box::new(DeadTransport)),
            Toolset::new("docs".to_string(), None, Box::new(alive)),
        ]);

        let response = engine
            .dispatch(&InvocationContext::new(), AppRequest::ListTools)
            .await
            .unwrap();

        match response {
            AppResponse::Tools { tools } => {
                assert_eq!(tools.len(), 1);
                assert_eq!(tools[0].name, "docs_search");
            }
            other => panic!("expected tools, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn describe_reports_the_descriptor() {
        let engine = engine_with(vec![]);
        let response = engine
            .dispatch(&InvocationContext::new(), AppRequest::Describe)
            .await
            .unwrap();
        assert_eq!(response, AppResponse::Description(engine.descriptor().clone()));
    }

    #[tokio::test]
    async fn bring_up_resolves_the_model() {
        let blueprint = AppBlueprint::new("a", "b").with_model("pinned");
        let env = HostEnv::default().with_default_model("fallback");
        let engine = Engine::bring_up(&blueprint, &env).await.unwrap();
        assert_eq!(engine.descriptor().model, "pinned");

        let blueprint = AppBlueprint::new("a", "b");
        let engine = Engine::bring_up(&blueprint, &env).await.unwrap();
        assert_eq!(engine.descriptor().model, "fallback");

        let engine = Engine::bring_up(&blueprint, &HostEnv::default()).await.unwrap();
        assert_eq!(engine.descriptor().model, "unspecified");
    }
}
