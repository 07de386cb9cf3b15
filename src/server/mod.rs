//! Backend proxy: `GET /` health check and `POST /api`, which forwards the
//! conversation to Gemini and answers with the `{success, text}` contract.

mod routes;

pub use routes::{GEMINI_FAILURE, ROOT_MESSAGE, cors_layer, create_router};

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::http::HttpClient;
use crate::llm::{GeminiProvider, LlmProvider};

pub struct ServerState<P> {
    /// `None` when no API key is configured; `/api` then fails every request.
    pub provider: Option<P>,
}

pub async fn serve(config: &AppConfig, http: HttpClient, port: u16) -> Result<()> {
    let provider = match GeminiProvider::new(
        http,
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    ) {
        Ok(provider) => {
            info!(model = provider.model(), "Gemini provider ready");
            Some(provider)
        }
        Err(err) => {
            error!("Gemini provider unavailable: {err}");
            None
        }
    };

    let cors = cors_layer(config.frontend_url.as_deref())?;
    let app = create_router(Arc::new(ServerState { provider }), cors);

    let bind_addr = format!("{}:{port}", config.host);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| anyhow!("Failed to bind {bind_addr}: {err}"))?;
    info!("Backend listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Backend stopped");
    Ok(())
}

/// Serves `state` on an already bound listener until the task is dropped.
pub async fn serve_on<P>(listener: TcpListener, state: ServerState<P>) -> Result<()>
where
    P: LlmProvider + Send + Sync + 'static,
{
    let app = create_router(Arc::new(state), cors_layer(None)?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::{GEMINI_FAILURE, ROOT_MESSAGE, ServerState, cors_layer, serve_on};
    use crate::llm::{AssistantInput, AssistantOutput, LlmError, LlmProvider};
    use crate::payload::Role;
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Replies with the system instruction and the last message, or fails.
    struct StubProvider {
        fail_with: Option<LlmError>,
    }

    impl LlmProvider for StubProvider {
        async fn generate(&self, input: AssistantInput) -> Result<AssistantOutput, LlmError> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            let last = input.contents.last().expect("at least one message");
            Ok(AssistantOutput {
                text: format!(
                    "{}|{:?}|{}",
                    input.system_instruction.unwrap_or_default(),
                    last.role.unwrap_or(Role::User),
                    last.parts[0].text
                ),
            })
        }
    }

    async fn start(provider: Option<StubProvider>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(serve_on(listener, ServerState { provider }));
        addr
    }

    #[tokio::test]
    async fn root_reports_running() {
        let addr = start(None).await;
        let body: Value = reqwest::get(format!("http://{addr}/"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert_eq!(body, json!({ "message": ROOT_MESSAGE }));
    }

    #[tokio::test]
    async fn api_returns_text_from_provider() {
        let addr = start(Some(StubProvider { fail_with: None })).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api"))
            .json(&json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "write a poem"}]}
                ],
                "systemInstruction": "Be brief."
            }))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(
            body,
            json!({"success": true, "text": "Be brief.|User|write a poem"})
        );
    }

    #[tokio::test]
    async fn api_maps_provider_failure_to_500() {
        let addr = start(Some(StubProvider {
            fail_with: Some(LlmError::HttpStatus {
                status: 429,
                body: "quota".to_string(),
            }),
        }))
        .await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api"))
            .json(&json!({"contents": [{"parts": [{"text": "x"}]}]}))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!(GEMINI_FAILURE));
        assert_eq!(
            body["detail"],
            json!("provider request failed with status 429: quota")
        );
    }

    #[tokio::test]
    async fn api_without_provider_reports_missing_key() {
        let addr = start(None).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api"))
            .json(&json!({"contents": [{"parts": [{"text": "x"}]}]}))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["detail"], json!("missing GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn api_rejects_body_without_contents() {
        let addr = start(Some(StubProvider { fail_with: None })).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api"))
            .json(&json!({"systemInstruction": "x"}))
            .send()
            .await
            .expect("request");

        assert!(resp.status().is_client_error());
    }

    #[test]
    fn cors_layer_rejects_invalid_origin() {
        assert!(cors_layer(Some("http://ok.example")).is_ok());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
