//! HTTP implementation of [`AssistantApi`] against the OpenAI Assistants v2 API.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use ieum_core::config::LlmConfig;

use crate::api::{AssistantApi, MessageAck, MessageRole, RunEvent, RunEventStream, Voice};
use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TTS_MODEL: &str = "tts-1";

pub struct OpenAiAssistantClient {
    client: Client,
    api_key: String,
    base_url: String,
    tts_model: String,
}

#[derive(Deserialize)]
struct ThreadResponse {
    id: String,
}

impl OpenAiAssistantClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
        }
    }

    /// Build a client from the `[llm]` config section.
    ///
    /// Fails when no API key is configured or present in the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            LlmError::Config(format!(
                "no API key configured; set llm.api_key or {}",
                config.api_key_env
            ))
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        info!(base_url = %config.base_url, "Assistants API client configured");

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tts_model: config.tts_model.clone(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, LlmError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_message(
        &self,
        thread: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageAck, LlmError> {
        debug!(thread, "Creating thread message");
        let response = self
            .send(
                self.post(&format!("/threads/{}/messages", thread))
                    .json(&json!({ "role": role, "content": content })),
            )
            .await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn start_run(
        &self,
        thread: &str,
        assistant_id: &str,
    ) -> Result<RunEventStream, LlmError> {
        debug!(thread, assistant_id, "Starting streaming run");
        let response = self
            .send(
                self.post(&format!("/threads/{}/runs", thread))
                    .header("Accept", "text/event-stream")
                    .json(&json!({ "assistant_id": assistant_id, "stream": true })),
            )
            .await?;

        let stream = response.bytes_stream().eventsource().map(|event| {
            let event = event.map_err(|e| LlmError::Network(e.to_string()))?;
            Ok(RunEvent::new(event.event, event.data))
        });
        Ok(Box::pin(stream))
    }

    async fn create_thread(&self) -> Result<String, LlmError> {
        let response = self.send(self.post("/threads").json(&json!({}))).await?;
        let body = response.text().await?;
        let thread: ThreadResponse = serde_json::from_str(&body)?;
        info!(thread = %thread.id, "Created assistant thread");
        Ok(thread.id)
    }

    async fn text_to_speech(&self, voice: Voice, text: &str) -> Result<Vec<u8>, LlmError> {
        debug!(voice = voice.as_str(), chars = text.chars().count(), "Requesting speech");
        let response = self
            .send(self.post("/audio/speech").json(&json!({
                "model": self.tts_model,
                "input": text,
                "voice": voice,
            })))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> OpenAiAssistantClient {
        OpenAiAssistantClient::new("sk-test").with_base_url(server.uri())
    }

    #[test]
    fn test_new_defaults() {
        let client = OpenAiAssistantClient::new("sk-test");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.tts_model, "tts-1");
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = OpenAiAssistantClient::new("k").with_base_url("http://localhost:9/v1/");
        assert_eq!(client.base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LlmConfig {
            api_key: String::new(),
            api_key_env: "IEUM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = OpenAiAssistantClient::from_config(&config).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[tokio::test]
    async fn test_create_message_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(header("OpenAI-Beta", "assistants=v2"))
            .and(body_json(json!({ "role": "user", "content": "안녕하세요" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "msg_1", "thread_id": "thread_1", "object": "thread.message" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ack = client_for(&server)
            .await
            .create_message("thread_1", MessageRole::User, "안녕하세요")
            .await
            .unwrap();
        assert_eq!(ack.id, "msg_1");
        assert_eq!(ack.thread_id, "thread_1");
    }

    #[tokio::test]
    async fn test_create_thread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "thread_new" })))
            .mount(&server)
            .await;

        let handle = client_for(&server).await.create_thread().await.unwrap();
        assert_eq!(handle, "thread_new");
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.create_thread().await.unwrap_err();
        assert_eq!(
            err,
            LlmError::Http {
                status: 503,
                body: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_json_maps_to_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.create_thread().await.unwrap_err();
        assert!(matches!(err, LlmError::Format(_)));
    }

    #[tokio::test]
    async fn test_start_run_yields_named_events() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "event: thread.run.created\n",
            "data: {\"id\":\"run_1\"}\n",
            "\n",
            "event: thread.message.delta\n",
            "data: {\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"안녕\"}}]}}\n",
            "\n",
            "event: done\n",
            "data: [DONE]\n",
            "\n",
        );
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .and(body_json(json!({ "assistant_id": "asst_1", "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let mut stream = match client_for(&server).await.start_run("thread_1", "asst_1").await {
            Ok(stream) => stream,
            Err(e) => panic!("run rejected: {e}"),
        };

        let mut names = Vec::new();
        while let Some(event) = stream.next().await {
            names.push(event.unwrap().name);
        }
        assert_eq!(
            names,
            vec!["thread.run.created", "thread.message.delta", "done"]
        );
    }

    #[tokio::test]
    async fn test_start_run_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = client_for(&server).await.start_run("thread_1", "asst_1").await;
        assert!(matches!(result, Err(LlmError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_text_to_speech_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_json(json!({ "model": "tts-1", "input": "반가워요", "voice": "nova" })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x49, 0x44, 0x33]))
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .await
            .text_to_speech(Voice::Nova, "반가워요")
            .await
            .unwrap();
        assert_eq!(audio, vec![0x49, 0x44, 0x33]);
    }
}
