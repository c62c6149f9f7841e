use std::env;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use log::{debug, error, info};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::parameters::{KeepAlive, TimeUnit};
use ollama_rs::models::ModelOptions;
use openai::{Credentials, chat::*};
use tokio::sync::OnceCell;

/// Strip an incidental Markdown code fence from a model reply.
pub(crate) fn strip_code_fences(s: &str) -> &str {
    let mut trimmed = s.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        trimmed = stripped;
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        trimmed = stripped;
    }
    if let Some(stripped) = trimmed.strip_suffix("```") {
        trimmed = stripped;
    }
    trimmed.trim()
}

type MockFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

enum LlmBackend {
    OpenAi {
        model: String,
        api_key: Option<String>,
    },
    Ollama {
        model: String,
    },
    Mock {
        responder: MockFn,
    },
}

/// Single-attempt request/response wrapper around a hosted text-generation
/// call. No retries, no streaming.
pub struct LlmInterface {
    backend: LlmBackend,
}

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

static OLLAMA_CLIENT: OnceCell<Arc<ollama_rs::Ollama>> = OnceCell::const_new();
const OLLAMA_DEFAULT_MODEL: &str = "llama3.2:3b";

impl LlmInterface {
    pub fn new_openai(api_key: Option<String>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());
        info!("LlmInterface::new_openai selected model={}", model);
        Self {
            backend: LlmBackend::OpenAi { model, api_key },
        }
    }

    pub fn new_ollama(model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string());
        info!("LlmInterface::new_ollama selected model={}", model);
        Self {
            backend: LlmBackend::Ollama { model },
        }
    }

    pub fn new_mock_fn(f: impl Fn(&str, &str) -> String + Send + Sync + 'static) -> Self {
        debug!("LlmInterface::new_mock_fn creating mock backend");
        Self {
            backend: LlmBackend::Mock {
                responder: Arc::new(f),
            },
        }
    }

    /// Whether a call can be attempted at all. The OpenAI backend needs an
    /// API key either injected or present in the environment.
    pub fn has_credentials(&self) -> bool {
        match &self.backend {
            LlmBackend::OpenAi { api_key, .. } => {
                api_key.is_some() || env::var(OPENAI_KEY_VAR).is_ok_and(|v| !v.is_empty())
            }
            LlmBackend::Ollama { .. } | LlmBackend::Mock { .. } => true,
        }
    }

    fn openai_credentials(api_key: &Option<String>) -> Result<Credentials> {
        let key = match api_key {
            Some(key) => key.clone(),
            None => env::var(OPENAI_KEY_VAR)
                .map_err(|_| anyhow!("{} is not set in the environment", OPENAI_KEY_VAR))?,
        };
        Ok(Credentials::new(&key, ""))
    }

    async fn get_ollama_client() -> Arc<ollama_rs::Ollama> {
        OLLAMA_CLIENT
            .get_or_init(|| async { Arc::new(ollama_rs::Ollama::default()) })
            .await
            .clone()
    }

    pub async fn call(&self, system: &str, user: &str) -> Result<String> {
        debug!(
            "LlmInterface::call invoked backend={}",
            match &self.backend {
                LlmBackend::OpenAi { model, .. } => format!("openai({})", model),
                LlmBackend::Ollama { model } => format!("ollama({})", model),
                LlmBackend::Mock { .. } => "mock".to_string(),
            }
        );

        match &self.backend {
            LlmBackend::OpenAi { model, api_key } => {
                let creds = Self::openai_credentials(api_key)?;
                let messages = vec![
                    ChatCompletionMessage {
                        role: ChatCompletionMessageRole::System,
                        content: Some(system.to_string()),
                        name: None,
                        function_call: None,
                        tool_call_id: None,
                        tool_calls: None,
                    },
                    ChatCompletionMessage {
                        role: ChatCompletionMessageRole::User,
                        content: Some(user.to_string()),
                        name: None,
                        function_call: None,
                        tool_call_id: None,
                        tool_calls: None,
                    },
                ];
                let completion = ChatCompletion::builder(model, messages)
                    .credentials(creds)
                    .temperature(0.1)
                    .create()
                    .await
                    .map_err(|e| {
                        error!("OpenAI ChatCompletion.create() failed: {}", e);
                        e
                    })?;
                let message = completion
                    .choices
                    .first()
                    .ok_or_else(|| anyhow!("OpenAI returned no choices"))?
                    .message
                    .clone();
                let content = message.content.unwrap_or_default().trim().to_string();
                debug!("OpenAI response length={}", content.len());
                Ok(content)
            }
            LlmBackend::Ollama { model } => {
                let client = Self::get_ollama_client().await;
                let options = ModelOptions::default().temperature(0.1);
                let res = client
                    .generate(
                        GenerationRequest::new(model.clone(), user.to_string())
                            .options(options)
                            .system(system.to_string())
                            .keep_alive(KeepAlive::Until {
                                time: 30,
                                unit: TimeUnit::Minutes,
                            }),
                    )
                    .await
                    .map_err(|e| {
                        error!("Ollama generate failed: {}", e);
                        e
                    })?;
                debug!("Ollama response length={}", res.response.len());
                Ok(res.response.trim().to_string())
            }
            LlmBackend::Mock { responder } => {
                let r = responder(system, user);
                debug!("Mock response length={}", r.len());
                Ok(r.trim().to_string())
            }
        }
    }
}
