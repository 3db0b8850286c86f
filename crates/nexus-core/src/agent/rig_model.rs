//! Model adapters backed by rig provider clients.

use std::sync::Arc;

use async_trait::async_trait;
#[allow(deprecated)]
use rig::client::completion::CompletionModelHandle;
use rig::client::{CompletionClient, Nothing};
use rig::completion::{CompletionModel, CompletionRequest, Message};
use rig::message::{AssistantContent, Text, UserContent};
use rig::providers::{ollama, openai};
use rig::OneOrMany;
use tracing::debug;

use crate::agent::model::{
    openai_compatible_base, ModelAdapter, ModelFactory, ModelRequest, ModelRoute, ModelSpec,
};
use crate::error::{BuildError, ModelError};
use crate::runtime::{Content, Part, Role};

/// Creates rig completion clients for [`ModelSpec`]s.
pub struct RigModelFactory;

fn client_error(provider: &str, e: impl std::fmt::Display) -> BuildError {
    BuildError::Client {
        provider: provider.to_string(),
        reason: e.to_string(),
    }
}

impl ModelFactory for RigModelFactory {
    #[allow(deprecated)]
    fn create(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelAdapter>, BuildError> {
        let handle = match spec.route {
            ModelRoute::Ollama => {
                let mut builder = ollama::Client::builder().api_key(Nothing);
                if let Some(base) = spec.api_base.as_deref().filter(|b| !b.is_empty()) {
                    builder = builder.base_url(base);
                }
                let client: ollama::Client =
                    builder.build().map_err(|e| client_error("ollama", e))?;
                CompletionModelHandle::new(Arc::new(client.completion_model(spec.model.as_str())))
            }

            ModelRoute::OpenAiCompatible => {
                let key = spec
                    .api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| "dummy".to_string());
                let mut builder = openai::CompletionsClient::builder().api_key(&key);
                if let Some(base) = spec.api_base.as_deref().filter(|b| !b.is_empty()) {
                    let base = openai_compatible_base(base);
                    builder = builder.base_url(base.as_str());
                }
                let client: openai::CompletionsClient =
                    builder.build().map_err(|e| client_error("openai", e))?;
                CompletionModelHandle::new(Arc::new(client.completion_model(spec.model.as_str())))
            }

            ModelRoute::Raw => {
                let key = spec
                    .api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
                    .ok_or_else(|| {
                        client_error("openai", "no API key found; set OPENAI_API_KEY")
                    })?;
                let client: openai::CompletionsClient = openai::CompletionsClient::builder()
                    .api_key(&key)
                    .build()
                    .map_err(|e| client_error("openai", e))?;
                CompletionModelHandle::new(Arc::new(client.completion_model(spec.model.as_str())))
            }
        };

        debug!("Created rig model client for {}", spec.address());
        Ok(Arc::new(RigModel {
            address: spec.address(),
            handle,
        }))
    }
}

#[allow(deprecated)]
struct RigModel {
    address: String,
    handle: CompletionModelHandle<'static>,
}

fn to_rig_message(content: &Content) -> Message {
    let text = content.text();
    match content.role {
        Role::User => Message::User {
            content: OneOrMany::one(UserContent::Text(Text { text })),
        },
        Role::Model => Message::Assistant {
            id: None,
            content: OneOrMany::one(AssistantContent::Text(Text { text })),
        },
    }
}

#[async_trait]
#[allow(deprecated)]
impl ModelAdapter for RigModel {
    fn address(&self) -> &str {
        &self.address
    }

    async fn generate(&self, request: ModelRequest) -> Result<Vec<Part>, ModelError> {
        let prompt = to_rig_message(&request.message);
        let mut chat_history: Vec<Message> = request
            .history
            .iter()
            .filter(|c| !c.text().is_empty())
            .map(to_rig_message)
            .collect();
        chat_history.push(prompt.clone());

        let completion = CompletionRequest {
            preamble: Some(request.instruction),
            chat_history: OneOrMany::many(chat_history)
                .unwrap_or_else(|_| OneOrMany::one(prompt)),
            documents: Vec::new(),
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
            tool_choice: None,
            additional_params: None,
        };

        let response = self
            .handle
            .completion(completion)
            .await
            .map_err(|e| ModelError::Completion {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        let parts = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(Part::Text(t.text.clone())),
                AssistantContent::Reasoning(r) => Some(Part::Reasoning(r.reasoning.join(" "))),
                _ => None,
            })
            .collect();
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_ollama_adapter() {
        let spec = ModelSpec {
            route: ModelRoute::Ollama,
            model: "gemma3:latest".into(),
            api_base: Some("http://localhost:11434".into()),
            api_key: None,
        };
        let adapter = RigModelFactory.create(&spec).unwrap();
        assert_eq!(adapter.address(), "ollama/gemma3:latest");
    }

    #[test]
    fn creates_openai_compatible_adapter() {
        let spec = ModelSpec {
            route: ModelRoute::OpenAiCompatible,
            model: "gpt-4o-mini".into(),
            api_base: Some("http://localhost:4000".into()),
            api_key: Some("sk-test".into()),
        };
        let adapter = RigModelFactory.create(&spec).unwrap();
        assert_eq!(adapter.address(), "openai/gpt-4o-mini");
    }

    #[test]
    fn history_roles_map_to_rig_messages() {
        let user = to_rig_message(&Content::user_text("hi"));
        assert!(matches!(user, Message::User { .. }));
        let model = to_rig_message(&Content::model(vec![Part::Text("hello".into())]));
        assert!(matches!(model, Message::Assistant { .. }));
    }
}
