use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::debug;

use crate::agent::{ModelRequest, RuntimeAgent};
use crate::error::RuntimeError;
use crate::runtime::{Content, Event, EventKind, Part};
use crate::session::{SessionKey, SessionService};

/// Runs conversational turns of one agent against a session service.
///
/// Each turn reads the session's prior contents, records the new message,
/// asks the agent's model for a reply and records the final response, so the
/// next turn in the same session sees the whole conversation.
#[derive(Clone)]
pub struct Runner {
    agent: Arc<RuntimeAgent>,
    app_name: String,
    sessions: Arc<dyn SessionService>,
}

impl Runner {
    pub fn new(
        agent: Arc<RuntimeAgent>,
        app_name: impl Into<String>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            agent,
            app_name: app_name.into(),
            sessions,
        }
    }

    /// Run one turn for `new_message`. Events are yielded in the order they
    /// were produced; the last one is the final response. The session must
    /// already exist.
    pub fn run(
        &self,
        user_id: &str,
        session_id: &str,
        new_message: Content,
    ) -> BoxStream<'static, Result<Event, RuntimeError>> {
        let runner = self.clone();
        let key = SessionKey::new(&self.app_name, user_id, session_id);

        stream::once(async move { runner.run_turn(key, new_message).await })
            .flat_map(|result| match result {
                Ok(events) => {
                    stream::iter(events.into_iter().map(Ok::<Event, RuntimeError>)).boxed()
                }
                Err(e) => stream::iter(std::iter::once(Err(e))).boxed(),
            })
            .boxed()
    }

    async fn run_turn(
        &self,
        key: SessionKey,
        new_message: Content,
    ) -> Result<Vec<Event>, RuntimeError> {
        let session = self.sessions.get_session(&key).await?;
        let history: Vec<Content> = session
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Input | EventKind::FinalResponse))
            .filter_map(|e| e.content.clone())
            .collect();

        self.sessions
            .append_event(
                &key,
                Event::new(&key.user_id, EventKind::Input, Some(new_message.clone())),
            )
            .await?;

        debug!(
            "Runner [{}]: turn in session '{}' with {} prior contents",
            self.agent.name(),
            key.session_id,
            history.len()
        );

        let request = ModelRequest {
            instruction: self.agent.instruction().to_string(),
            history,
            message: new_message,
        };
        let parts = self.agent.model().generate(request).await?;

        let (reasoning, text): (Vec<Part>, Vec<Part>) = parts
            .into_iter()
            .partition(|p| matches!(p, Part::Reasoning(_)));

        let mut events = Vec::with_capacity(2);
        if !reasoning.is_empty() {
            events.push(Event::new(
                self.agent.name(),
                EventKind::Progress,
                Some(Content::model(reasoning)),
            ));
        }

        let content = (!text.is_empty()).then(|| Content::model(text));
        let final_event = Event::new(self.agent.name(), EventKind::FinalResponse, content);
        if final_event.content.is_some() {
            self.sessions.append_event(&key, final_event.clone()).await?;
        }
        events.push(final_event);

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::TryStreamExt;

    use crate::session::InMemorySessionService;
    use crate::testing::{runtime_agent, ScriptedModel};

    async fn collect(runner: &Runner, message: &str) -> Result<Vec<Event>, RuntimeError> {
        runner
            .run("user", "s1", Content::user_text(message))
            .try_collect()
            .await
    }

    async fn session_service(key: &SessionKey) -> Arc<InMemorySessionService> {
        let service = Arc::new(InMemorySessionService::new());
        service.create_session(key).await.unwrap();
        service
    }

    #[tokio::test]
    async fn final_event_carries_text() {
        let key = SessionKey::new("app", "user", "s1");
        let sessions = session_service(&key).await;
        let model = Arc::new(ScriptedModel::replying("hello"));
        let runner = Runner::new(runtime_agent(model), "app", sessions);

        let events = collect(&runner, "hi").await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_final_response());
        assert_eq!(events[0].author, "helper");
        assert_eq!(events[0].content.as_ref().unwrap().text(), "hello");
    }

    #[tokio::test]
    async fn reasoning_is_reported_before_final_event() {
        let key = SessionKey::new("app", "user", "s1");
        let sessions = session_service(&key).await;
        let model = Arc::new(ScriptedModel::with_parts(vec![
            Part::Reasoning("considering".into()),
            Part::Text("answer".into()),
        ]));
        let runner = Runner::new(runtime_agent(model), "app", sessions);

        let events = collect(&runner, "q").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Progress);
        assert!(events[1].is_final_response());
        assert_eq!(events[1].content.as_ref().unwrap().text(), "answer");
    }

    #[tokio::test]
    async fn empty_reply_has_final_event_without_content() {
        let key = SessionKey::new("app", "user", "s1");
        let sessions = session_service(&key).await;
        let model = Arc::new(ScriptedModel::with_parts(Vec::new()));
        let runner = Runner::new(runtime_agent(model), "app", sessions.clone());

        let events = collect(&runner, "q").await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].content.is_none());
        // Only the user input was recorded.
        assert_eq!(sessions.get_session(&key).await.unwrap().events.len(), 1);
    }

    #[tokio::test]
    async fn second_turn_sees_conversation() {
        let key = SessionKey::new("app", "user", "s1");
        let sessions = session_service(&key).await;
        let model = Arc::new(ScriptedModel::replying("hello"));
        let runner = Runner::new(runtime_agent(model.clone()), "app", sessions);

        collect(&runner, "hi").await.unwrap();
        collect(&runner, "again").await.unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].instruction, "Be brief.");
        let prior: Vec<String> = requests[1].history.iter().map(Content::text).collect();
        assert_eq!(prior, vec!["hi", "hello"]);
        assert_eq!(requests[1].message.text(), "again");
    }

    #[tokio::test]
    async fn missing_session_is_an_error() {
        let sessions = Arc::new(InMemorySessionService::new());
        let model = Arc::new(ScriptedModel::replying("hello"));
        let runner = Runner::new(runtime_agent(model), "app", sessions);

        let err = collect(&runner, "hi").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Session(_)));
    }

    #[tokio::test]
    async fn model_failure_is_an_error() {
        let key = SessionKey::new("app", "user", "s1");
        let sessions = session_service(&key).await;
        let runner = Runner::new(
            runtime_agent(Arc::new(ScriptedModel::failing())),
            "app",
            sessions,
        );

        let err = collect(&runner, "hi").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Model(_)));
    }
}
