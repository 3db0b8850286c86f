//! Scripted collaborators shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::{ModelAdapter, ModelFactory, ModelRequest, ModelSpec, RuntimeAgent};
use crate::error::{BuildError, FallbackError, ModelError, SessionError};
use crate::fallback::{CompletionRequest, DirectCompletion};
use crate::runtime::{Event, Part};
use crate::session::{InMemorySessionService, Session, SessionKey, SessionService};

/// Model that answers every request with the same parts.
pub(crate) struct ScriptedModel {
    reply: Option<Vec<Part>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub(crate) fn replying(text: &str) -> Self {
        Self::with_parts(vec![Part::Text(text.to_string())])
    }

    pub(crate) fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            reply: Some(parts),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedModel {
    fn address(&self) -> &str {
        "scripted/test"
    }

    async fn generate(&self, request: ModelRequest) -> Result<Vec<Part>, ModelError> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone().ok_or_else(|| ModelError::Completion {
            address: "scripted/test".into(),
            reason: "connection refused".into(),
        })
    }
}

pub(crate) fn runtime_agent(model: Arc<ScriptedModel>) -> Arc<RuntimeAgent> {
    Arc::new(
        RuntimeAgent::new(
            "helper".into(),
            model,
            "A helpful assistant".into(),
            "Be brief.".into(),
        )
        .unwrap(),
    )
}

/// Factory handing out one shared [`ScriptedModel`], counting builds.
pub(crate) struct StubFactory {
    model: Option<Arc<ScriptedModel>>,
    pub(crate) builds: Arc<AtomicUsize>,
    pub(crate) specs: Arc<Mutex<Vec<ModelSpec>>>,
}

impl StubFactory {
    pub(crate) fn new(model: ScriptedModel) -> Self {
        Self::shared(Arc::new(model))
    }

    pub(crate) fn shared(model: Arc<ScriptedModel>) -> Self {
        Self {
            model: Some(model),
            builds: Arc::new(AtomicUsize::new(0)),
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            model: None,
            builds: Arc::new(AtomicUsize::new(0)),
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ModelFactory for StubFactory {
    fn create(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelAdapter>, BuildError> {
        self.specs.lock().unwrap().push(spec.clone());
        let model = self.model.clone().ok_or_else(|| BuildError::Client {
            provider: "stub".into(),
            reason: "unavailable".into(),
        })?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(model as Arc<dyn ModelAdapter>)
    }
}

/// Session service that counts retrievals and creations.
#[derive(Default)]
pub(crate) struct CountingSessions {
    pub(crate) inner: InMemorySessionService,
    gets: AtomicUsize,
    creates: AtomicUsize,
}

impl CountingSessions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionService for CountingSessions {
    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_session(key).await
    }

    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_session(key).await
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        self.inner.append_event(key, event).await
    }
}

/// Direct completion returning a fixed reply, or a 502 when failing.
pub(crate) struct StubCompletion {
    reply: Option<String>,
    pub(crate) calls: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletion {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectCompletion for StubCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, FallbackError> {
        self.calls.lock().unwrap().push(request.clone());
        self.reply.clone().ok_or_else(|| FallbackError::Http {
            url: format!("{}/api/chat", request.base_url),
            status: 502,
            body: "bad gateway".into(),
        })
    }
}
