//! In-process backend for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use super::{FragmentStream, ProviderError, ReplyBackend, ReplyRequest};

/// What the backend does for one call
pub enum Script {
    /// Deliver these fragments, then finish
    Reply(Vec<&'static str>),
    /// Deliver these fragments, then fail
    FailAfter(Vec<&'static str>),
    /// Fail before delivering anything
    RefuseToOpen,
    /// Accept the request and never deliver
    Hang,
}

/// Plays one [`Script`] per call and records every request it receives
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn fragments(parts: &[&'static str]) -> Vec<Result<String, ProviderError>> {
    parts.iter().map(|p| Ok(p.to_string())).collect()
}

#[async_trait]
impl ReplyBackend for ScriptedBackend {
    async fn open(&self, request: ReplyRequest) -> Result<FragmentStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::RefuseToOpen);

        match script {
            Script::Reply(parts) => Ok(Box::pin(stream::iter(fragments(&parts)))),
            Script::FailAfter(parts) => {
                let mut items = fragments(&parts);
                items.push(Err(ProviderError::InvalidResponse("connection reset".into())));
                items.push(Ok("never delivered".to_string()));
                Ok(Box::pin(stream::iter(items)))
            }
            Script::RefuseToOpen => Err(ProviderError::NotConfigured("scripted refusal".into())),
            Script::Hang => Ok(Box::pin(stream::pending::<Result<String, ProviderError>>())),
        }
    }
}
