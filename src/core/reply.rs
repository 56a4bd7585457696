//! Streaming reply adapter
//!
//! Folds backend setup and delivery into one lazy stream of non-empty text
//! fragments. The stream ends after the backend finishes or after the first
//! error, which is yielded rather than swallowed.

use std::future::Future;
use std::time::Duration;

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::providers::{ProviderError, ReplyBackend, ReplyRequest};

pub fn stream_reply<'a>(
    backend: &'a dyn ReplyBackend,
    request: ReplyRequest,
    idle_timeout: Option<Duration>,
) -> BoxStream<'a, Result<String, ProviderError>> {
    Box::pin(fragments(backend, request, idle_timeout))
}

fn fragments<'a>(
    backend: &'a dyn ReplyBackend,
    request: ReplyRequest,
    idle_timeout: Option<Duration>,
) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'a {
    try_stream! {
        let mut fragments = within(idle_timeout, backend.open(request)).await??;

        while let Some(fragment) = within(idle_timeout, fragments.next()).await? {
            let fragment = fragment?;
            if !fragment.is_empty() {
                yield fragment;
            }
        }
    }
}

/// Await `fut`, giving up after `limit` if one is set
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, ProviderError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ProviderError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::{Script, ScriptedBackend};
    use futures::TryStreamExt;

    fn request() -> ReplyRequest {
        ReplyRequest {
            history: vec![],
            new_message: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fragments_in_order_without_empties() {
        let backend = ScriptedBackend::new([Script::Reply(vec!["Hel", "", "lo, ", "world"])]);
        let fragments: Vec<String> = stream_reply(&backend, request(), None)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(fragments, vec!["Hel", "lo, ", "world"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let backend = ScriptedBackend::new([Script::FailAfter(vec!["Hel"])]);
        let items: Vec<_> = stream_reply(&backend, request(), None).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "Hel");
        assert!(matches!(items[1], Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_setup_failure_is_yielded() {
        let backend = ScriptedBackend::new([Script::RefuseToOpen]);
        let items: Vec<_> = stream_reply(&backend, request(), None).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let backend = ScriptedBackend::new([Script::Hang]);
        let limit = Duration::from_millis(20);
        let items: Vec<_> = stream_reply(&backend, request(), Some(limit)).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ProviderError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn test_empty_reply_completes() {
        let backend = ScriptedBackend::new([Script::Reply(vec![])]);
        let items: Vec<_> = stream_reply(&backend, request(), None).collect().await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_request_is_forwarded_untouched() {
        let backend = ScriptedBackend::new([Script::Reply(vec!["ok"])]);
        let _: Vec<_> = stream_reply(&backend, request(), None).collect().await;
        assert_eq!(backend.requests(), vec![request()]);
    }
}
