//! The serving side: named handlers behind a listener.

use crate::envelope::{Envelope, RemoteError, read_envelope, write_envelope};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::instrument;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, std::result::Result<Value, RemoteError>> + Send + Sync>;

/// Registry of named functions, served to any number of connections.
///
/// Requests on one connection are handled concurrently; responses are written
/// in completion order and matched up by the client through their id.
#[derive(Clone, Default)]
pub struct Coordinator {
    handlers: Arc<HashMap<String, Handler>>,
}
impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    ///
    /// Arguments arrive as JSON and are decoded into `A`; a decoding failure
    /// answers with [`RemoteError::BAD_ARGUMENTS`] without calling the handler.
    pub fn register<A, R, F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, RemoteError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |args: Value| {
            let handler = Arc::clone(&handler);
            async move {
                let args: A = serde_json::from_value(args)
                    .map_err(|err| RemoteError::new(RemoteError::BAD_ARGUMENTS, err.to_string()))?;
                let result = handler(args).await?;
                serde_json::to_value(result).map_err(|err| RemoteError::new(RemoteError::INTERNAL, err.to_string()))
            }
            .boxed()
        });
        Arc::make_mut(&mut self.handlers).insert(name.into(), erased);
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler registered under `name` in this process.
    pub async fn dispatch(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError> {
        match self.handlers.get(name) {
            Some(handler) => handler(args).await,
            None => Err(RemoteError::new(RemoteError::UNKNOWN_FUNCTION, format!("no handler named '{name}'"))),
        }
    }

    /// Serve one connection until the peer closes it.
    pub async fn serve<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, mut write) = tokio::io::split(stream);
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let writer = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if let Err(err) = write_envelope(&mut write, &envelope).await {
                    tracing::warn!(error = ?err, "Could not write response; dropping connection");
                    break;
                }
            }
        });

        let mut reader = BufReader::new(read);
        let mut line = String::new();
        loop {
            let envelope = match read_envelope(&mut reader, &mut line).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(err) if *err == ErrorKind::Codec => {
                    tracing::warn!(line = %line.trim_end(), "Ignoring malformed message");
                    continue;
                },
                Err(err) => {
                    drop(tx);
                    _ = writer.await;
                    return Err(err);
                },
            };
            match envelope {
                Envelope::Request { name, id, args } => {
                    let this = self.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let outcome = this.dispatch(&name, args).await;
                        if let Err(error) = &outcome {
                            tracing::debug!(function = %name, id = %id, %error, "Handler failed");
                        }
                        // Closed when the connection is already gone.
                        _ = tx.send(Envelope::response(name, id, outcome));
                    });
                },
                Envelope::Response { id, .. } => {
                    tracing::warn!(id = %id, "Coordinator received a response; ignoring");
                },
            }
        }
        drop(tx);
        // Let in-flight handlers finish writing before the connection closes.
        writer.await.or_raise(|| ErrorKind::Transport)
    }

    /// Accept connections on a Unix socket forever, serving each on its own
    /// task. A stale socket file left by a previous run is replaced.
    #[instrument(skip_all, fields(socket = %path.as_ref().display()))]
    pub async fn listen(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            tokio::fs::remove_file(path).await.or_raise(|| ErrorKind::Transport)?;
        }
        let listener = UnixListener::bind(path).or_raise(|| ErrorKind::Transport)?;
        tracing::info!("Coordinator listening");
        loop {
            let (stream, _addr) = listener.accept().await.or_raise(|| ErrorKind::Transport)?;
            let this = self.clone();
            tokio::spawn(async move {
                tracing::debug!("Worker connected");
                if let Err(err) = this.serve(stream).await {
                    tracing::warn!(error = ?err, "Worker connection failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coordinator() -> Coordinator {
        let mut coordinator = Coordinator::new();
        coordinator.register("add", |(a, b): (i64, i64)| async move { Ok::<_, RemoteError>(a + b) });
        coordinator
    }

    #[tokio::test]
    async fn test_dispatch() {
        let coordinator = coordinator();
        assert!(coordinator.has("add"));
        assert_eq!(coordinator.dispatch("add", json!([2, 3])).await, Ok(json!(5)));
    }

    #[tokio::test]
    async fn test_dispatch_bad_arguments() {
        let err = coordinator().dispatch("add", json!("two")).await.unwrap_err();
        assert_eq!(err.code, RemoteError::BAD_ARGUMENTS);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_function() {
        let err = coordinator().dispatch("subtract", json!([2, 3])).await.unwrap_err();
        assert_eq!(err.code, RemoteError::UNKNOWN_FUNCTION);
    }
}
