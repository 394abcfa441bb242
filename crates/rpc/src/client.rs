//! The calling side of a connection.

use crate::envelope::{Envelope, RemoteError, read_envelope, write_envelope};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};

type Outcome = std::result::Result<Value, RemoteError>;

struct Pending {
    name: String,
    reply: oneshot::Sender<Outcome>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Removes the pending entry when a call finishes or is abandoned.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: String,
}
impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.id);
        }
    }
}

/// A connection to the coordinator, shared by every caller in the process.
///
/// Calls are correlated by id, so any number may be in flight at once.
/// Cloning is cheap and clones share the connection.
#[derive(Clone)]
pub struct Client {
    next_id: Arc<AtomicU64>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    outgoing: mpsc::UnboundedSender<Envelope>,
}
impl Client {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await.or_raise(|| ErrorKind::Transport)?;
        Ok(Self::new(stream))
    }

    /// Start reading and writing `stream` on background tasks. Must be called
    /// inside a tokio runtime.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, mut write) = tokio::io::split(stream);
        let (outgoing, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let pending = PendingMap::default();
        let closed = Arc::new(AtomicBool::new(false));

        let (requests, writer_closed) = (Arc::clone(&pending), Arc::clone(&closed));
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if let Err(err) = write_envelope(&mut write, &envelope).await {
                    tracing::warn!(error = ?err, "Could not send request");
                    Self::close(&writer_closed, &requests);
                    break;
                }
            }
            _ = tokio::io::AsyncWriteExt::shutdown(&mut write).await;
        });

        let (responses, reader_closed) = (Arc::clone(&pending), Arc::clone(&closed));
        tokio::spawn(async move {
            let mut reader = BufReader::new(read);
            let mut line = String::new();
            loop {
                match read_envelope(&mut reader, &mut line).await {
                    Ok(Some(Envelope::Response { name, id, result, error })) => {
                        Self::resolve(&responses, name, id, result, error);
                    },
                    Ok(Some(Envelope::Request { name, .. })) => {
                        tracing::warn!(function = %name, "Workers do not serve requests; ignoring");
                    },
                    Ok(None) => break,
                    Err(err) if *err == ErrorKind::Codec => {
                        tracing::warn!(line = %line.trim_end(), "Ignoring malformed message");
                    },
                    Err(err) => {
                        tracing::warn!(error = ?err, "Connection to coordinator failed");
                        break;
                    },
                }
            }
            Self::close(&reader_closed, &responses);
        });

        Self { next_id: Arc::new(AtomicU64::new(1)), pending, closed, outgoing }
    }

    /// Dropping the reply senders wakes every waiting caller with
    /// `Disconnected`.
    fn close(closed: &AtomicBool, pending: &PendingMap) {
        closed.store(true, Ordering::SeqCst);
        if let Ok(mut pending) = pending.lock() {
            pending.clear();
        }
    }

    fn resolve(pending: &PendingMap, name: String, id: String, result: Option<Value>, error: Option<RemoteError>) {
        let Ok(mut pending) = pending.lock() else {
            return;
        };
        match pending.get(&id) {
            Some(waiting) if waiting.name != name => {
                tracing::warn!(id = %id, expected = %waiting.name, received = %name, "Response name mismatch; ignoring");
            },
            Some(_) => {
                if let Some(waiting) = pending.remove(&id) {
                    let outcome = match error {
                        Some(error) => Err(error),
                        None => Ok(result.unwrap_or(Value::Null)),
                    };
                    // The caller may have given up already.
                    _ = waiting.reply.send(outcome);
                }
            },
            None => tracing::debug!(id = %id, function = %name, "Response for an abandoned call"),
        }
    }

    /// Call `name` on the coordinator and wait at most `timeout` for the
    /// answer.
    pub async fn request(&self, name: &str, args: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (reply, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().map_err(|_| exn::Exn::from(ErrorKind::Disconnected))?;
            pending.insert(id.clone(), Pending { name: name.to_string(), reply });
        }
        let _guard = PendingGuard { pending: &self.pending, id: id.clone() };
        // Checked after registering so a concurrent close can't be missed.
        if self.closed.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Disconnected);
        }
        let request = Envelope::Request { name: name.to_string(), id, args };
        if self.outgoing.send(request).is_err() {
            exn::bail!(ErrorKind::Disconnected);
        }
        match tokio::time::timeout(timeout, rx).await {
            Err(_elapsed) => {
                tracing::warn!(function = %name, ?timeout, "Coordinator did not answer in time");
                exn::bail!(ErrorKind::Timeout(name.to_string()))
            },
            Ok(Err(_closed)) => exn::bail!(ErrorKind::Disconnected),
            Ok(Ok(Err(RemoteError { code, message }))) => exn::bail!(ErrorKind::Remote { code, message }),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}
