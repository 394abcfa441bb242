use crate::client::Client;
use crate::envelope::RemoteError;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type LocalFn<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<R, RemoteError>> + Send + Sync>;

enum Target<A, R> {
    Local(LocalFn<A, R>),
    Remote { client: Client, timeout: Duration },
}

/// A function that lives in the coordinator, callable from anywhere.
///
/// Inside the coordinator the handle is built with [`RemoteFn::local`] and
/// calls straight through; in a worker it is built with [`RemoteFn::remote`]
/// and the call travels over the connection. Callers can't tell the two
/// apart: handler failures surface as [`ErrorKind::Remote`] either way.
pub struct RemoteFn<A, R> {
    name: String,
    target: Target<A, R>,
    _marker: PhantomData<fn(A) -> R>,
}
impl<A, R> Clone for RemoteFn<A, R> {
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Local(f) => Target::Local(Arc::clone(f)),
            Target::Remote { client, timeout } => Target::Remote { client: client.clone(), timeout: *timeout },
        };
        Self { name: self.name.clone(), target, _marker: PhantomData }
    }
}
impl<A, R> RemoteFn<A, R>
where
    A: Serialize + Send + 'static,
    R: DeserializeOwned + Send + 'static,
{
    pub fn local<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, RemoteError>> + Send + 'static,
    {
        let f: LocalFn<A, R> = Arc::new(move |args: A| f(args).boxed());
        Self { name: name.into(), target: Target::Local(f), _marker: PhantomData }
    }

    pub fn remote(name: impl Into<String>, client: Client, timeout: Duration) -> Self {
        Self { name: name.into(), target: Target::Remote { client, timeout }, _marker: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        matches!(self.target, Target::Local(_))
    }

    pub async fn call(&self, args: A) -> Result<R> {
        match &self.target {
            Target::Local(f) => f(args).await.map_err(|RemoteError { code, message }| {
                exn::Exn::from(ErrorKind::Remote { code, message })
            }),
            Target::Remote { client, timeout } => {
                let args = serde_json::to_value(args).or_raise(|| ErrorKind::Codec)?;
                let value = client.request(&self.name, args, *timeout).await?;
                serde_json::from_value(value).or_raise(|| ErrorKind::Codec)
            },
        }
    }
}
