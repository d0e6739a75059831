//! Interceptors and interceptor registries.
//!
//! An [`Interceptor`] is a pair of optional async handlers applied to one
//! stage of the pipeline: `on_fulfilled` receives the value produced so far,
//! `on_rejected` receives the failure produced so far. Either handler may
//! succeed (continuing on the success track) or fail (continuing on the
//! failure track), so a reject handler can recover and a fulfil handler can
//! abort.
//!
//! Interceptors are kept in an [`InterceptorManager`], an ordered registry
//! with stable ids. Ejecting an interceptor leaves a hole, so ids handed out
//! earlier never shift.
//!
//! # Example
//!
//! ```ignore
//! use interpose_client::{Client, Error, HeaderInterceptor, Interceptor, RequestConfig};
//!
//! let client = Client::new(RequestConfig::new().base_url("http://localhost:3000"))?;
//!
//! // Simple header interceptor
//! client.interceptors().request.register(HeaderInterceptor::new("x-test-header", "interceptor-works"));
//!
//! // Custom interceptor with async closures
//! let id = client.interceptors().response.register(
//!     Interceptor::new()
//!         .on_fulfilled(|response| async move {
//!             println!("{} {}", response.status, response.config.url.as_deref().unwrap_or(""));
//!             Ok(response)
//!         })
//!         .on_rejected(|err: Error| async move { Err(err) }),
//! );
//!
//! client.interceptors().response.eject(id);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use http::{HeaderName, HeaderValue};

use crate::config::RequestConfig;
use crate::error::Error;

type FulfilledFn<T> = dyn Fn(T) -> BoxFuture<'static, Result<T, Error>> + Send + Sync;
type RejectedFn<T> = dyn Fn(Error) -> BoxFuture<'static, Result<T, Error>> + Send + Sync;

// ============================================================================
// Interceptor
// ============================================================================

/// A pair of optional stage handlers.
///
/// A missing `on_fulfilled` passes the value through unchanged; a missing
/// `on_rejected` propagates the failure unchanged.
pub struct Interceptor<T> {
    on_fulfilled: Option<Arc<FulfilledFn<T>>>,
    on_rejected: Option<Arc<RejectedFn<T>>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// Create an interceptor with neither handler set.
    pub fn new() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    /// Set the handler applied on the success track.
    pub fn on_fulfilled<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(
            move |value: T| -> BoxFuture<'static, Result<T, Error>> { Box::pin(handler(value)) },
        ));
        self
    }

    /// Set the handler applied on the failure track.
    pub fn on_rejected<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(
            move |err: Error| -> BoxFuture<'static, Result<T, Error>> { Box::pin(handler(err)) },
        ));
        self
    }

    /// Set a synchronous success handler.
    pub fn map<F>(self, handler: F) -> Self
    where
        F: Fn(T) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.on_fulfilled(move |value| std::future::ready(handler(value)))
    }

    /// Set a synchronous failure handler.
    pub fn recover<F>(self, handler: F) -> Self
    where
        F: Fn(Error) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.on_rejected(move |err| std::future::ready(handler(err)))
    }

    /// Whether neither handler is set.
    pub fn is_inert(&self) -> bool {
        self.on_fulfilled.is_none() && self.on_rejected.is_none()
    }

    /// Apply this interceptor to the state produced by the previous stage.
    pub(crate) async fn apply(&self, state: Result<T, Error>) -> Result<T, Error> {
        match state {
            Ok(value) => match &self.on_fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(err) => match &self.on_rejected {
                Some(handler) => handler(err).await,
                None => Err(err),
            },
        }
    }
}

impl<T: Send + 'static> Default for Interceptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Handle returned by [`InterceptorManager::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    /// Position of the interceptor in registration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

type Slot<T> = Option<Arc<Interceptor<T>>>;

/// Ordered registry of interceptors for one pipeline stage.
///
/// Cloning a manager yields another handle to the same registry.
pub struct InterceptorManager<T> {
    slots: Arc<RwLock<Vec<Slot<T>>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append an interceptor and return its id.
    ///
    /// Ids are assigned sequentially from zero and are never reused.
    pub fn register(&self, interceptor: impl Into<Interceptor<T>>) -> InterceptorId {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let id = InterceptorId(slots.len());
        slots.push(Some(Arc::new(interceptor.into())));
        #[cfg(feature = "tracing")]
        tracing::debug!(id = id.0, "registered interceptor");
        id
    }

    /// Remove the interceptor with the given id.
    ///
    /// Returns `false` if the id is unknown or was already ejected. Other ids
    /// keep their positions.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let removed = slots
            .get_mut(id.0)
            .and_then(Option::take)
            .is_some();
        if removed {
            #[cfg(feature = "tracing")]
            tracing::debug!(id = id.0, "ejected interceptor");
        }
        removed
    }

    /// Remove every interceptor.
    ///
    /// Ids handed out earlier stay retired.
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter_mut() {
            slot.take();
        }
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.read().iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the live interceptors in registration order.
    ///
    /// The iterator reads the registry lazily, so an interceptor ejected
    /// before the iterator reaches it is skipped.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            manager: self,
            next: 0,
        }
    }

    /// Visit each live interceptor in registration order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(InterceptorId, &Interceptor<T>),
    {
        for (id, interceptor) in self.iter() {
            f(id, &interceptor);
        }
    }

    /// Live interceptors at this instant, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Interceptor<T>>> {
        self.read().iter().flatten().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Slot<T>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InterceptorManager<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InterceptorManager")
            .field("registered", &slots.len())
            .field("live", &slots.iter().filter(|slot| slot.is_some()).count())
            .finish()
    }
}

/// Iterator returned by [`InterceptorManager::iter`].
pub struct Iter<'a, T> {
    manager: &'a InterceptorManager<T>,
    next: usize,
}

impl<T: Send + 'static> Iterator for Iter<'_, T> {
    type Item = (InterceptorId, Arc<Interceptor<T>>);

    fn next(&mut self) -> Option<Self::Item> {
        let slots = self.manager.read();
        while self.next < slots.len() {
            let index = self.next;
            self.next += 1;
            if let Some(interceptor) = &slots[index] {
                return Some((InterceptorId(index), Arc::clone(interceptor)));
            }
        }
        None
    }
}

// ============================================================================
// Header Interceptor
// ============================================================================

/// A request interceptor that sets one header on every request.
///
/// # Example
///
/// ```ignore
/// use interpose_client::HeaderInterceptor;
///
/// client
///     .interceptors()
///     .request
///     .register(HeaderInterceptor::new("x-test-header", "interceptor-works"));
/// ```
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    /// Create a new header interceptor.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.parse().expect("invalid header name"),
            value: value.parse().expect("invalid header value"),
        }
    }

    /// Try to create a new header interceptor, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, Error> {
        let name = name
            .parse()
            .map_err(|_| Error::new(format!("invalid header name: {}", name)))?;
        let value = value
            .parse()
            .map_err(|_| Error::new(format!("invalid header value: {}", value)))?;
        Ok(Self { name, value })
    }

    /// Create a new header interceptor from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    fn apply(&self, mut config: RequestConfig) -> RequestConfig {
        config.headers.insert(self.name.clone(), self.value.clone());
        config
    }
}

impl From<HeaderInterceptor> for Interceptor<RequestConfig> {
    fn from(header: HeaderInterceptor) -> Self {
        Interceptor::new().map(move |config| Ok(header.apply(config)))
    }
}
