//! # Handler: a callable attached to a signal.
//!
//! A [`Handler`] is one of two variants:
//! - **immediate**: `Fn(&Args) -> Result<Reply, BoxError>`, returns its value now;
//! - **deferred**: `Fn(Args) -> Future`, returns a pending value resolved at settlement.
//!
//! Either variant may be *bound* to a receiver object ([`Handler::method`],
//! [`Handler::method_async`]). A bound handler keeps only a `Weak` reference:
//! once the receiver is released, the handler is treated as absent and is
//! skipped by the executor, never reported as an error.
//!
//! ## Identity
//! Handlers are compared by [`HandlerKey`]:
//! - free handlers by the allocation of their callable (clones are equal);
//! - bound handlers by (receiver allocation, method name), so binding the same
//!   method of the same object twice yields equal handlers.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use signalvisor::{Args, Handler, Reply};
//!
//! struct Counter;
//!
//! let free = Handler::new("double", |args: &Args| {
//!     let n = args.arg(0).and_then(|v| v.as_i64()).unwrap_or(0);
//!     Ok(Reply::ready(n * 2))
//! });
//! assert_eq!(free, free.clone());
//!
//! let target = Arc::new(Counter);
//! let a = Handler::method(&target, "on_tick", |_: &Counter, _: &Args| Ok(Reply::Nothing));
//! let b = Handler::method(&target, "on_tick", |_: &Counter, _: &Args| Ok(Reply::Nothing));
//! assert_eq!(a, b);
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{core::Aggregate, core::Params, error::BoxError, events::Args};

/// Pending handler value, driven to completion at settlement.
pub type Deferred = BoxFuture<'static, Result<Value, BoxError>>;

/// Type-erased receiver of a bound handler.
pub(crate) type Receiver = dyn Any + Send + Sync;

type ImmediateFn = dyn Fn(Option<&Receiver>, &Args) -> Result<Reply, BoxError> + Send + Sync;
type DeferredFn = dyn Fn(Option<Arc<Receiver>>, Args) -> Deferred + Send + Sync;

/// Value produced by a handler (or by a hook).
pub enum Reply {
    /// A concrete value, available now.
    Ready(Value),
    /// A value that becomes available when the future completes.
    Pending(Deferred),
    /// A nested aggregate; its entries are spliced into the parent results.
    Many(Aggregate),
    /// No result at all; contributes nothing (unlike `Ready(Value::Null)`).
    Nothing,
}

impl Reply {
    /// Shorthand for [`Reply::Ready`].
    pub fn ready(value: impl Into<Value>) -> Self {
        Reply::Ready(value.into())
    }

    /// Wraps a future as [`Reply::Pending`].
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Reply::Pending(Box::pin(fut))
    }

    /// True for [`Reply::Pending`].
    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Ready(value)
    }
}

impl From<Aggregate> for Reply {
    fn from(agg: Aggregate) -> Self {
        Reply::Many(agg)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            Reply::Pending(_) => f.write_str("Pending(..)"),
            Reply::Many(agg) => f.debug_tuple("Many").field(agg).finish(),
            Reply::Nothing => f.write_str("Nothing"),
        }
    }
}

/// Identity of a handler inside a subscriber collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    /// Free handler: address of its callable.
    Function(usize),
    /// Bound handler: receiver address and method name.
    Method {
        /// Address of the receiver allocation.
        receiver: usize,
        /// Method name given at binding time.
        method: &'static str,
    },
}

#[derive(Clone)]
enum Callable {
    Immediate(Arc<ImmediateFn>),
    Deferred(Arc<DeferredFn>),
}

impl Callable {
    fn addr(&self) -> usize {
        match self {
            Callable::Immediate(f) => Arc::as_ptr(f) as *const () as usize,
            Callable::Deferred(f) => Arc::as_ptr(f) as *const () as usize,
        }
    }
}

/// A callable registered on a signal. Cheap to clone.
#[derive(Clone)]
pub struct Handler {
    label: Cow<'static, str>,
    callable: Callable,
    receiver: Option<Weak<Receiver>>,
    key: HandlerKey,
    params: Option<Arc<Params>>,
    wrapped_params: Option<Arc<Params>>,
}

impl Handler {
    fn from_callable(
        label: Cow<'static, str>,
        callable: Callable,
        receiver: Option<(Weak<Receiver>, usize, &'static str)>,
    ) -> Self {
        let (receiver, key) = match receiver {
            Some((weak, addr, method)) => (
                Some(weak),
                HandlerKey::Method {
                    receiver: addr,
                    method,
                },
            ),
            None => (None, HandlerKey::Function(callable.addr())),
        };
        Self {
            label,
            callable,
            receiver,
            key,
            params: None,
            wrapped_params: None,
        }
    }

    /// Creates an immediate handler.
    pub fn new<F>(label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Args) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        let callable = Callable::Immediate(Arc::new(move |_: Option<&Receiver>, args: &Args| f(args)));
        Self::from_callable(label.into(), callable, None)
    }

    /// Creates a deferred handler; `f` runs in order, its future at settlement.
    pub fn new_async<F, Fut>(label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        let callable = Callable::Deferred(Arc::new(move |_: Option<Arc<Receiver>>, args: Args| {
            Box::pin(f(args)) as Deferred
        }));
        Self::from_callable(label.into(), callable, None)
    }

    /// Creates an immediate handler bound (weakly) to `target`.
    pub fn method<T, F>(target: &Arc<T>, method: &'static str, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &Args) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        let callable = Callable::Immediate(Arc::new(move |recv: Option<&Receiver>, args: &Args| {
            match recv.and_then(|r| r.downcast_ref::<T>()) {
                Some(this) => f(this, args),
                None => Ok(Reply::Nothing),
            }
        }));
        Self::from_callable(Cow::Borrowed(method), callable, Some(bind_receiver(target, method)))
    }

    /// Creates a deferred handler bound (weakly) to `target`.
    ///
    /// The future owns a strong reference to the receiver while it runs.
    pub fn method_async<T, F, Fut>(target: &Arc<T>, method: &'static str, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        let callable = Callable::Deferred(Arc::new(
            move |recv: Option<Arc<Receiver>>, args: Args| -> Deferred {
                match recv.and_then(|r| r.downcast::<T>().ok()) {
                    Some(this) => Box::pin(f(this, args)),
                    None => Box::pin(async { Ok(Value::Null) }),
                }
            },
        ));
        Self::from_callable(Cow::Borrowed(method), callable, Some(bind_receiver(target, method)))
    }

    /// Creates a handler that wraps `inner`.
    ///
    /// `f` receives the inner handler and the call arguments. Unless the
    /// wrapper declares its own [`Params`], argument binding uses the inner
    /// handler's own declared list (one level only).
    pub fn wrapping<F>(inner: &Handler, label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Handler, &Args) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        let wrapped = inner.clone();
        let mut handler = Self::new(label, move |args: &Args| f(&wrapped, args));
        handler.wrapped_params = inner.params.clone();
        handler
    }

    /// Declares the parameter list used to adapt call arguments.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(Arc::new(params));
        self
    }

    /// Replaces the display label.
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Display label (free handlers) or method name (bound handlers).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Identity key.
    #[inline]
    pub fn key(&self) -> HandlerKey {
        self.key
    }

    /// True for deferred handlers.
    pub fn is_async(&self) -> bool {
        matches!(self.callable, Callable::Deferred(_))
    }

    /// True unless the handler is bound to a receiver that was released.
    pub fn is_alive(&self) -> bool {
        self.receiver
            .as_ref()
            .map_or(true, |weak| weak.strong_count() > 0)
    }

    /// Parameter list used for argument binding: own, else the wrapped handler's.
    pub fn signature(&self) -> Option<&Params> {
        self.params.as_deref().or(self.wrapped_params.as_deref())
    }

    /// Resolves the receiver; `None` if it was released.
    pub(crate) fn resolve(&self) -> Option<Live<'_>> {
        let receiver = match &self.receiver {
            Some(weak) => Some(weak.upgrade()?),
            None => None,
        };
        Some(Live {
            handler: self,
            receiver,
        })
    }

    /// Invokes the handler directly (no argument binding).
    ///
    /// A released receiver yields [`Reply::Nothing`].
    pub fn call(&self, args: &Args) -> Result<Reply, BoxError> {
        match self.resolve() {
            Some(live) => live.invoke(args),
            None => Ok(Reply::Nothing),
        }
    }
}

fn bind_receiver<T>(target: &Arc<T>, method: &'static str) -> (Weak<Receiver>, usize, &'static str)
where
    T: Send + Sync + 'static,
{
    let weak: Weak<T> = Arc::downgrade(target);
    let weak: Weak<Receiver> = weak;
    let addr = Arc::as_ptr(target) as *const () as usize;
    (weak, addr, method)
}

/// A handler whose receiver (if any) is held alive for one call.
pub(crate) struct Live<'a> {
    handler: &'a Handler,
    receiver: Option<Arc<Receiver>>,
}

impl Live<'_> {
    /// Runs the synchronous part of the handler.
    pub(crate) fn invoke(&self, args: &Args) -> Result<Reply, BoxError> {
        match &self.handler.callable {
            Callable::Immediate(f) => f(self.receiver.as_deref(), args),
            Callable::Deferred(f) => Ok(Reply::Pending(f(self.receiver.clone(), args.clone()))),
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("label", &self.label)
            .field("key", &self.key)
            .field("async", &self.is_async())
            .field("alive", &self.is_alive())
            .finish()
    }
}
