//! # Handler declarations of a class descriptor.
//!
//! A [`HandlerDecl`] is one row of a class registration table:
//! (member name, signal name, ordering directive, method body). It is bound to
//! a concrete receiver when an instance is attached.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::Params,
    error::BoxError,
    events::Args,
    handlers::{Handler, Reply},
};

/// Pinning of a declared handler within its signal's class handlers.
///
/// Ordered: `First < Normal < Last`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directive {
    /// Runs before every non-pinned handler, whatever its class level.
    First,
    /// Ordered by class level, then member name.
    #[default]
    Normal,
    /// Runs after every non-pinned handler, whatever its class level.
    Last,
}

type BindFn<T> = dyn Fn(&Arc<T>) -> Handler + Send + Sync;

/// Declaration of a method handling one signal.
pub struct HandlerDecl<T> {
    signal: String,
    member: &'static str,
    directive: Directive,
    checked: bool,
    params: Option<Params>,
    bind: Arc<BindFn<T>>,
}

impl<T> HandlerDecl<T>
where
    T: Send + Sync + 'static,
{
    /// Declares an immediate method `member` handling `signal`.
    pub fn new<F>(signal: impl Into<String>, member: &'static str, f: F) -> Self
    where
        F: Fn(&T, &Args) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::from_bind(signal.into(), member, move |target: &Arc<T>| {
            let f = Arc::clone(&f);
            Handler::method(target, member, move |this: &T, args: &Args| f(this, args))
        })
    }

    /// Declares a deferred method `member` handling `signal`.
    pub fn new_async<F, Fut>(signal: impl Into<String>, member: &'static str, f: F) -> Self
    where
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::from_bind(signal.into(), member, move |target: &Arc<T>| {
            let f = Arc::clone(&f);
            Handler::method_async(target, member, move |this: Arc<T>, args: Args| f(this, args))
        })
    }

    fn from_bind<B>(signal: String, member: &'static str, bind: B) -> Self
    where
        B: Fn(&Arc<T>) -> Handler + Send + Sync + 'static,
    {
        Self {
            signal,
            member,
            directive: Directive::Normal,
            checked: true,
            params: None,
            bind: Arc::new(bind),
        }
    }

    /// Pins the handler first.
    pub fn first(mut self) -> Self {
        self.directive = Directive::First;
        self
    }

    /// Pins the handler last.
    pub fn last(mut self) -> Self {
        self.directive = Directive::Last;
        self
    }

    /// Skips the "signal exists" check at build time.
    pub fn unchecked(mut self) -> Self {
        self.checked = false;
        self
    }

    /// Declares the parameter list the call arguments are adapted to.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Binds the declaration to `target` (weakly).
    pub(crate) fn bind(&self, target: &Arc<T>) -> Handler {
        let handler = (self.bind)(target);
        match &self.params {
            Some(params) => handler.with_params(params.clone()),
            None => handler,
        }
    }
}

impl<T> HandlerDecl<T> {
    /// Name of the handled signal.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Member (method) name.
    pub fn member(&self) -> &'static str {
        self.member
    }

    /// Pinning directive.
    pub fn directive(&self) -> Directive {
        self.directive
    }

    /// True unless declared [`unchecked`](Self::unchecked).
    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

impl<T> fmt::Debug for HandlerDecl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDecl")
            .field("signal", &self.signal)
            .field("member", &self.member)
            .field("directive", &self.directive)
            .field("checked", &self.checked)
            .finish()
    }
}
