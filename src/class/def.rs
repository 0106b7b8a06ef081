//! # ClassDef: registration table of a class hierarchy.
//!
//! A [`ClassDef`] describes which signals a class carries and which of its
//! methods handle them. It is built once with [`ClassBuilder`]; the ordering
//! of class handlers is resolved at build time and cached.
//!
//! ## Levels
//! The root class is level 0, each `extends` adds one. A handler's level is the
//! level where its member name first appears; a derived class redeclaring the
//! member replaces the body (most-derived wins) but keeps that level.
//!
//! ## Sort key (per signal)
//! ```text
//! (directive, level, member)
//!     │         │       └─ alphabetical tie-break
//!     │         └─ BottomUp: level; TopDown: levels_count - 1 - level
//!     └─ First < Normal < Last
//! ```
//!
//! ## Example
//! ```rust
//! use signalvisor::{Args, ClassDef, Reply, Signal};
//!
//! struct Button;
//!
//! let base = ClassDef::<Button>::builder("Base")
//!     .signal("click", Signal::new())
//!     .handler("click", "z", |_: &Button, _: &Args| Ok(Reply::ready("z")))
//!     .build()
//!     .unwrap();
//! let derived = ClassDef::builder("Derived")
//!     .extends(&base)
//!     .handler("click", "a", |_: &Button, _: &Args| Ok(Reply::ready("a")))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(derived.handlers_for("click"), vec!["z", "a"]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{
    decl::{Directive, HandlerDecl},
    instance::Instance,
};
use crate::{
    error::{BoxError, SignalError},
    events::Args,
    handlers::Reply,
    signal::{ExternalSignaller, InstanceId, Signal},
};

/// A resolved handler declaration: the level where its member first appeared.
struct Member<T> {
    level: usize,
    decl: Arc<HandlerDecl<T>>,
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            decl: Arc::clone(&self.decl),
        }
    }
}

/// Summary of a class handed to [`ExternalSignaller::register_class`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    name: String,
    signals: Vec<String>,
    handlers: BTreeMap<String, Vec<&'static str>>,
}

impl ClassInfo {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal names visible in the class (own and inherited), sorted.
    pub fn signals(&self) -> &[String] {
        &self.signals
    }

    /// Ordered handler members of `signal`.
    pub fn handlers_for(&self, signal: &str) -> &[&'static str] {
        self.handlers.get(signal).map_or(&[][..], Vec::as_slice)
    }

    /// Total number of declared handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

/// Registration table of one class.
pub struct ClassDef<T> {
    name: String,
    parent: Option<Arc<ClassDef<T>>>,
    level: usize,
    external: Option<Arc<dyn ExternalSignaller>>,
    signals: BTreeMap<String, Signal>,
    members: BTreeMap<&'static str, Member<T>>,
    sorted: HashMap<String, Vec<Arc<HandlerDecl<T>>>>,
    info: ClassInfo,
}

impl<T> ClassDef<T>
where
    T: Send + Sync + 'static,
{
    /// Starts the declaration of class `name`.
    pub fn builder(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name)
    }

    /// Binds the class handlers to `target` and allocates its instance partition.
    ///
    /// Handlers hold `target` weakly; the returned [`Instance`] detaches the
    /// partition from every signal of the class when dropped.
    pub fn attach(self: &Arc<Self>, target: &Arc<T>) -> Instance<T> {
        let bound = self
            .sorted
            .iter()
            .map(|(signal, decls)| {
                let handlers = decls.iter().map(|d| d.bind(target)).collect();
                (signal.clone(), handlers)
            })
            .collect();
        Instance::new(InstanceId::next(), Arc::clone(self), bound)
    }
}

impl<T> ClassDef<T> {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, if any.
    pub fn parent(&self) -> Option<&Arc<ClassDef<T>>> {
        self.parent.as_ref()
    }

    /// Depth in the hierarchy (root = 0).
    pub fn level(&self) -> usize {
        self.level
    }

    /// External signaller of the class (own or inherited).
    pub fn external(&self) -> Option<&Arc<dyn ExternalSignaller>> {
        self.external.as_ref()
    }

    /// Signal `name`, own or inherited.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    /// Every signal of the class, by name.
    pub fn signals(&self) -> impl Iterator<Item = (&str, &Signal)> {
        self.signals.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Ordered handler members of `signal`.
    pub fn handlers_for(&self, signal: &str) -> Vec<&'static str> {
        self.info.handlers_for(signal).to_vec()
    }

    /// Summary passed to the external signaller.
    pub fn info(&self) -> &ClassInfo {
        &self.info
    }

    pub(crate) fn signal_map(&self) -> &BTreeMap<String, Signal> {
        &self.signals
    }
}

impl<T> fmt::Debug for ClassDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("signals", &self.info.signals)
            .field("handlers", &self.info.handlers)
            .finish()
    }
}

/// Builder of a [`ClassDef`].
pub struct ClassBuilder<T> {
    name: String,
    parent: Option<Arc<ClassDef<T>>>,
    external: Option<Arc<dyn ExternalSignaller>>,
    signals: Vec<(String, Signal)>,
    decls: Vec<HandlerDecl<T>>,
}

impl<T> ClassBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a builder for a root class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            external: None,
            signals: Vec::new(),
            decls: Vec::new(),
        }
    }

    /// Derives from `parent`: inherits its signals, handlers and external signaller.
    pub fn extends(mut self, parent: &Arc<ClassDef<T>>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declares `signal` as member `member`; an unnamed signal takes the member name.
    pub fn signal(mut self, member: impl Into<String>, signal: Signal) -> Self {
        self.signals.push((member.into(), signal));
        self
    }

    /// Declares an immediate handler method.
    pub fn handler<F>(self, signal: impl Into<String>, member: &'static str, f: F) -> Self
    where
        F: Fn(&T, &Args) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.declare(HandlerDecl::new(signal, member, f))
    }

    /// Declares a deferred handler method.
    pub fn handler_async<F, Fut>(self, signal: impl Into<String>, member: &'static str, f: F) -> Self
    where
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.declare(HandlerDecl::new_async(signal, member, f))
    }

    /// Adds a fully configured declaration (pinning, params, unchecked).
    pub fn declare(mut self, decl: HandlerDecl<T>) -> Self {
        self.decls.push(decl);
        self
    }

    /// Sets the external signaller for the signals declared here (and derived classes).
    pub fn external(mut self, external: Arc<dyn ExternalSignaller>) -> Self {
        self.external = Some(external);
        self
    }

    /// Resolves levels and ordering, checks handler targets, registers the class.
    pub fn build(self) -> Result<Arc<ClassDef<T>>, SignalError> {
        let parent = self.parent.as_deref();
        let level = parent.map_or(0, |p| p.level + 1);
        let external = self
            .external
            .or_else(|| parent.and_then(|p| p.external.clone()));

        let own: Vec<(String, bool, Signal)> = self
            .signals
            .into_iter()
            .map(|(member, signal)| match signal.name().map(str::to_string) {
                Some(name) => (name, false, signal),
                None => (member, true, signal),
            })
            .collect();
        let mut signals = parent.map(|p| p.signals.clone()).unwrap_or_default();
        for (name, _, signal) in &own {
            signals.insert(name.clone(), signal.clone());
        }

        let mut members = parent.map(|p| p.members.clone()).unwrap_or_default();
        for decl in self.decls {
            let decl = Arc::new(decl);
            members
                .entry(decl.member())
                .and_modify(|m| m.decl = Arc::clone(&decl))
                .or_insert(Member { level, decl });
        }

        if let Some(m) = members
            .values()
            .find(|m| m.decl.is_checked() && !signals.contains_key(m.decl.signal()))
        {
            return Err(SignalError::UnknownSignal {
                class: self.name,
                handler: m.decl.member().to_string(),
                signal: m.decl.signal().to_string(),
            });
        }

        let sorted = sort_members(&members, &signals, level + 1);
        let info = ClassInfo {
            name: self.name.clone(),
            signals: signals.keys().cloned().collect(),
            handlers: sorted
                .iter()
                .map(|(signal, decls)| (signal.clone(), decls.iter().map(|d| d.member()).collect()))
                .collect(),
        };

        // Signals are named and wired only once the class is known to be valid.
        for (name, unnamed, signal) in &own {
            if *unnamed {
                signal.set_name(name.as_str())?;
            }
            if let Some(ext) = &external {
                signal.set_external(Arc::clone(ext));
            }
        }

        if let Some(ext) = &external {
            ext.register_class(&info)
                .map_err(|source| SignalError::ClassRegistration {
                    class: self.name.clone(),
                    source,
                })?;
        }
        debug!(
            class = %self.name,
            level,
            signals = info.signals.len(),
            handlers = info.handler_count(),
            "class built"
        );

        Ok(Arc::new(ClassDef {
            name: self.name,
            parent: self.parent,
            level,
            external,
            signals,
            members,
            sorted,
            info,
        }))
    }
}

/// Groups members by signal and orders each group by (directive, level, member).
fn sort_members<T>(
    members: &BTreeMap<&'static str, Member<T>>,
    signals: &BTreeMap<String, Signal>,
    levels_count: usize,
) -> HashMap<String, Vec<Arc<HandlerDecl<T>>>> {
    let mut groups: HashMap<String, Vec<(Directive, usize, &'static str, Arc<HandlerDecl<T>>)>> =
        HashMap::new();
    for (&member, m) in members {
        let top_down = signals
            .get(m.decl.signal())
            .is_some_and(|s| s.config().is_top_down());
        let level = if top_down {
            levels_count - 1 - m.level
        } else {
            m.level
        };
        groups
            .entry(m.decl.signal().to_string())
            .or_default()
            .push((m.decl.directive(), level, member, Arc::clone(&m.decl)));
    }

    groups
        .into_iter()
        .map(|(signal, mut entries)| {
            entries.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
            (signal, entries.into_iter().map(|e| e.3).collect())
        })
        .collect()
}
