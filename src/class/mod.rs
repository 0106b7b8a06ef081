//! Class descriptors: the registration table for declared handlers.
//!
//! Instead of discovering handlers by introspection, a class lists them once:
//!
//! ```text
//! ClassDef::builder("Base")                 ClassDef::builder("Derived")
//!   .signal("click", Signal::new())            .extends(&base)
//!   .handler("click", "z", ..)                 .handler("click", "a", ..)
//!   .build()                                   .declare(HandlerDecl::new(..).first())
//!                                              .build()
//!             │                                          │
//!             └──────────── sorted once, cached ─────────┘
//!                                 │
//!                  attach(&Arc<T>) → Instance<T> → signal(name) → BoundSignal
//! ```
//!
//! - [`ClassDef`] / [`ClassBuilder`] hierarchy, signals, sorted handlers
//! - [`HandlerDecl`] / [`Directive`] one declared handler and its pinning
//! - [`Instance`] per-object partitions, detached on drop
//! - [`ClassInfo`] summary handed to the external signaller

mod decl;
mod def;
mod instance;

pub use decl::{Directive, HandlerDecl};
pub use def::{ClassBuilder, ClassDef, ClassInfo};
pub use instance::Instance;
