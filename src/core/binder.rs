//! # Argument binding against a declared parameter list.
//!
//! A handler may declare a [`Params`] list at registration time. Before the
//! handler runs, the executor adapts the caller's [`Args`] to it:
//!
//! ```text
//! caller Args ──► Params::bind ──► handler Args
//!                   ├─ declared params   → placed, defaults filled
//!                   ├─ undeclared named  → kept with a catch-all, dropped otherwise
//!                   └─ arity mismatch    → BindError (the handler's call error)
//! ```
//!
//! ## Rules
//! - Positional arguments are never filtered.
//! - More positionals than positional parameters is [`BindError::TooManyPositional`]
//!   unless the list accepts extra positionals.
//! - A parameter without default and without value is [`BindError::Missing`].
//! - A parameter given both positionally and by name is [`BindError::Duplicate`].
//! - The bound `Args` carry every positional parameter in order (positionally)
//!   and every named-only parameter by name, catch-all or not.
//! - A catch-all keeps the undeclared named arguments as given.

use serde_json::Value;

use crate::{error::BindError, events::Args};

/// How a declared parameter may be supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Positionally or by name.
    Positional,
    /// By name only.
    Named,
}

/// One declared parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Positional-or-named vs named-only.
    pub kind: ParamKind,
    /// Value used when the caller supplies none.
    pub default: Option<Value>,
}

/// Declared parameter list of a handler or validator.
///
/// ## Example
/// ```rust
/// use signalvisor::{Args, Params};
/// use serde_json::json;
///
/// let params = Params::new().arg("arg").named_or("kw", "default");
/// let bound = params
///     .bind(&Args::new().with_arg(1).with_named("other", true))
///     .unwrap();
///
/// assert_eq!(bound.positional, vec![json!(1)]);
/// assert_eq!(bound.kwarg("kw"), Some(&json!("default")));
/// assert_eq!(bound.kwarg("other"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    params: Vec<Param>,
    var_positional: bool,
    var_named: bool,
}

impl Params {
    /// Creates an empty parameter list (accepts no arguments).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required positional-or-named parameter.
    pub fn arg(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::Positional, None)
    }

    /// Adds a positional-or-named parameter with a default.
    pub fn arg_or(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push(name, ParamKind::Positional, Some(default.into()))
    }

    /// Adds a required named-only parameter.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::Named, None)
    }

    /// Adds a named-only parameter with a default.
    pub fn named_or(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push(name, ParamKind::Named, Some(default.into()))
    }

    /// Accepts any number of extra positional arguments.
    pub fn var_args(mut self) -> Self {
        self.var_positional = true;
        self
    }

    /// Accepts any extra named arguments (catch-all).
    pub fn var_named(mut self) -> Self {
        self.var_named = true;
        self
    }

    fn push(mut self, name: impl Into<String>, kind: ParamKind, default: Option<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            kind,
            default,
        });
        self
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// True if extra named arguments are accepted unfiltered.
    #[inline]
    pub fn accepts_any_named(&self) -> bool {
        self.var_named
    }

    /// True if `name` is a declared parameter.
    pub fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    fn positional_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.kind == ParamKind::Positional)
    }

    fn named_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.kind == ParamKind::Named)
    }

    /// Adapts `args` to this parameter list.
    pub fn bind(&self, args: &Args) -> Result<Args, BindError> {
        let declared = self.positional_params().count();
        let given = args.positional.len();

        if given > declared && !self.var_positional {
            return Err(BindError::TooManyPositional {
                expected: declared,
                given,
            });
        }
        if let Some(p) = self
            .positional_params()
            .take(given)
            .find(|p| args.named.contains_key(&p.name))
        {
            return Err(BindError::Duplicate {
                name: p.name.clone(),
            });
        }

        let mut bound = Args::new();
        for (i, p) in self.positional_params().enumerate() {
            let value = match args.positional.get(i) {
                Some(v) => v.clone(),
                None => value_for(p, args)?,
            };
            bound.positional.push(value);
        }
        if given > declared {
            bound
                .positional
                .extend(args.positional[declared..].iter().cloned());
        }
        for p in self.named_params() {
            bound.named.insert(p.name.clone(), value_for(p, args)?);
        }
        if self.var_named {
            for (name, value) in &args.named {
                if !self.declares(name) {
                    bound.named.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(bound)
    }
}

/// Named value supplied by the caller, or the declared default.
fn value_for(p: &Param, args: &Args) -> Result<Value, BindError> {
    args.named
        .get(&p.name)
        .or(p.default.as_ref())
        .cloned()
        .ok_or_else(|| BindError::Missing {
            name: p.name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undeclared_named_are_dropped() {
        let params = Params::new().arg("arg").arg("kw");
        let args = Args::new()
            .with_arg(1)
            .with_named("kw", "a")
            .with_named("extra", 3);

        let bound = params.bind(&args).unwrap();
        assert_eq!(bound.positional, vec![json!(1), json!("a")]);
        assert!(bound.named.is_empty());
    }

    #[test]
    fn test_defaults_fill_omitted_parameters() {
        let params = Params::new().arg("a").arg_or("b", 2).named_or("c", "x");
        let bound = params.bind(&Args::new().with_arg(1)).unwrap();

        assert_eq!(bound.positional, vec![json!(1), json!(2)]);
        assert_eq!(bound.kwarg("c"), Some(&json!("x")));
    }

    #[test]
    fn test_catch_all_passes_everything_through() {
        let params = Params::new().arg("a").var_named();
        let args = Args::new().with_arg(1).with_named("anything", true);

        assert!(params.accepts_any_named());
        assert_eq!(params.bind(&args).unwrap(), args);
    }

    #[test]
    fn test_catch_all_still_fills_defaults() {
        let params = Params::new().named_or("kw", "default").var_named();
        let bound = params.bind(&Args::new().with_named("extra", 1)).unwrap();

        assert_eq!(bound.kwarg("kw"), Some(&json!("default")));
        assert_eq!(bound.kwarg("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_catch_all_places_positional_given_by_name() {
        let with_catch_all = Params::new().arg("a").var_named();
        let without = Params::new().arg("a");
        let args = Args::new().with_named("a", 1);

        let bound = with_catch_all.bind(&args).unwrap();
        assert_eq!(bound.positional, vec![json!(1)]);
        assert!(bound.named.is_empty());
        assert_eq!(bound, without.bind(&args).unwrap());
    }

    #[test]
    fn test_too_many_positional_is_an_arity_error() {
        let params = Params::new().arg("a");
        let err = params
            .bind(&Args::new().with_arg(1).with_arg(2))
            .unwrap_err();
        assert_eq!(
            err,
            BindError::TooManyPositional {
                expected: 1,
                given: 2
            }
        );
    }

    #[test]
    fn test_extra_positionals_accepted_with_var_args() {
        let params = Params::new().arg("a").var_args();
        let bound = params
            .bind(&Args::new().with_arg(1).with_arg(2).with_arg(3))
            .unwrap();
        assert_eq!(bound.positional, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_missing_required_argument() {
        let params = Params::new().arg("a").named("flag");
        let err = params.bind(&Args::new().with_arg(1)).unwrap_err();
        assert_eq!(err, BindError::Missing { name: "flag".into() });
    }

    #[test]
    fn test_positional_and_named_for_same_parameter() {
        let params = Params::new().arg("a");
        let err = params
            .bind(&Args::new().with_arg(1).with_named("a", 2))
            .unwrap_err();
        assert_eq!(err, BindError::Duplicate { name: "a".into() });
    }

    #[test]
    fn test_named_value_fills_positional_parameter() {
        let params = Params::new().arg("a").arg("b");
        let bound = params
            .bind(&Args::new().with_arg(1).with_named("b", 2))
            .unwrap();
        assert_eq!(bound.positional, vec![json!(1), json!(2)]);
    }
}
