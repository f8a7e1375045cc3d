//! Role definitions: the named method sets a player may temporarily gain.
//!
//! A role is declared once, when its context type is defined, and never
//! changes afterwards except for the mate wiring performed by
//! [`RoleSchema`](crate::schema::RoleSchema) as sibling roles are declared.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{DciError, Result};
use crate::scope::RoleScope;
use crate::value::Value;

/// Signature shared by every role method body.
pub type RoleFn = dyn Fn(&RoleScope, &[Value]) -> anyhow::Result<Value>;

/// The identifier under which a role is declared and bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleKey(String);

impl RoleKey {
    /// Validate and wrap a role key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        match identifier_problem(&key) {
            Some(reason) => Err(DciError::InvalidRoleKey {
                key,
                reason: reason.into(),
            }),
            None => Ok(Self(key)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleKey {
    type Error = DciError;

    fn try_from(key: String) -> Result<Self> {
        Self::new(key)
    }
}

impl From<RoleKey> for String {
    fn from(key: RoleKey) -> Self {
        key.0
    }
}

/// Why `name` is not a valid identifier, if it isn't.
pub(crate) fn identifier_problem(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();
    match chars.next() {
        None => Some("must not be empty"),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            Some("must start with a letter or underscore")
        }
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Some("may only contain letters, digits and underscores")
        }
        Some(_) => None,
    }
}

/// Whether a role method is part of the player's public interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable through [`PlayerRef::send`](crate::player::PlayerRef::send).
    Public,
    /// Reachable only from role code through [`RoleScope::call`].
    Private,
}

/// One role method: its visibility plus the shared body.
#[derive(Clone)]
pub struct RoleMethod {
    pub visibility: Visibility,
    pub(crate) body: Rc<RoleFn>,
}

impl RoleMethod {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

impl fmt::Debug for RoleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleMethod")
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// Builder for the method set of a role.
///
/// ```ignore
/// let methods = RoleMethods::new()
///     .public("withdraw", |scope, args| { ... })
///     .private("audit", |scope, _| { ... });
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleMethods {
    methods: HashMap<String, RoleMethod>,
}

impl RoleMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a public method. Replaces any existing method with the same name.
    pub fn public<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&RoleScope, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        self.with(name, Visibility::Public, body)
    }

    /// Add a private method, callable only from role code.
    pub fn private<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&RoleScope, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        self.with(name, Visibility::Private, body)
    }

    fn with<F>(mut self, name: impl Into<String>, visibility: Visibility, body: F) -> Self
    where
        F: Fn(&RoleScope, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        self.methods.insert(
            name.into(),
            RoleMethod {
                visibility,
                body: Rc::new(body),
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// An immutable role: key, method set and the keys of its mate roles.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    key: RoleKey,
    methods: HashMap<String, RoleMethod>,
    mates: Vec<RoleKey>,
}

impl RoleDefinition {
    pub(crate) fn new(key: RoleKey, methods: RoleMethods) -> Self {
        Self {
            key,
            methods: methods.methods,
            mates: Vec::new(),
        }
    }

    pub fn key(&self) -> &RoleKey {
        &self.key
    }

    /// Iterate the method set.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &RoleMethod)> {
        self.methods.iter().map(|(name, method)| (name.as_str(), method))
    }

    /// Method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn method(&self, name: &str) -> Option<&RoleMethod> {
        self.methods.get(name)
    }

    /// Keys of every other role in the same schema, in declaration order.
    pub fn mates(&self) -> &[RoleKey] {
        &self.mates
    }

    pub fn has_mate(&self, key: &str) -> bool {
        self.mates.iter().any(|mate| mate.as_str() == key)
    }

    /// Wire an accessor for a sibling role. Idempotent.
    pub(crate) fn add_mate(&mut self, key: &RoleKey) {
        if key != &self.key && !self.has_mate(key.as_str()) {
            self.mates.push(key.clone());
        }
    }
}
