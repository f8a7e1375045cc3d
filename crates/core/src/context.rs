//! Context types, context instances and the interaction wrapper.
//!
//! A [`ContextType`] is declared once: its role schema plus the explicitly
//! registered interactions. Instantiating it binds one player (or one
//! [`Multiplayer`] group) per role key and keeps every other binding as a
//! setting. Each call to [`Context::interact`] runs the interaction bracket:
//!
//! 1. Detect a nested call on the same instance and, if so, skip straight
//!    to the body.
//! 2. Push one capability layer per role onto every bound player.
//! 3. Run the body.
//! 4. Pop the layers again, on every exit path including errors and panics.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{DciError, Result};
use crate::multiplayer::Multiplayer;
use crate::player::PlayerRef;
use crate::reentrancy::ReentrancyMode;
use crate::role::{RoleDefinition, RoleMethods, identifier_problem};
use crate::schema::RoleSchema;
use crate::scope::wrong_cast;
use crate::settings::Settings;
use crate::value::Value;

/// Name of the interaction run by [`Context::run`] and [`ContextType::call`].
pub const DEFAULT_INTERACTION: &str = "run";

/// Signature shared by every interaction body.
pub type InteractionFn = dyn Fn(&Scene, &[Value]) -> anyhow::Result<Value>;

/// Unique identifier for a context instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Context types ───────────────────────────────────────────────────────────

struct Interaction {
    name: String,
    body: Rc<InteractionFn>,
}

struct ContextTypeInner {
    name: String,
    schema: RoleSchema,
    interactions: Vec<Interaction>,
    reentrancy: ReentrancyMode,
}

/// A declared context: role schema plus registered interactions.
#[derive(Clone)]
pub struct ContextType {
    inner: Rc<ContextTypeInner>,
}

/// Builder used while a context type is being defined.
pub struct ContextTypeBuilder {
    name: String,
    schema: RoleSchema,
    interactions: Vec<Interaction>,
    reentrancy: ReentrancyMode,
}

impl ContextTypeBuilder {
    /// Declare a role.
    pub fn role(mut self, key: impl Into<String>, methods: RoleMethods) -> Result<Self> {
        self.schema.declare(key, methods)?;
        Ok(self)
    }

    /// Register an interaction entry point.
    pub fn interaction<F>(mut self, name: impl Into<String>, body: F) -> Result<Self>
    where
        F: Fn(&Scene, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        let name = name.into();
        if let Some(reason) = identifier_problem(&name) {
            return Err(DciError::InvalidInteraction {
                name,
                reason: reason.into(),
            });
        }
        if self.interactions.iter().any(|i| i.name == name) {
            return Err(DciError::InvalidInteraction {
                name,
                reason: "already registered in this context".into(),
            });
        }
        self.interactions.push(Interaction {
            name,
            body: Rc::new(body),
        });
        Ok(self)
    }

    /// Choose how nested interaction calls are detected.
    pub fn reentrancy(mut self, mode: ReentrancyMode) -> Self {
        self.reentrancy = mode;
        self
    }

    pub fn build(self) -> ContextType {
        debug!(
            context = %self.name,
            roles = self.schema.len(),
            interactions = self.interactions.len(),
            reentrancy = %self.reentrancy,
            "Defined context type"
        );
        ContextType {
            inner: Rc::new(ContextTypeInner {
                name: self.name,
                schema: self.schema,
                interactions: self.interactions,
                reentrancy: self.reentrancy,
            }),
        }
    }
}

impl ContextType {
    pub fn builder(name: impl Into<String>) -> ContextTypeBuilder {
        ContextTypeBuilder {
            name: name.into(),
            schema: RoleSchema::new(),
            interactions: Vec::new(),
            reentrancy: ReentrancyMode::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The role schema.
    pub fn roles(&self) -> &RoleSchema {
        &self.inner.schema
    }

    pub fn role(&self, key: &str) -> Option<&RoleDefinition> {
        self.inner.schema.get(key)
    }

    /// Registered interaction names, in registration order.
    pub fn interactions(&self) -> impl Iterator<Item = &str> {
        self.inner.interactions.iter().map(|i| i.name.as_str())
    }

    pub fn has_interaction(&self, name: &str) -> bool {
        self.interaction(name).is_some()
    }

    pub fn reentrancy(&self) -> ReentrancyMode {
        self.inner.reentrancy
    }

    /// Create an instance. Every role key must be bound; the remaining
    /// bindings become settings.
    pub fn instantiate(&self, bindings: Bindings) -> Result<Context> {
        let schema = &self.inner.schema;
        if schema.is_empty() {
            return Err(DciError::AbstractInstantiation(self.inner.name.clone()));
        }

        let missing: Vec<String> = schema
            .keys()
            .filter(|key| !bindings.contains(key.as_str()))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DciError::MissingRoles(missing));
        }

        let mut slots: Vec<Option<RolePlayer>> = vec![None; schema.len()];
        let mut settings = Settings::default();
        for (key, value) in bindings.entries {
            match schema.position(&key) {
                Some(index) => slots[index] = Some(RolePlayer::from_value(&key, value)?),
                None => settings.insert(key, value),
            }
        }

        let context = Context {
            shared: Rc::new(ContextShared {
                id: ContextId::new(),
                kind: self.clone(),
                players: slots.into_iter().flatten().collect(),
                settings,
                depth: Cell::new(0),
            }),
        };
        debug!(
            context = %self.inner.name,
            context_id = %context.id(),
            settings = context.shared.settings.len(),
            "Instantiated context"
        );
        Ok(context)
    }

    /// Instantiate and run the default interaction in one go.
    pub fn call(&self, bindings: Bindings, args: &[Value]) -> anyhow::Result<Value> {
        self.instantiate(bindings)?.run(args)
    }

    fn interaction(&self, name: &str) -> Option<Rc<InteractionFn>> {
        self.inner
            .interactions
            .iter()
            .find(|i| i.name == name)
            .map(|i| Rc::clone(&i.body))
    }
}

impl fmt::Debug for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextType")
            .field("name", &self.inner.name)
            .field("roles", &self.inner.schema.keys().collect::<Vec<_>>())
            .field("interactions", &self.interactions().collect::<Vec<_>>())
            .field("reentrancy", &self.inner.reentrancy)
            .finish()
    }
}

// ── Bindings ────────────────────────────────────────────────────────────────

/// Constructor arguments: role bindings and settings, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. A later binding for the same key replaces the earlier one.
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Same as [`bind`](Self::bind); reads better for settings.
    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(key, value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (key, value) in iter {
            bindings.insert(key, value);
        }
        bindings
    }
}

// ── Context instances ───────────────────────────────────────────────────────

/// What a role key is bound to.
#[derive(Debug, Clone, PartialEq)]
enum RolePlayer {
    Single(PlayerRef),
    Group(Multiplayer),
}

impl RolePlayer {
    fn from_value(role: &str, value: Value) -> Result<Self> {
        match value {
            Value::Player(player) => Ok(RolePlayer::Single(player)),
            Value::Group(group) => Ok(RolePlayer::Group(group)),
            _ => Err(DciError::NotAPlayer {
                role: role.to_string(),
            }),
        }
    }

    /// The players that individually receive the role.
    fn members(&self) -> &[PlayerRef] {
        match self {
            RolePlayer::Single(player) => std::slice::from_ref(player),
            RolePlayer::Group(group) => group.members(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            RolePlayer::Single(player) => Value::Player(player.clone()),
            RolePlayer::Group(group) => Value::Group(group.clone()),
        }
    }
}

struct ContextShared {
    id: ContextId,
    kind: ContextType,
    /// Parallel to the schema's declaration order.
    players: Vec<RolePlayer>,
    settings: Settings,
    depth: Cell<usize>,
}

/// A context instance: bound players, settings and interaction entry points.
#[derive(Clone)]
pub struct Context {
    shared: Rc<ContextShared>,
}

/// Non-owning back-reference from a capability layer to its context.
#[derive(Debug, Clone)]
pub(crate) struct ContextLink(Weak<ContextShared>);

impl ContextLink {
    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self(Weak::new())
    }

    pub(crate) fn upgrade(&self) -> Option<Context> {
        self.0.upgrade().map(|shared| Context { shared })
    }

    pub(crate) fn points_to(&self, context: &Context) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&context.shared))
    }
}

impl Context {
    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    pub fn context_type(&self) -> &ContextType {
        &self.shared.kind
    }

    pub fn name(&self) -> &str {
        self.shared.kind.name()
    }

    /// Whether an interaction of this instance is currently running.
    pub fn is_active(&self) -> bool {
        self.shared.depth.get() > 0
    }

    /// Every setting.
    pub fn settings(&self) -> BTreeMap<String, Value> {
        self.shared.settings.snapshot()
    }

    /// One setting's value.
    pub fn setting(&self, key: &str) -> Option<Value> {
        self.shared.settings.get(key)
    }

    /// Only the requested settings.
    pub fn settings_of(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        self.shared.settings.pick(keys)
    }

    /// Run the interaction registered as `name`.
    ///
    /// Errors raised by the body are returned unchanged, after every role
    /// pushed for this call has been popped again.
    pub fn interact(&self, name: &str, args: &[Value]) -> anyhow::Result<Value> {
        let body = self
            .shared
            .kind
            .interaction(name)
            .ok_or_else(|| DciError::UnknownInteraction {
                context: self.name().to_string(),
                name: name.to_string(),
            })?;

        let nested = self.is_nested();
        let _call = CallGuard::enter(self, name, nested);
        let scene = Scene {
            context: self.clone(),
        };
        body(&scene, args)
    }

    /// Run the default interaction.
    pub fn run(&self, args: &[Value]) -> anyhow::Result<Value> {
        self.interact(DEFAULT_INTERACTION, args)
    }

    /// The player or group bound to `key`.
    pub(crate) fn role_value(&self, key: &str) -> Result<Value> {
        self.shared
            .kind
            .roles()
            .position(key)
            .map(|index| self.shared.players[index].to_value())
            .ok_or_else(|| DciError::UnknownRole {
                context: self.name().to_string(),
                role: key.to_string(),
            })
    }

    fn link(&self) -> ContextLink {
        ContextLink(Rc::downgrade(&self.shared))
    }

    fn is_nested(&self) -> bool {
        match self.shared.kind.reentrancy() {
            ReentrancyMode::DepthCounter => self.is_active(),
            ReentrancyMode::FirstRole => self
                .shared
                .players
                .first()
                .and_then(|player| player.members().first())
                .and_then(PlayerRef::top_context)
                .is_some_and(|link| link.points_to(self)),
        }
    }

    /// Push every role onto every bound player; returns the players touched.
    fn bind_roles(&self) -> Vec<PlayerRef> {
        let link = self.link();
        let mut bound = Vec::new();
        for (definition, player) in self.shared.kind.roles().iter().zip(&self.shared.players) {
            if let RolePlayer::Group(group) = player {
                if group.is_empty() {
                    warn!(context = %self.name(), role = %definition.key(), "Binding role to an empty multiplayer group");
                }
            }
            for member in player.members() {
                member.push_role(definition, link.clone());
                bound.push(member.clone());
            }
        }
        bound
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("type", &self.name())
            .field("id", &self.shared.id)
            .field("players", &self.shared.players)
            .field("settings", &self.shared.settings)
            .field("depth", &self.shared.depth.get())
            .finish()
    }
}

/// Bind/unbind bracket around one interaction call.
struct CallGuard<'a> {
    context: &'a Context,
    interaction: &'a str,
    bound: Option<Vec<PlayerRef>>,
}

impl<'a> CallGuard<'a> {
    fn enter(context: &'a Context, interaction: &'a str, nested: bool) -> Self {
        let depth = &context.shared.depth;
        depth.set(depth.get() + 1);

        let bound = if nested {
            trace!(context = %context.name(), context_id = %context.id(), interaction, "Nested interaction, roles already bound");
            None
        } else {
            let bound = context.bind_roles();
            debug!(context = %context.name(), context_id = %context.id(), interaction, players = bound.len(), "Roles bound");
            Some(bound)
        };

        Self {
            context,
            interaction,
            bound,
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if let Some(bound) = self.bound.take() {
            for player in bound.iter().rev() {
                player.pop_role();
            }
            debug!(
                context = %self.context.name(),
                context_id = %self.context.id(),
                interaction = self.interaction,
                players = bound.len(),
                "Roles unbound"
            );
        }
        let depth = &self.context.shared.depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

// ── Interaction surface ─────────────────────────────────────────────────────

/// Handle passed to interaction bodies: the context's private readers.
#[derive(Debug)]
pub struct Scene {
    context: Context,
}

impl Scene {
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The player or group bound to role `key`.
    pub fn role(&self, key: &str) -> Result<Value> {
        self.context.role_value(key)
    }

    /// Role `key`, which must be bound to a single player.
    pub fn player(&self, key: &str) -> Result<PlayerRef> {
        match self.role(key)? {
            Value::Player(player) => Ok(player),
            other => Err(wrong_cast(key, "player", &other)),
        }
    }

    /// Role `key`, which must be bound to a multiplayer group.
    pub fn group(&self, key: &str) -> Result<Multiplayer> {
        match self.role(key)? {
            Value::Group(group) => Ok(group),
            other => Err(wrong_cast(key, "multiplayer group", &other)),
        }
    }

    pub fn settings(&self) -> BTreeMap<String, Value> {
        self.context.settings()
    }

    pub fn setting(&self, key: &str) -> Option<Value> {
        self.context.setting(key)
    }

    pub fn settings_of(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        self.context.settings_of(keys)
    }

    /// Call another interaction of the same instance.
    pub fn interact(&self, name: &str, args: &[Value]) -> anyhow::Result<Value> {
        self.context.interact(name, args)
    }
}
