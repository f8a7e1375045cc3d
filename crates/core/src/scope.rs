//! The role-code surface.
//!
//! A [`RoleScope`] is built for every role method call and handed to the
//! method body. It is the only way to reach mate roles, the owning context
//! and its settings, so none of these are part of a player's public
//! interface.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::{DciError, Result};
use crate::multiplayer::Multiplayer;
use crate::player::PlayerRef;
use crate::role::{RoleKey, Visibility};
use crate::value::Value;

/// Handle passed to role method bodies.
#[derive(Debug)]
pub struct RoleScope {
    me: PlayerRef,
    role_key: RoleKey,
    mates: Vec<RoleKey>,
    context: Context,
}

impl RoleScope {
    pub(crate) fn new(
        me: PlayerRef,
        role_key: RoleKey,
        mates: Vec<RoleKey>,
        context: Context,
    ) -> Self {
        Self {
            me,
            role_key,
            mates,
            context,
        }
    }

    /// The player running this method.
    pub fn me(&self) -> &PlayerRef {
        &self.me
    }

    /// The role the method belongs to.
    pub fn role_key(&self) -> &RoleKey {
        &self.role_key
    }

    /// The context instance that bound this role.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The player or group currently bound to mate role `key`.
    pub fn mate(&self, key: &str) -> Result<Value> {
        if !self.mates.iter().any(|mate| mate.as_str() == key) {
            return Err(DciError::NoMateRole {
                role: self.role_key.to_string(),
                mate: key.to_string(),
            });
        }
        self.context.role_value(key)
    }

    /// Mate role `key`, which must be bound to a single player.
    pub fn mate_player(&self, key: &str) -> Result<PlayerRef> {
        match self.mate(key)? {
            Value::Player(player) => Ok(player),
            other => Err(wrong_cast(key, "player", &other)),
        }
    }

    /// Mate role `key`, which must be bound to a multiplayer group.
    pub fn mate_group(&self, key: &str) -> Result<Multiplayer> {
        match self.mate(key)? {
            Value::Group(group) => Ok(group),
            other => Err(wrong_cast(key, "multiplayer group", &other)),
        }
    }

    /// Every setting of the owning context.
    pub fn settings(&self) -> BTreeMap<String, Value> {
        self.context.settings()
    }

    pub fn setting(&self, key: &str) -> Option<Value> {
        self.context.setting(key)
    }

    pub fn settings_of(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        self.context.settings_of(keys)
    }

    /// Call one of this player's role methods, private ones included.
    pub fn call(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        self.me.dispatch(method, args, Visibility::Private)
    }
}

pub(crate) fn wrong_cast(role: &str, expected: &'static str, found: &Value) -> DciError {
    DciError::WrongCast {
        role: role.to_string(),
        expected,
        found: found.kind(),
    }
}
