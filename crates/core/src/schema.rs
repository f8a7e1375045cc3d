//! Role schema: the fixed mapping from role key to role definition.
//!
//! Declaring a role wires mate accessors in both directions: the new role
//! learns every role declared before it, and every earlier role learns the
//! new one. Declaration order therefore never affects mate completeness.

use tracing::debug;

use crate::error::{DciError, Result};
use crate::role::{RoleDefinition, RoleKey, RoleMethods};

/// Ordered role definitions of one context type.
#[derive(Debug, Clone, Default)]
pub struct RoleSchema {
    roles: Vec<RoleDefinition>,
}

impl RoleSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role. Fails on a non-identifier or an already declared key.
    pub fn declare(
        &mut self,
        key: impl Into<String>,
        methods: RoleMethods,
    ) -> Result<&RoleDefinition> {
        let key = RoleKey::new(key)?;
        if self.contains(key.as_str()) {
            return Err(DciError::InvalidRoleKey {
                key: key.to_string(),
                reason: "already declared in this context".into(),
            });
        }

        let mut definition = RoleDefinition::new(key, methods);
        for mate in &mut self.roles {
            mate.add_mate(definition.key());
            definition.add_mate(mate.key());
        }
        debug!(role = %definition.key(), mates = definition.mates().len(), "Declared role");

        self.roles.push(definition);
        Ok(&self.roles[self.roles.len() - 1])
    }

    pub fn get(&self, key: &str) -> Option<&RoleDefinition> {
        self.roles.iter().find(|role| role.key().as_str() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Position of `key` in declaration order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.roles.iter().position(|role| role.key().as_str() == key)
    }

    /// The first declared role.
    pub fn first(&self) -> Option<&RoleDefinition> {
        self.roles.first()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RoleKey> {
        self.roles.iter().map(RoleDefinition::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RoleDefinition> {
        self.roles.iter()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl<'a> IntoIterator for &'a RoleSchema {
    type Item = &'a RoleDefinition;
    type IntoIter = std::slice::Iter<'a, RoleDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
