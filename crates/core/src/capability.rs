//! Capability layers and the per-player role stack.
//!
//! Each player owns a [`RoleStack`]: an ordered list of [`CapabilityLayer`]s
//! plus an active-depth cursor. The layers above the cursor are idle and are
//! refilled in place by later pushes instead of being reallocated.

use std::collections::HashMap;

use crate::context::ContextLink;
use crate::role::{RoleDefinition, RoleKey, RoleMethod};

/// One pushed unit of role behaviour.
#[derive(Debug, Default)]
pub struct CapabilityLayer {
    methods: HashMap<String, RoleMethod>,
    mates: Vec<RoleKey>,
    role_key: Option<RoleKey>,
    context: Option<ContextLink>,
}

impl CapabilityLayer {
    /// Install a role's methods and back-references.
    fn fill(&mut self, definition: &RoleDefinition, context: ContextLink) {
        self.methods.clear();
        self.methods.extend(
            definition
                .methods()
                .map(|(name, method)| (name.to_string(), method.clone())),
        );
        self.mates.clear();
        self.mates.extend_from_slice(definition.mates());
        self.role_key = Some(definition.key().clone());
        self.context = Some(context);
    }

    /// Remove every installed method and clear the back-references.
    fn strip(&mut self) {
        self.methods.clear();
        self.mates.clear();
        self.role_key = None;
        self.context = None;
    }

    pub fn is_active(&self) -> bool {
        self.role_key.is_some()
    }

    /// The role this layer currently represents.
    pub fn role_key(&self) -> Option<&RoleKey> {
        self.role_key.as_ref()
    }

    pub(crate) fn context(&self) -> Option<&ContextLink> {
        self.context.as_ref()
    }

    pub fn method(&self, name: &str) -> Option<&RoleMethod> {
        self.methods.get(name)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// Everything needed to run a method found on a layer, detached from the stack.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedMethod {
    pub method: RoleMethod,
    pub role_key: RoleKey,
    pub mates: Vec<RoleKey>,
    pub context: ContextLink,
}

/// Ordered capability layers owned by one player.
#[derive(Debug, Default)]
pub struct RoleStack {
    layers: Vec<CapabilityLayer>,
    depth: usize,
}

impl RoleStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active layers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of layers ever allocated, active or idle.
    pub fn allocated(&self) -> usize {
        self.layers.len()
    }

    /// Activate a layer holding `definition`, reusing an idle one when possible.
    /// Returns the new depth.
    pub(crate) fn push(&mut self, definition: &RoleDefinition, context: ContextLink) -> usize {
        match self.layers.get_mut(self.depth) {
            Some(idle) => idle.fill(definition, context),
            None => {
                let mut layer = CapabilityLayer::default();
                layer.fill(definition, context);
                self.layers.push(layer);
            }
        }
        self.depth += 1;
        self.depth
    }

    /// Strip the top layer. A no-op on an empty stack.
    pub(crate) fn pop(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        self.layers[self.depth].strip();
        true
    }

    /// The most recently pushed, still active layer.
    pub fn top(&self) -> Option<&CapabilityLayer> {
        self.depth.checked_sub(1).map(|index| &self.layers[index])
    }

    /// Active layers, top first.
    pub fn active(&self) -> impl Iterator<Item = &CapabilityLayer> {
        self.layers[..self.depth].iter().rev()
    }

    /// Find the topmost active layer defining `name`.
    pub(crate) fn resolve(&self, name: &str) -> Option<ResolvedMethod> {
        self.active().find_map(|layer| {
            let method = layer.method(name)?;
            Some(ResolvedMethod {
                method: method.clone(),
                role_key: layer.role_key.clone()?,
                mates: layer.mates.clone(),
                context: layer.context.clone()?,
            })
        })
    }

    /// Whether any active layer exposes `name` publicly.
    pub fn responds_to(&self, name: &str) -> bool {
        self.active()
            .find_map(|layer| layer.method(name))
            .is_some_and(RoleMethod::is_public)
    }
}
