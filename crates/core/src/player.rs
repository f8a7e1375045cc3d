//! Players: plain domain objects that can be bound to roles.
//!
//! A [`PlayerRef`] is a shared handle: clones point at the same object, the
//! same own state and the same [`RoleStack`]. Role behaviour never touches
//! the object's type; it lives entirely in the stack and disappears when the
//! binding interaction returns.

use serde::{Deserialize, Serialize};
use std::any::{Any, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;
use uuid::Uuid;

use crate::capability::RoleStack;
use crate::context::ContextLink;
use crate::error::DciError;
use crate::role::{RoleDefinition, Visibility};
use crate::scope::RoleScope;
use crate::value::Value;

/// Unique identifier for a player, used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct PlayerCell {
    id: PlayerId,
    type_name: &'static str,
    state: RefCell<Box<dyn Any>>,
    roles: RefCell<RoleStack>,
}

/// Shared handle to a player object.
#[derive(Clone)]
pub struct PlayerRef {
    cell: Rc<PlayerCell>,
}

impl PlayerRef {
    /// Wrap a domain object so it can play roles.
    pub fn new<T: Any>(state: T) -> Self {
        Self {
            cell: Rc::new(PlayerCell {
                id: PlayerId::new(),
                type_name: type_name::<T>(),
                state: RefCell::new(Box::new(state)),
                roles: RefCell::new(RoleStack::new()),
            }),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.cell.id
    }

    /// Type name of the wrapped object.
    pub fn type_name(&self) -> &'static str {
        self.cell.type_name
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &PlayerRef) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Read the player's own state.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, DciError> {
        let state = self.cell.state.try_borrow().map_err(|_| self.borrowed())?;
        let value = (**state)
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>())?;
        Ok(f(value))
    }

    /// Mutate the player's own state.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, DciError> {
        let mut state = self
            .cell
            .state
            .try_borrow_mut()
            .map_err(|_| self.borrowed())?;
        let value = (**state)
            .downcast_mut::<T>()
            .ok_or_else(|| self.mismatch::<T>())?;
        Ok(f(value))
    }

    /// Whether the wrapped object is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.cell
            .state
            .try_borrow()
            .map(|state| (**state).is::<T>())
            .unwrap_or(false)
    }

    /// Whether a public role method named `method` is currently available.
    pub fn responds_to(&self, method: &str) -> bool {
        self.cell.roles.borrow().responds_to(method)
    }

    /// Number of roles this player is currently playing.
    pub fn role_depth(&self) -> usize {
        self.cell.roles.borrow().depth()
    }

    /// Number of capability layers ever allocated for this player.
    pub fn allocated_layers(&self) -> usize {
        self.cell.roles.borrow().allocated()
    }

    /// Keys of the active roles, most recent first.
    pub fn active_roles(&self) -> Vec<String> {
        self.cell
            .roles
            .borrow()
            .active()
            .filter_map(|layer| layer.role_key().map(ToString::to_string))
            .collect()
    }

    /// Invoke a public role method.
    pub fn send(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        self.dispatch(method, args, Visibility::Public)
    }

    /// Invoke a role method; `reach` is the most private visibility allowed.
    pub(crate) fn dispatch(
        &self,
        method: &str,
        args: &[Value],
        reach: Visibility,
    ) -> anyhow::Result<Value> {
        // Resolve and release the stack borrow before running role code.
        let resolved = self.cell.roles.borrow().resolve(method);
        let Some(resolved) = resolved else {
            return Err(self.no_method(method).into());
        };
        if !resolved.method.is_public() && reach == Visibility::Public {
            return Err(DciError::PrivateMethod {
                player: self.to_string(),
                method: method.to_string(),
            }
            .into());
        }
        let Some(context) = resolved.context.upgrade() else {
            return Err(self.no_method(method).into());
        };

        trace!(player = %self.cell.id, role = %resolved.role_key, method, "Dispatching role method");
        let scope = RoleScope::new(self.clone(), resolved.role_key, resolved.mates, context);
        (resolved.method.body)(&scope, args)
    }

    pub(crate) fn push_role(&self, definition: &RoleDefinition, context: ContextLink) {
        let depth = self.cell.roles.borrow_mut().push(definition, context);
        trace!(player = %self.cell.id, role = %definition.key(), depth, "Pushed capability layer");
    }

    pub(crate) fn pop_role(&self) {
        let mut roles = self.cell.roles.borrow_mut();
        if roles.pop() {
            trace!(player = %self.cell.id, depth = roles.depth(), "Popped capability layer");
        }
    }

    /// Context owning the top layer, if any.
    pub(crate) fn top_context(&self) -> Option<ContextLink> {
        self.cell
            .roles
            .borrow()
            .top()
            .and_then(|layer| layer.context().cloned())
    }

    fn no_method(&self, method: &str) -> DciError {
        DciError::NoMethod {
            player: self.to_string(),
            method: method.to_string(),
        }
    }

    fn borrowed(&self) -> DciError {
        DciError::StateBorrowed {
            player: self.to_string(),
        }
    }

    fn mismatch<T: Any>(&self) -> DciError {
        DciError::StateTypeMismatch {
            player: self.to_string(),
            expected: type_name::<T>(),
        }
    }
}

impl PartialEq for PlayerRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for PlayerRef {}

impl fmt::Debug for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerRef")
            .field("id", &self.cell.id)
            .field("type", &self.cell.type_name)
            .field("roles", &self.role_depth())
            .finish()
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.cell.type_name, self.cell.id)
    }
}
