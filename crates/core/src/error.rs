//! Error types for the role-assignment engine.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Schema and construction failures are fail-fast usage errors; dispatch
//! failures describe a player that does not (currently) play a role.

use thiserror::Error;

/// The top-level error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DciError {
    // --- Context-type definition ---
    #[error("Invalid role key '{key}': {reason}")]
    InvalidRoleKey { key: String, reason: String },

    #[error("Invalid interaction '{name}': {reason}")]
    InvalidInteraction { name: String, reason: String },

    // --- Instantiation ---
    #[error("missing roles [{}]", .0.join(", "))]
    MissingRoles(Vec<String>),

    #[error("Role '{role}' must be bound to a player or a multiplayer group")]
    NotAPlayer { role: String },

    #[error("Context type '{0}' declares no roles and is meant only to be specialized")]
    AbstractInstantiation(String),

    // --- Interaction dispatch ---
    #[error("Context type '{context}' has no interaction '{name}'")]
    UnknownInteraction { context: String, name: String },

    #[error("Context type '{context}' has no role '{role}'")]
    UnknownRole { context: String, role: String },

    #[error("Role '{role}' is bound to a {found}, not a {expected}")]
    WrongCast {
        role: String,
        expected: &'static str,
        found: &'static str,
    },

    // --- Role dispatch ---
    #[error("Undefined method '{method}' for player {player}")]
    NoMethod { player: String, method: String },

    #[error("Private method '{method}' called for player {player}")]
    PrivateMethod { player: String, method: String },

    #[error("Role '{role}' has no mate role '{mate}'")]
    NoMateRole { role: String, mate: String },

    // --- Player state ---
    #[error("Player {player} does not hold a value of type {expected}")]
    StateTypeMismatch {
        player: String,
        expected: &'static str,
    },

    #[error("Player {player} state is already borrowed")]
    StateBorrowed { player: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, DciError>;
