//! # Rolecast Core
//!
//! A Data-Context-Interaction runtime. Plain domain objects ("players")
//! acquire role behaviour only while an interaction of a context runs, and
//! lose it again when the interaction returns, whatever way it returns.
//!
//! ## Moving parts
//!
//! - [`RoleSchema`] maps role keys to [`RoleDefinition`]s and wires mate
//!   accessors between every pair of roles.
//! - [`ContextType`] holds a schema plus explicitly registered interactions;
//!   [`Context`] is one instantiation with bound players and settings.
//! - Each player carries a [`RoleStack`] of [`CapabilityLayer`]s. Interactions
//!   push one layer per role on entry and pop it on exit.
//! - [`Multiplayer`] fans a single role out to many players.
//! - Role methods receive a [`RoleScope`]; interaction bodies receive a
//!   [`Scene`]. Both are the only ways to reach mates, the context and its
//!   settings.
//!
//! ## Example
//!
//! ```
//! use rolecast_core::{Bindings, ContextType, PlayerRef, RoleMethods, Value};
//!
//! struct Counter(i64);
//!
//! let bump = ContextType::builder("Bump")
//!     .role(
//!         "counter",
//!         RoleMethods::new().public("bump", |scope, _| {
//!             let step = scope.setting("step").and_then(|v| v.as_i64()).unwrap_or(1);
//!             scope.me().with_mut(|c: &mut Counter| c.0 += step)?;
//!             Ok(Value::Unit)
//!         }),
//!     )?
//!     .interaction("run", |scene, _| scene.player("counter")?.send("bump", &[]))?
//!     .build();
//!
//! let counter = PlayerRef::new(Counter(0));
//! bump.call(Bindings::new().bind("counter", &counter).set("step", 5), &[])?;
//!
//! assert_eq!(counter.with(|c: &Counter| c.0)?, 5);
//! assert!(!counter.responds_to("bump"));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod capability;
pub mod context;
pub mod error;
pub mod multiplayer;
pub mod player;
pub mod reentrancy;
pub mod role;
pub mod schema;
pub mod scope;
pub mod settings;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use capability::{CapabilityLayer, RoleStack};
pub use context::{Bindings, Context, ContextId, ContextType, ContextTypeBuilder, DEFAULT_INTERACTION, Scene};
pub use error::{DciError, Result};
pub use multiplayer::Multiplayer;
pub use player::{PlayerId, PlayerRef};
pub use reentrancy::ReentrancyMode;
pub use role::{RoleDefinition, RoleKey, RoleMethod, RoleMethods, Visibility};
pub use schema::RoleSchema;
pub use scope::RoleScope;
pub use settings::Settings;
pub use value::Value;
