//! Dynamic values passed into and out of interactions and role methods.

use crate::multiplayer::Multiplayer;
use crate::player::PlayerRef;

/// Argument, return and settings value.
///
/// Plain data travels as JSON; players and groups travel by reference so
/// their identity survives the trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Unit,
    Data(serde_json::Value),
    Player(PlayerRef),
    Group(Multiplayer),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Data(_) => "data value",
            Value::Player(_) => "player",
            Value::Group(_) => "multiplayer group",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerRef> {
        match self {
            Value::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Multiplayer> {
        match self {
            Value::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(serde_json::Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(serde_json::Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(serde_json::Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(serde_json::Value::as_str)
    }
}

impl From<PlayerRef> for Value {
    fn from(player: PlayerRef) -> Self {
        Value::Player(player)
    }
}

impl From<&PlayerRef> for Value {
    fn from(player: &PlayerRef) -> Self {
        Value::Player(player.clone())
    }
}

impl From<Multiplayer> for Value {
    fn from(group: Multiplayer) -> Self {
        Value::Group(group)
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

macro_rules! data_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Data(serde_json::Value::from(value))
                }
            }
        )*
    };
}

data_from!(bool, i32, i64, u32, u64, usize, f64, String, &str);
