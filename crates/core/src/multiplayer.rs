//! Multiplayer groups: many players jointly satisfying one role key.
//!
//! Binding a role key to a [`Multiplayer`] makes every member play the role
//! on its own [`RoleStack`](crate::capability::RoleStack), while the context
//! keeps handing out the group itself so interaction code can still index and
//! iterate it. The group owns no role stack of its own.

use std::fmt;
use std::ops::{Index, RangeBounds};
use std::rc::Rc;

use crate::player::PlayerRef;
use crate::value::Value;

/// An ordered, non-deduplicated collection of players.
#[derive(Clone)]
pub struct Multiplayer {
    players: Rc<[PlayerRef]>,
}

impl Multiplayer {
    pub fn new(players: impl IntoIterator<Item = PlayerRef>) -> Self {
        Self {
            players: players.into_iter().collect(),
        }
    }

    /// Returns groups unchanged and wraps a single player in a new group.
    /// Anything else yields `None`.
    pub fn wrap(value: Value) -> Option<Self> {
        match value {
            Value::Group(group) => Some(group),
            Value::Player(player) => Some(Self::new([player])),
            _ => None,
        }
    }

    /// Visit members in order.
    pub fn each(&self, mut f: impl FnMut(&PlayerRef)) {
        for player in self.players.iter() {
            f(player);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerRef> {
        self.players.iter()
    }

    pub fn members(&self) -> &[PlayerRef] {
        &self.players
    }

    pub fn get(&self, index: usize) -> Option<&PlayerRef> {
        self.players.get(index)
    }

    /// Positional access counting from the end for negative indices.
    pub fn at(&self, index: isize) -> Option<&PlayerRef> {
        let position = if index < 0 {
            self.players.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.players.get(position)
    }

    /// Members in `range`, clamped to the group's length.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Vec<PlayerRef> {
        use std::ops::Bound;

        let len = self.players.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Vec::new();
        }
        self.players[start..end].to_vec()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player: &PlayerRef) -> bool {
        self.players.iter().any(|member| member == player)
    }

    /// Whether both handles refer to the same group object.
    pub fn ptr_eq(&self, other: &Multiplayer) -> bool {
        Rc::ptr_eq(&self.players, &other.players)
    }
}

impl Default for Multiplayer {
    fn default() -> Self {
        Self::new([])
    }
}

impl PartialEq for Multiplayer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Multiplayer {}

impl Index<usize> for Multiplayer {
    type Output = PlayerRef;

    fn index(&self, index: usize) -> &PlayerRef {
        &self.players[index]
    }
}

impl<'a> IntoIterator for &'a Multiplayer {
    type Item = &'a PlayerRef;
    type IntoIter = std::slice::Iter<'a, PlayerRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<PlayerRef> for Multiplayer {
    fn from_iter<I: IntoIterator<Item = PlayerRef>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for Multiplayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.players.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trio() -> (Multiplayer, Vec<PlayerRef>) {
        let players: Vec<PlayerRef> = (0..3).map(PlayerRef::new).collect();
        (Multiplayer::new(players.clone()), players)
    }

    #[test]
    fn indexing_preserves_member_identity() {
        let (group, players) = trio();
        assert_eq!(group.len(), 3);
        assert_eq!(group[1], players[1]);
        assert_eq!(group.get(2), Some(&players[2]));
        assert_eq!(group.at(-1), Some(&players[2]));
        assert_eq!(group.at(-3), Some(&players[0]));
        assert!(group.at(-4).is_none());
        assert!(group.get(3).is_none());
    }

    #[test]
    fn slices_are_clamped() {
        let (group, players) = trio();
        assert_eq!(group.slice(..), players);
        assert_eq!(group.slice(1..), players[1..].to_vec());
        assert_eq!(group.slice(2..10), players[2..].to_vec());
        assert!(group.slice(5..).is_empty());
    }

    #[test]
    fn each_visits_in_order() {
        let (group, players) = trio();
        let mut seen = Vec::new();
        group.each(|p| seen.push(p.clone()));
        assert_eq!(seen, players);
    }

    #[test]
    fn duplicates_are_kept() {
        let player = PlayerRef::new("solo");
        let group = Multiplayer::new([player.clone(), player.clone()]);
        assert_eq!(group.len(), 2);
        assert!(group.contains(&player));
    }

    #[test]
    fn wrap_is_idempotent_for_groups() {
        let (group, _) = trio();
        let wrapped = Multiplayer::wrap(Value::from(group.clone())).unwrap();
        assert_eq!(wrapped, group);

        let single = PlayerRef::new(7);
        let wrapped = Multiplayer::wrap(Value::from(&single)).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0], single);

        assert!(Multiplayer::wrap(Value::from(3)).is_none());
    }
}
