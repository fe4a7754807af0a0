use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ObjectId(pub(crate) u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub(crate) fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ObjectKind {
    Building,
    Tree,
    Rock,
}

const BUILDING_CAPABILITIES: &[ActionId] = &[ActionId::Move];
const TREE_CAPABILITIES: &[ActionId] = &[ActionId::Axe, ActionId::Water];
const ROCK_CAPABILITIES: &[ActionId] = &[ActionId::Pickaxe];

impl ObjectKind {
    pub(crate) fn capabilities(self) -> &'static [ActionId] {
        match self {
            Self::Building => BUILDING_CAPABILITIES,
            Self::Tree => TREE_CAPABILITIES,
            Self::Rock => ROCK_CAPABILITIES,
        }
    }

    pub(crate) fn default_health(self) -> Option<u32> {
        match self {
            Self::Building => None,
            Self::Tree => Some(super::TREE_DEFAULT_HEALTH),
            Self::Rock => Some(super::ROCK_DEFAULT_HEALTH),
        }
    }

    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Tree => "tree",
            Self::Rock => "rock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ActionId {
    Move,
    Axe,
    Water,
    Pickaxe,
}

impl ActionId {
    pub(crate) const ALL: [ActionId; 4] = [Self::Move, Self::Axe, Self::Water, Self::Pickaxe];

    /// Repeatable actions keep swinging until the target is gone.
    pub(crate) fn is_repeatable(self) -> bool {
        matches!(self, Self::Axe)
    }

    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Axe => "axe",
            Self::Water => "water",
            Self::Pickaxe => "pickaxe",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_token().eq_ignore_ascii_case(token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionOutcome {
    Continued,
    Destroyed,
    Blocked,
}

impl ActionOutcome {
    pub(crate) fn is_accepted(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlacementReason {
    OutOfBounds,
    OnWater,
    OnBlocking,
    Occupied(String),
}

impl fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => f.write_str("out_of_bounds"),
            Self::OnWater => f.write_str("on_water"),
            Self::OnBlocking => f.write_str("on_blocking"),
            Self::Occupied(name) => write!(f, "occupied:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlacementValidity {
    pub(crate) valid: bool,
    pub(crate) reason: Option<PlacementReason>,
}

impl PlacementValidity {
    pub(crate) fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub(crate) fn invalid(reason: PlacementReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

impl Default for PlacementValidity {
    fn default() -> Self {
        Self::valid()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Health {
    pub(crate) current: u32,
    pub(crate) max: u32,
}

impl Health {
    pub(crate) fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub(crate) fn is_depleted(self) -> bool {
        self.current == 0
    }
}

/// Resource tallies for the running session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GameSession {
    pub(crate) wood: u32,
    pub(crate) stone: u32,
    pub(crate) waterings: u32,
}

impl GameSession {
    pub(crate) fn record_hit(&mut self, action: ActionId) {
        match action {
            ActionId::Axe => self.wood = self.wood.saturating_add(1),
            ActionId::Pickaxe => self.stone = self.stone.saturating_add(1),
            ActionId::Water => self.waterings = self.waterings.saturating_add(1),
            ActionId::Move => {}
        }
    }
}
