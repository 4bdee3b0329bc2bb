use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ActorId = Uuid;

/// The entity a bundle runs for: a live player, or the privileged console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    Console,
    Player(ActorId),
}

impl Actor {
    pub fn id(&self) -> Option<ActorId> {
        match self {
            Actor::Console => None,
            Actor::Player(id) => Some(*id),
        }
    }

    pub fn is_console(&self) -> bool {
        matches!(self, Actor::Console)
    }
}

/// Point-in-time view of a player, as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub name: String,
    pub id: ActorId,
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub health: f64,
    pub level: i64,
    pub gamemode: String,
    #[serde(default)]
    pub is_flying: bool,
    #[serde(default)]
    pub is_sneaking: bool,
    #[serde(default)]
    pub is_op: bool,
    /// Item identifier (lowercase) to total stack count.
    #[serde(default)]
    pub inventory: HashMap<String, u32>,
}

impl ActorSnapshot {
    pub fn new(name: &str, id: ActorId) -> Self {
        Self {
            name: name.to_string(),
            id,
            world: "world".to_string(),
            x: 0.0,
            y: 64.0,
            z: 0.0,
            health: 20.0,
            level: 0,
            gamemode: "SURVIVAL".to_string(),
            is_flying: false,
            is_sneaking: false,
            is_op: false,
            inventory: HashMap::new(),
        }
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(item))
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn block_x(&self) -> i64 {
        self.x.floor() as i64
    }

    pub fn block_y(&self) -> i64 {
        self.y.floor() as i64
    }

    pub fn block_z(&self) -> i64 {
        self.z.floor() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// Entry names as registered on the team (usually player names).
    pub members: Vec<String>,
}
