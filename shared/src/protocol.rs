//! Wire protocol between the client and the galaxy server.
//!
//! Messages are bincode-encoded enums framed over a message-oriented duplex
//! connection. Variant order and field order are part of the wire contract:
//! the server decodes by position, so reordering anything here is a breaking
//! protocol change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in world coordinates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Vector2D) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// 16-byte server-issued player identity.
///
/// Used raw as the registry key. Hashing the bytes down to a smaller key
/// would let two distinct players silently merge on a collision.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub [u8; 16]);

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Client → server messages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Operation {
    Join {
        player_id: PlayerId,
        username: String,
        color: u32,
        skin: String,
        /// Room selector; empty string means the public room.
        game_id: String,
    },
    Move {
        position: Vector2D,
    },
    EatFood {
        food_position: Vector2D,
        new_radius: i32,
    },
    EatPlayer {
        player_eaten: PlayerId,
        new_radius: i32,
    },
    Leave,
    Pause,
}

/// Server → client messages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Event {
    /// Join acknowledgement: the server-assigned identity and spawn state
    /// the local player adopts verbatim.
    Join {
        player_id: PlayerId,
        position: Vector2D,
        radius: f32,
        color: u32,
        skin: String,
    },
    NewPlayer {
        player_id: PlayerId,
        position: Vector2D,
        radius: f32,
        color: u32,
        skin: String,
        username: String,
    },
    PlayerMove {
        player_id: PlayerId,
        position: Vector2D,
    },
    NewFood {
        position: Vector2D,
        color: u32,
    },
    PlayerGrow {
        player_id: PlayerId,
        radius: f32,
    },
    DestroyFood {
        position: Vector2D,
    },
    DestroyPlayer {
        player_id: PlayerId,
    },
    Pause,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_distance() {
        let a = Vector2D::new(0.0, 0.0);
        let b = Vector2D::new(3.0, 4.0);
        assert_eq!(a.distance_squared(&b), 25.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_player_id_formatting() {
        let id = PlayerId([0xab; 16]);
        assert_eq!(format!("{}", id), "ab".repeat(16));
    }

    #[test]
    fn test_operation_serialization_join() {
        let op = Operation::Join {
            player_id: PlayerId([7; 16]),
            username: "tester".to_string(),
            color: 0xff0000,
            skin: "default".to_string(),
            game_id: String::new(),
        };

        let serialized = bincode::serialize(&op).unwrap();
        let deserialized: Operation = bincode::deserialize(&serialized).unwrap();
        assert_eq!(op, deserialized);
    }

    #[test]
    fn test_operation_serialization_eat_food() {
        let op = Operation::EatFood {
            food_position: Vector2D::new(5010.0, 5000.0),
            new_radius: 36,
        };

        let serialized = bincode::serialize(&op).unwrap();
        let deserialized: Operation = bincode::deserialize(&serialized).unwrap();
        assert_eq!(op, deserialized);
    }

    #[test]
    fn test_event_serialization_new_player() {
        let event = Event::NewPlayer {
            player_id: PlayerId([1; 16]),
            position: Vector2D::new(100.0, 200.0),
            radius: 30.0,
            color: 0x00ff00,
            skin: "nebula".to_string(),
            username: "rival".to_string(),
        };

        let serialized = bincode::serialize(&event).unwrap();
        let deserialized: Event = bincode::deserialize(&serialized).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_payload_free_variants_encode() {
        // Leave and Pause carry no payload but still need a stable encoding.
        let serialized = bincode::serialize(&Operation::Leave).unwrap();
        let deserialized: Operation = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, Operation::Leave);
    }
}
