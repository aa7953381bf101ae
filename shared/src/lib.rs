//! Shared protocol and entity definitions for the galaxy client.
//!
//! The wire protocol (`protocol`) is the contract with the game server and
//! must stay binary-compatible across releases. The entity model (`entity`)
//! holds the circle geometry and the consumption rules that both the
//! networked session and the offline bot simulation run on.

pub mod entity;
pub mod protocol;

pub use entity::{
    can_eat, can_eat_food, consume, generate_random_food, Body, Food, Player, WorldBounds,
};
pub use protocol::{Event, Operation, PlayerId, Vector2D};

/// Surplus applied on every consumption so that total mass strictly grows.
/// Anti-stalemate bias, not mass conservation.
pub const GROWTH_FACTOR: f32 = 1.0002;

/// All food pellets share one fixed radius.
pub const FOOD_RADIUS: f32 = 20.0;

/// Minimum distance (world units) the cursor must travel before another
/// Move operation goes out.
pub const MOVE_SEND_THRESHOLD: f32 = 5.0;

/// How far a bot can see prey.
pub const BOT_SENSOR_RANGE: f32 = 2000.0;

pub const DEFAULT_WORLD_WIDTH: f32 = 10000.0;
pub const DEFAULT_WORLD_HEIGHT: f32 = 10000.0;
