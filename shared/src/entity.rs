//! Entity model: circles that eat each other.
//!
//! Players, bots and food all share the same capability set (position,
//! radius, liveness) carried by [`Body`]; the variant-specific fields live in
//! the wrapping structs. The consumption rules are free functions over
//! `Body` so the networked session and the offline bot simulation run the
//! exact same geometry.

use crate::protocol::{PlayerId, Vector2D};
use crate::{FOOD_RADIUS, GROWTH_FACTOR};
use rand::Rng;

/// Immutable world rectangle; every position is clamped into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn clamp(&self, position: Vector2D) -> Vector2D {
        Vector2D {
            x: position.x.clamp(0.0, self.width),
            y: position.y.clamp(0.0, self.height),
        }
    }

    pub fn half_diagonal(&self) -> f32 {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        (hw * hw + hh * hh).sqrt()
    }
}

/// The capability set every entity variant shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vector2D,
    pub radius: f32,
    /// Terminal: once set, every operation on this body is a no-op.
    pub destroyed: bool,
}

impl Body {
    pub fn new(position: Vector2D, radius: f32) -> Self {
        Self {
            position,
            radius,
            destroyed: false,
        }
    }
}

/// A player circle, either the local session's own or a remote one held in
/// the sync manager's registry. `id` is `None` until the server assigns one.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Option<PlayerId>,
    pub body: Body,
    pub color: u32,
    pub username: String,
    pub skin: String,
}

impl Player {
    pub fn new(position: Vector2D, radius: f32, color: u32, username: String, skin: String) -> Self {
        Self {
            id: None,
            body: Body::new(position, radius),
            color,
            username,
            skin,
        }
    }
}

/// A food pellet. No persistent identity: destroy events match on position.
#[derive(Debug, Clone)]
pub struct Food {
    pub body: Body,
    pub color: u32,
}

impl Food {
    pub fn new(position: Vector2D, color: u32) -> Self {
        Self {
            body: Body::new(position, FOOD_RADIUS),
            color,
        }
    }
}

const FOOD_COLORS: [u32; 3] = [0xff0000, 0x0000ff, 0x00ff00];

/// Scatter `amount` pellets uniformly over the world. Used by the offline
/// simulation; the networked session only receives food from the server.
pub fn generate_random_food<R: Rng>(rng: &mut R, amount: usize, bounds: WorldBounds) -> Vec<Food> {
    (0..amount)
        .map(|_| {
            let position = Vector2D::new(
                rng.gen_range(0.0..bounds.width).floor(),
                rng.gen_range(0.0..bounds.height).floor(),
            );
            let color = FOOD_COLORS[rng.gen_range(0..FOOD_COLORS.len())];
            Food::new(position, color)
        })
        .collect()
}

/// Whether `eater` may consume a food pellet at `food`'s position.
///
/// Food is consumable as soon as its center falls inside the eater's circle;
/// the pellet's own radius is ignored.
pub fn can_eat_food(eater: &Body, food: &Body) -> bool {
    if eater.destroyed || food.destroyed {
        return false;
    }

    let distance_squared = eater.position.distance_squared(&food.position);
    distance_squared <= eater.radius * eater.radius
}

/// Whether `eater` may consume another player or bot.
///
/// Requires the prey's center inside the eater's circle AND a strictly
/// larger radius. Equal radii can never eat each other, so there is no
/// mutual-elimination ambiguity: `can_eat(a, b)` and `can_eat(b, a)` are
/// never both true.
pub fn can_eat(eater: &Body, prey: &Body) -> bool {
    if eater.destroyed || prey.destroyed {
        return false;
    }

    let distance_squared = eater.position.distance_squared(&prey.position);
    distance_squared <= eater.radius * eater.radius && eater.radius > prey.radius
}

/// Consume `prey`: grow the eater's surface by the prey's and mark the prey
/// destroyed. The prey's radius is read before any mutation.
pub fn consume(eater: &mut Body, prey: &mut Body) {
    if eater.destroyed || prey.destroyed {
        return;
    }

    let eaten_radius = prey.radius;
    eater.radius = (eater.radius * eater.radius + eaten_radius * eaten_radius).sqrt() * GROWTH_FACTOR;
    prey.destroyed = true;
}
