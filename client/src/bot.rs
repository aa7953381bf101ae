//! Autonomous agent targeting and steering.
//!
//! Runs every tick with no network dependency: target acquisition is a pure
//! scan over world state, steering only mutates the bot's own position.

use rand::Rng;
use shared::entity::{Body, WorldBounds};
use shared::protocol::Vector2D;
use shared::BOT_SENSOR_RANGE;

/// Below this remaining distance the bot stops moving, so it does not
/// jitter around its destination.
const DEAD_ZONE: f32 = 3.0;

const BASE_SPEED: f32 = 10.0;

pub struct Bot {
    pub body: Body,
    pub color: u32,
    world: WorldBounds,
}

impl Bot {
    pub fn new(world: WorldBounds, position: Vector2D, radius: f32, color: u32) -> Self {
        Self {
            body: Body::new(world.clamp(position), radius),
            color,
            world,
        }
    }

    /// Picks the largest consumable target in sensor range: any live food,
    /// plus strictly smaller bots and players. Scan order (foods, bots,
    /// players, each in container order) breaks radius ties first-wins.
    pub fn find_target<'a>(
        &self,
        foods: impl IntoIterator<Item = &'a Body>,
        bots: impl IntoIterator<Item = &'a Body>,
        players: impl IntoIterator<Item = &'a Body>,
    ) -> Option<Vector2D> {
        find_largest_prey(&self.body, foods, bots, players)
    }

    /// Fallback steering point while nothing is in range; re-rolled every
    /// tick until a real target appears.
    pub fn wander_target<R: Rng>(&self, rng: &mut R) -> Vector2D {
        Vector2D::new(
            rng.gen_range(0.0..self.world.width),
            rng.gen_range(0.0..self.world.height),
        )
    }

    /// Steps toward `target`, staying inside world bounds.
    pub fn step_towards(&mut self, view: WorldBounds, target: Vector2D) {
        steer(&mut self.body, &self.world, view, target);
    }
}

/// Shared target scan; also drives the headless autopilot for the local
/// player in demo mode.
pub fn find_largest_prey<'a>(
    hunter: &Body,
    foods: impl IntoIterator<Item = &'a Body>,
    bots: impl IntoIterator<Item = &'a Body>,
    players: impl IntoIterator<Item = &'a Body>,
) -> Option<Vector2D> {
    let range_squared = BOT_SENSOR_RANGE * BOT_SENSOR_RANGE;
    let in_range =
        |candidate: &Body| hunter.position.distance_squared(&candidate.position) < range_squared;

    let mut best: Option<(f32, Vector2D)> = None;
    let mut consider = |candidate: &Body| {
        if candidate.destroyed || !in_range(candidate) {
            return;
        }
        // Strictly-larger keeps the first encountered on ties.
        if best.map_or(true, |(radius, _)| candidate.radius > radius) {
            best = Some((candidate.radius, candidate.position));
        }
    };

    for food in foods {
        consider(food);
    }
    for bot in bots {
        if bot.radius < hunter.radius {
            consider(bot);
        }
    }
    for player in players {
        if player.radius < hunter.radius {
            consider(player);
        }
    }

    best.map(|(_, position)| position)
}

/// Moves `body` toward `target` at a speed that saturates with distance and
/// shrinks with size: velocity scales with distance normalized against half
/// the diagonal of `view`, divided by `(max(radius, 40) / 80) ^ 0.3`, with a
/// boost capped at +40% once the effective radius passes 80.
pub fn steer(body: &mut Body, world: &WorldBounds, view: WorldBounds, target: Vector2D) {
    if body.destroyed {
        return;
    }

    let dx = target.x - body.position.x;
    let dy = target.y - body.position.y;
    let delta = (dx * dx + dy * dy).sqrt();
    if delta <= DEAD_ZONE {
        return;
    }

    let normalized_distance = ((delta / view.half_diagonal()) * 2.0).min(1.0);
    let effective_radius = body.radius.max(40.0);
    let boost = ((effective_radius - 80.0) / 300.0).min(0.4);
    let velocity =
        normalized_distance * BASE_SPEED * (1.0 + boost) / (effective_radius / 80.0).powf(0.3);

    body.position.x += (dx / delta) * velocity;
    body.position.y += (dy / delta) * velocity;
    body.position = world.clamp(body.position);
}
