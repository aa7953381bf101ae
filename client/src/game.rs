//! Tick orchestration for the two deployment modes.
//!
//! [`OnlineSession`] drives a networked session: one `tokio::select!` loop
//! interleaves inbound server events with a fixed tick, so registries are
//! only ever touched from one logical thread. [`OfflineGame`] is the
//! single-player variant: local food, local bots, no transport at all.

use crate::bot::{find_largest_prey, steer, Bot};
use crate::sync::{SessionState, SyncManager};
use crate::transport::{Transport, TransportSignal};
use log::{info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use shared::entity::{can_eat, can_eat_food, consume, generate_random_food, Food, Player, WorldBounds};
use shared::protocol::{PlayerId, Vector2D};
use std::time::Duration;
use tokio::time::{interval, sleep};

/// Reference rectangle for steering-speed normalization. The browser client
/// used the visible screen; headless we fix a common viewport.
const VIEW_REFERENCE: WorldBounds = WorldBounds {
    width: 1920.0,
    height: 1080.0,
};

const TICK_INTERVAL: Duration = Duration::from_millis(16);

pub struct OnlineSession {
    transport: Transport,
    sync: SyncManager,
    /// Headless demo steering: chase prey like a bot instead of a cursor.
    autopilot: bool,
}

impl OnlineSession {
    pub fn new(transport: Transport, sync: SyncManager, autopilot: bool) -> Self {
        Self {
            transport,
            sync,
            autopilot,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn state(&self) -> SessionState {
        self.sync.state()
    }

    /// Runs until elimination, pause, or the reconnect budget is spent.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connect_with_retry().await {
            return Ok(());
        }

        let mut tick = interval(TICK_INTERVAL);

        loop {
            if self.sync.state().is_terminal() {
                info!("Session ended: {:?}", self.sync.state());
                break;
            }

            tokio::select! {
                signal = self.transport.recv() => match signal {
                    TransportSignal::Event(event) => self.sync.handle_event(event),
                    TransportSignal::Closed => {
                        warn!("Connection lost");
                        self.sync.on_disconnected();
                        if !self.connect_with_retry().await {
                            info!("Reconnect budget exhausted, staying offline");
                            break;
                        }
                    }
                },
                _ = tick.tick() => self.tick(),
            }
        }

        // Fire-and-forget; a dead channel at this point is fine.
        let _ = self.sync.send_leave(&mut self.transport);
        self.transport.close();
        Ok(())
    }

    async fn connect_with_retry(&mut self) -> bool {
        loop {
            match self.transport.connect().await {
                Ok(()) if self.transport.is_connected() => {
                    if let Err(e) = self.sync.on_connected(&mut self.transport) {
                        warn!("Join send failed: {}", e);
                    }
                    return true;
                }
                Ok(()) => return false, // transport was explicitly closed
                Err(e) => warn!("Connect failed: {}", e),
            }

            match self.transport.next_reconnect_delay() {
                Some(delay) => sleep(delay).await,
                None => return false,
            }
        }
    }

    /// One game tick: steer, then claim whatever the local circle overlaps.
    fn tick(&mut self) {
        if self.sync.state() != SessionState::Joined {
            return;
        }

        if self.autopilot {
            self.steer_autopilot();
        }

        self.consume_food();
        self.consume_players();
        self.check_elimination();
    }

    fn steer_autopilot(&mut self) {
        let target = find_largest_prey(
            &self.sync.local.body,
            self.sync.foods.iter().map(|f| &f.body),
            [],
            self.sync.players.values().map(|p| &p.body),
        );

        if let Some(target) = target {
            let bounds = self.sync.bounds();
            steer(&mut self.sync.local.body, &bounds, VIEW_REFERENCE, target);
            let position = self.sync.local.body.position;
            if let Err(e) = self
                .sync
                .send_movement(&mut self.transport, position.x, position.y)
            {
                warn!("Move send failed: {}", e);
            }
        }
    }

    fn consume_food(&mut self) {
        loop {
            let local = self.sync.local.body;
            let eaten = self
                .sync
                .foods
                .iter()
                .position(|food| can_eat_food(&local, &food.body));

            let Some(index) = eaten else { break };
            let mut food = self.sync.foods.remove(index);
            let position = food.body.position;
            consume(&mut self.sync.local.body, &mut food.body);

            let new_radius = self.sync.local.body.radius;
            if let Err(e) = self
                .sync
                .send_eat_food(&mut self.transport, position, new_radius)
            {
                warn!("EatFood send failed: {}", e);
            }
        }
    }

    fn consume_players(&mut self) {
        let local = self.sync.local.body;
        let prey_ids: Vec<PlayerId> = self
            .sync
            .players
            .iter()
            .filter(|(_, player)| can_eat(&local, &player.body))
            .map(|(id, _)| *id)
            .collect();

        for id in prey_ids {
            let Some(mut prey) = self.sync.players.remove(&id) else {
                continue;
            };
            consume(&mut self.sync.local.body, &mut prey.body);

            let new_radius = self.sync.local.body.radius;
            if let Err(e) = self.sync.send_eat_player(&mut self.transport, id, new_radius) {
                warn!("EatPlayer send failed: {}", e);
            }
        }
    }

    /// Local elimination detection: if a live remote can already eat us, end
    /// the session now rather than waiting for the DestroyPlayer event.
    fn check_elimination(&mut self) {
        let local = self.sync.local.body;
        let winner = self
            .sync
            .players
            .values()
            .find(|player| can_eat(&player.body, &local))
            .map(|player| player.username.clone());

        if let Some(name) = winner {
            info!("Eliminated by {}", name);
            self.sync.eliminate_local();
        }
    }
}

/// Single-player mode with autonomous bots; never touches the network.
pub struct OfflineGame {
    bounds: WorldBounds,
    pub player: Player,
    pub bots: Vec<Bot>,
    pub foods: Vec<Food>,
    food_target: usize,
    rng: ThreadRng,
}

impl OfflineGame {
    pub fn new(bounds: WorldBounds, player: Player, bot_count: usize, food_count: usize) -> Self {
        let mut rng = rand::thread_rng();
        let foods = generate_random_food(&mut rng, food_count, bounds);
        let bots = (0..bot_count)
            .map(|_| {
                let position = Vector2D::new(
                    rng.gen_range(0.0..bounds.width),
                    rng.gen_range(0.0..bounds.height),
                );
                Bot::new(bounds, position, rng.gen_range(20.0..45.0), 0x888888)
            })
            .collect();

        Self {
            bounds,
            player,
            bots,
            foods,
            food_target: food_count,
            rng,
        }
    }

    pub fn player_alive(&self) -> bool {
        !self.player.body.destroyed
    }

    /// One frame: bot decisions, then consumption, then food replenishment.
    pub fn tick(&mut self) {
        self.steer_bots();
        self.resolve_bot_meals();
        self.resolve_player_meals();
        self.sweep_destroyed();
        self.replenish_food();
    }

    fn steer_bots(&mut self) {
        let food_bodies: Vec<_> = self.foods.iter().map(|f| f.body).collect();
        let bot_bodies: Vec<_> = self.bots.iter().map(|b| b.body).collect();
        let player_body = self.player.body;

        for (index, bot) in self.bots.iter_mut().enumerate() {
            if bot.body.destroyed {
                continue;
            }

            let others = bot_bodies
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, body)| body);
            let players = (!player_body.destroyed).then_some(&player_body);

            let target = bot
                .find_target(food_bodies.iter(), others, players)
                .unwrap_or_else(|| bot.wander_target(&mut self.rng));
            bot.step_towards(VIEW_REFERENCE, target);
        }
    }

    fn resolve_bot_meals(&mut self) {
        for index in 0..self.bots.len() {
            // Food pass for this bot.
            for food in &mut self.foods {
                if can_eat_food(&self.bots[index].body, &food.body) {
                    consume(&mut self.bots[index].body, &mut food.body);
                }
            }

            // Other bots, then the player.
            for other in 0..self.bots.len() {
                if other == index {
                    continue;
                }
                let (eater, prey) = pair_mut(&mut self.bots, index, other);
                if can_eat(&eater.body, &prey.body) {
                    consume(&mut eater.body, &mut prey.body);
                }
            }

            if can_eat(&self.bots[index].body, &self.player.body) {
                consume(&mut self.bots[index].body, &mut self.player.body);
            }
        }
    }

    fn resolve_player_meals(&mut self) {
        for food in &mut self.foods {
            if can_eat_food(&self.player.body, &food.body) {
                consume(&mut self.player.body, &mut food.body);
            }
        }
        for bot in &mut self.bots {
            if can_eat(&self.player.body, &bot.body) {
                consume(&mut self.player.body, &mut bot.body);
            }
        }
    }

    fn sweep_destroyed(&mut self) {
        self.foods.retain(|food| !food.body.destroyed);
        self.bots.retain(|bot| !bot.body.destroyed);
    }

    fn replenish_food(&mut self) {
        if self.foods.len() < self.food_target {
            let missing = self.food_target - self.foods.len();
            self.foods
                .extend(generate_random_food(&mut self.rng, missing, self.bounds));
        }
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
