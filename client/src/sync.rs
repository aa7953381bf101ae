//! Protocol state machine reconciling server events with local state.
//!
//! One `SyncManager` per session owns the remote-player and food registries;
//! nothing here is global, so several sessions (or tests) can coexist.
//! Inbound events mutate the registries synchronously; outbound operations
//! are suppressed until the join handshake completes and, for movement,
//! rate-limited by distance travelled.

use crate::transport::{OperationSink, TransportError};
use log::{debug, info, warn};
use shared::entity::{Food, Player, WorldBounds};
use shared::protocol::{Event, Operation, PlayerId, Vector2D};
use shared::MOVE_SEND_THRESHOLD;
use std::collections::HashMap;

/// Session lifecycle. `Eliminated` and `Paused` are terminal: no operation
/// leaves the client afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    AwaitingJoinAck,
    Joined,
    Eliminated,
    Paused,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Eliminated | SessionState::Paused)
    }
}

pub struct SyncManager {
    state: SessionState,
    /// Identity offered in the Join operation; the server may assign a
    /// different one in the ack.
    identity: PlayerId,
    game_id: String,
    bounds: WorldBounds,
    pub local: Player,
    pub players: HashMap<PlayerId, Player>,
    pub foods: Vec<Food>,
    last_sent: Option<Vector2D>,
}

impl SyncManager {
    pub fn new(
        bounds: WorldBounds,
        identity: PlayerId,
        username: String,
        skin: String,
        color: u32,
        game_id: String,
    ) -> Self {
        let local = Player::new(Vector2D::default(), 0.0, color, username, skin);
        Self {
            state: SessionState::Disconnected,
            identity,
            game_id,
            bounds,
            local,
            players: HashMap::new(),
            foods: Vec::new(),
            last_sent: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Join handshake, step one: offer our identity and wait for the ack.
    /// Until it arrives every other operation type stays suppressed.
    pub fn on_connected(&mut self, sink: &mut dyn OperationSink) -> Result<(), TransportError> {
        if self.state.is_terminal() {
            return Ok(());
        }

        sink.send_operation(&Operation::Join {
            player_id: self.identity,
            username: self.local.username.clone(),
            color: self.local.color,
            skin: self.local.skin.clone(),
            game_id: self.game_id.clone(),
        })?;
        self.state = SessionState::AwaitingJoinAck;
        Ok(())
    }

    pub fn on_disconnected(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Disconnected;
        }
    }

    /// Applies one server event. Mutations are visible to the next tick;
    /// events referencing unknown ids are tolerated because spawn/destroy
    /// ordering races are expected under latency.
    pub fn handle_event(&mut self, event: Event) {
        if self.state.is_terminal() {
            return;
        }

        match event {
            Event::Join {
                player_id,
                position,
                radius,
                color,
                skin,
            } => self.handle_join_ack(player_id, position, radius, color, skin),
            Event::NewPlayer {
                player_id,
                position,
                radius,
                color,
                skin,
                username,
            } => self.handle_new_player(player_id, position, radius, color, skin, username),
            Event::PlayerMove {
                player_id,
                position,
            } => self.handle_player_move(player_id, position),
            Event::NewFood { position, color } => {
                self.foods.push(Food::new(position, color));
            }
            Event::PlayerGrow { player_id, radius } => self.handle_player_grow(player_id, radius),
            Event::DestroyFood { position } => self.handle_destroy_food(position),
            Event::DestroyPlayer { player_id } => self.handle_destroy_player(player_id),
            Event::Pause => {
                info!("Session paused");
                self.state = SessionState::Paused;
            }
        }
    }

    fn is_local(&self, player_id: &PlayerId) -> bool {
        self.local.id.as_ref() == Some(player_id)
    }

    fn handle_join_ack(
        &mut self,
        player_id: PlayerId,
        position: Vector2D,
        radius: f32,
        color: u32,
        skin: String,
    ) {
        // Server is authoritative for spawn state; adopt it verbatim.
        self.local.id = Some(player_id);
        self.local.body.position = position;
        self.local.body.radius = radius;
        self.local.color = color;
        self.local.skin = skin;
        self.state = SessionState::Joined;
        info!("Joined as {} at ({}, {})", player_id, position.x, position.y);
    }

    fn handle_new_player(
        &mut self,
        player_id: PlayerId,
        position: Vector2D,
        radius: f32,
        color: u32,
        skin: String,
        username: String,
    ) {
        if self.is_local(&player_id) {
            return;
        }

        // Duplicate spawn overwrites; the stale entry is destroyed first so
        // nothing keeps consuming it.
        if let Some(mut old) = self.players.remove(&player_id) {
            warn!("Duplicate spawn for {}, replacing", player_id);
            old.body.destroyed = true;
        }

        let mut player = Player::new(self.bounds.clamp(position), radius, color, username, skin);
        player.id = Some(player_id);
        self.players.insert(player_id, player);
        debug!("New player {} ({} remote)", player_id, self.players.len());
    }

    fn handle_player_move(&mut self, player_id: PlayerId, position: Vector2D) {
        let position = self.bounds.clamp(position);
        if self.is_local(&player_id) {
            self.local.body.position = position;
        } else if let Some(player) = self.players.get_mut(&player_id) {
            player.body.position = position;
        } else {
            // Not yet spawned or already destroyed; not an error.
            debug!("Move for unknown player {}", player_id);
        }
    }

    fn handle_player_grow(&mut self, player_id: PlayerId, radius: f32) {
        if self.is_local(&player_id) {
            self.local.body.radius = radius;
        } else if let Some(player) = self.players.get_mut(&player_id) {
            player.body.radius = radius;
        } else {
            debug!("Grow for unknown player {}", player_id);
        }
    }

    fn handle_destroy_food(&mut self, position: Vector2D) {
        // Food has no wire identity; first exact position match wins.
        // Absence means we already removed it locally.
        if let Some(index) = self
            .foods
            .iter()
            .position(|f| f.body.position == position)
        {
            let mut food = self.foods.remove(index);
            food.body.destroyed = true;
        }
    }

    fn handle_destroy_player(&mut self, player_id: PlayerId) {
        if self.is_local(&player_id) {
            info!("Eliminated by the server");
            self.local.body.destroyed = true;
            self.state = SessionState::Eliminated;
        } else if let Some(mut player) = self.players.remove(&player_id) {
            player.body.destroyed = true;
        }
    }

    /// Marks the local player dead without waiting for the server event.
    pub fn eliminate_local(&mut self) {
        self.local.body.destroyed = true;
        self.state = SessionState::Eliminated;
    }

    /// Sends a Move unless the target is within [`MOVE_SEND_THRESHOLD`] of
    /// the last sent position. Coordinates are floored on the wire.
    pub fn send_movement(
        &mut self,
        sink: &mut dyn OperationSink,
        x: f32,
        y: f32,
    ) -> Result<(), TransportError> {
        if self.state != SessionState::Joined {
            return Ok(());
        }

        let candidate = Vector2D::new(x.floor(), y.floor());
        if let Some(last) = self.last_sent {
            if candidate.distance(&last) < MOVE_SEND_THRESHOLD {
                return Ok(());
            }
        }

        sink.send_operation(&Operation::Move {
            position: candidate,
        })?;
        self.last_sent = Some(candidate);
        Ok(())
    }

    /// Claims a food consumption. The server stream stays authoritative and
    /// may override later.
    pub fn send_eat_food(
        &mut self,
        sink: &mut dyn OperationSink,
        food_position: Vector2D,
        new_radius: f32,
    ) -> Result<(), TransportError> {
        if self.state != SessionState::Joined {
            return Ok(());
        }

        sink.send_operation(&Operation::EatFood {
            food_position,
            new_radius: new_radius as i32,
        })
    }

    pub fn send_eat_player(
        &mut self,
        sink: &mut dyn OperationSink,
        player_eaten: PlayerId,
        new_radius: f32,
    ) -> Result<(), TransportError> {
        if self.state != SessionState::Joined {
            return Ok(());
        }

        sink.send_operation(&Operation::EatPlayer {
            player_eaten,
            new_radius: new_radius as i32,
        })
    }

    pub fn send_leave(&mut self, sink: &mut dyn OperationSink) -> Result<(), TransportError> {
        if self.state != SessionState::Joined {
            return Ok(());
        }
        sink.send_operation(&Operation::Leave)
    }

    pub fn send_pause(&mut self, sink: &mut dyn OperationSink) -> Result<(), TransportError> {
        if self.state != SessionState::Joined {
            return Ok(());
        }
        sink.send_operation(&Operation::Pause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH};

    struct RecordingSink {
        ops: Vec<Operation>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { ops: Vec::new() }
        }
    }

    impl OperationSink for RecordingSink {
        fn send_operation(&mut self, op: &Operation) -> Result<(), TransportError> {
            self.ops.push(op.clone());
            Ok(())
        }
    }

    fn manager() -> SyncManager {
        SyncManager::new(
            WorldBounds::new(DEFAULT_WORLD_WIDTH, DEFAULT_WORLD_HEIGHT),
            PlayerId([9; 16]),
            "tester".to_string(),
            "default".to_string(),
            0xffffff,
            String::new(),
        )
    }

    fn joined_manager(sink: &mut RecordingSink) -> SyncManager {
        let mut sync = manager();
        sync.on_connected(sink).unwrap();
        sync.handle_event(Event::Join {
            player_id: PlayerId([1; 16]),
            position: Vector2D::new(5000.0, 5000.0),
            radius: 30.0,
            color: 0xffffff,
            skin: "default".to_string(),
        });
        sink.ops.clear();
        sync
    }

    #[test]
    fn test_handshake_sequencing() {
        let mut sink = RecordingSink::new();
        let mut sync = manager();

        sync.on_connected(&mut sink).unwrap();
        assert_eq!(sync.state(), SessionState::AwaitingJoinAck);
        assert!(matches!(sink.ops[0], Operation::Join { .. }));

        // Movement before the ack must not reach the wire.
        sync.send_movement(&mut sink, 100.0, 100.0).unwrap();
        assert_eq!(sink.ops.len(), 1);

        sync.handle_event(Event::Join {
            player_id: PlayerId([1; 16]),
            position: Vector2D::new(5000.0, 5000.0),
            radius: 30.0,
            color: 0xabcdef,
            skin: "nebula".to_string(),
        });

        assert_eq!(sync.state(), SessionState::Joined);
        assert_eq!(sync.local.id, Some(PlayerId([1; 16])));
        assert_eq!(sync.local.body.position, Vector2D::new(5000.0, 5000.0));
        assert_eq!(sync.local.body.radius, 30.0);
        assert_eq!(sync.local.color, 0xabcdef);
    }

    #[test]
    fn test_movement_send_suppression() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);

        sync.send_movement(&mut sink, 100.0, 100.0).unwrap();
        // 3 units away: inside the 5-unit threshold, suppressed.
        sync.send_movement(&mut sink, 103.0, 100.0).unwrap();
        assert_eq!(sink.ops.len(), 1);

        // 6 units away: goes out.
        sync.send_movement(&mut sink, 100.0, 106.0).unwrap();
        assert_eq!(sink.ops.len(), 2);
    }

    #[test]
    fn test_movement_coordinates_are_floored() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);

        sync.send_movement(&mut sink, 100.9, 200.7).unwrap();
        match &sink.ops[0] {
            Operation::Move { position } => {
                assert_eq!(*position, Vector2D::new(100.0, 200.0));
            }
            other => panic!("expected Move, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_player_lifecycle() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let rival = PlayerId([2; 16]);

        sync.handle_event(Event::NewPlayer {
            player_id: rival,
            position: Vector2D::new(100.0, 100.0),
            radius: 25.0,
            color: 0xff0000,
            skin: String::new(),
            username: "rival".to_string(),
        });
        assert_eq!(sync.players.len(), 1);

        sync.handle_event(Event::PlayerMove {
            player_id: rival,
            position: Vector2D::new(150.0, 100.0),
        });
        assert_eq!(
            sync.players[&rival].body.position,
            Vector2D::new(150.0, 100.0)
        );

        sync.handle_event(Event::PlayerGrow {
            player_id: rival,
            radius: 40.0,
        });
        assert_eq!(sync.players[&rival].body.radius, 40.0);

        sync.handle_event(Event::DestroyPlayer { player_id: rival });
        assert!(sync.players.is_empty());
        assert_eq!(sync.state(), SessionState::Joined);
    }

    #[test]
    fn test_duplicate_spawn_overwrites() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let rival = PlayerId([2; 16]);

        for radius in [25.0, 33.0] {
            sync.handle_event(Event::NewPlayer {
                player_id: rival,
                position: Vector2D::new(100.0, 100.0),
                radius,
                color: 0,
                skin: String::new(),
                username: "rival".to_string(),
            });
        }

        assert_eq!(sync.players.len(), 1);
        assert_eq!(sync.players[&rival].body.radius, 33.0);
    }

    #[test]
    fn test_move_for_unknown_player_is_ignored() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);

        sync.handle_event(Event::PlayerMove {
            player_id: PlayerId([200; 16]),
            position: Vector2D::new(1.0, 1.0),
        });
        sync.handle_event(Event::PlayerGrow {
            player_id: PlayerId([200; 16]),
            radius: 99.0,
        });

        assert!(sync.players.is_empty());
        assert_eq!(sync.state(), SessionState::Joined);
    }

    #[test]
    fn test_destroy_food_is_idempotent() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let position = Vector2D::new(10.0, 20.0);

        sync.handle_event(Event::NewFood {
            position,
            color: 0xff0000,
        });
        assert_eq!(sync.foods.len(), 1);

        sync.handle_event(Event::DestroyFood { position });
        assert!(sync.foods.is_empty());

        // Second destroy for the same position: no-op, no panic.
        sync.handle_event(Event::DestroyFood { position });
        assert!(sync.foods.is_empty());
    }

    #[test]
    fn test_destroy_food_removes_first_match_only() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let position = Vector2D::new(10.0, 20.0);

        // Two pellets sharing a position is the documented fragile case of
        // position-keyed food identity; only one entry may go per event.
        for color in [0xff0000, 0x0000ff] {
            sync.handle_event(Event::NewFood { position, color });
        }

        sync.handle_event(Event::DestroyFood { position });
        assert_eq!(sync.foods.len(), 1);
        assert_eq!(sync.foods[0].color, 0x0000ff);
    }

    #[test]
    fn test_self_destroy_is_terminal() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let self_id = sync.local.id.unwrap();

        sync.handle_event(Event::DestroyPlayer { player_id: self_id });
        assert_eq!(sync.state(), SessionState::Eliminated);
        assert!(sync.local.body.destroyed);

        // Destroyed is sticky and no operation leaves an eliminated session.
        sync.send_movement(&mut sink, 9999.0, 9999.0).unwrap();
        sync.send_leave(&mut sink).unwrap();
        assert!(sink.ops.is_empty());
        assert!(sync.local.body.destroyed);
    }

    #[test]
    fn test_pause_is_terminal() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);

        sync.handle_event(Event::Pause);
        assert_eq!(sync.state(), SessionState::Paused);

        sync.send_pause(&mut sink).unwrap();
        assert!(sink.ops.is_empty());
    }

    #[test]
    fn test_eat_food_truncates_radius() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);

        sync.send_eat_food(&mut sink, Vector2D::new(1.0, 2.0), 36.007)
            .unwrap();
        match &sink.ops[0] {
            Operation::EatFood { new_radius, .. } => assert_eq!(*new_radius, 36),
            other => panic!("expected EatFood, got {:?}", other),
        }
    }

    #[test]
    fn test_spawn_for_self_is_ignored() {
        let mut sink = RecordingSink::new();
        let mut sync = joined_manager(&mut sink);
        let self_id = sync.local.id.unwrap();

        sync.handle_event(Event::NewPlayer {
            player_id: self_id,
            position: Vector2D::new(0.0, 0.0),
            radius: 1.0,
            color: 0,
            skin: String::new(),
            username: String::new(),
        });

        assert!(sync.players.is_empty());
        assert_eq!(sync.local.body.radius, 30.0);
    }
}
