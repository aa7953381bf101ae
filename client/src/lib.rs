//! # Galaxy Game Client Library
//!
//! Client core for the galaxy arena game: circles on a shared 2D world eat
//! food and smaller circles to grow, and are eliminated by larger ones.
//!
//! ## Architecture Overview
//!
//! The client reconciles locally-predicted state with an authoritative
//! server event stream. Local consumption is applied immediately and
//! *claimed* toward the server; whatever the server says afterwards wins.
//!
//! ### Transport (`transport`)
//! One persistent length-prefixed binary connection. Inbound frames are
//! decoded into typed events and marshalled onto the session's tick loop;
//! outbound operations are fire-and-forget. Connection loss triggers a
//! bounded number of reconnection attempts, after which the transport stays
//! permanently disconnected.
//!
//! ### Synchronization Manager (`sync`)
//! The protocol state machine. Owns the identity-keyed remote-player
//! registry and the food list, performs the join handshake, applies each
//! inbound event to the entity model, and suppresses redundant outbound
//! movement traffic.
//!
//! ### Bot Decision Loop (`bot`)
//! Per-tick target acquisition (largest prey in sensor range) and steering
//! for autonomous agents. Pure over world state; no network dependency.
//!
//! ### Game Orchestration (`game`)
//! Thin tick driver for the two deployment modes: a networked session, or a
//! single-player world populated with bots. The modes never mix.

pub mod bot;
pub mod game;
pub mod sync;
pub mod transport;
