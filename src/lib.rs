//! # cursor-timeline
//!
//! Gyroscopic shared cursor: one device's attitude drives a cursor that
//! every participant computes locally.
//!
//! # Architecture
//!
//! ```text
//! cursor-timeline
//!   ├─> input        (orientation sources, touch events, pointer normalization)
//!   ├─> orientation  (calibration, ray/plane projection)
//!   ├─> cursor       (smoothing windows, Normal/Focus state, action area)
//!   ├─> protocol     (snapshots, commands, wire frames and codec)
//!   ├─> replication  (owner/replica entities, mailbox, transport seam)
//!   └─> server       (TCP hub, controller and observer clients)
//! ```
//!
//! # Data Flow
//!
//! **Owner Path:** sensor → Snapshot { session, seq, orientation, pointer } → Transport
//!
//! **Replica Path:** Mailbox → calibrate → project → smooth → cursor
//!
//! **Command Path:** touch gesture → Command { seq } → Transport → replica state

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration
pub mod config;

/// Cursor state, smoothing and action area
pub mod cursor;

/// Sensor and touch input
pub mod input;

/// Calibration and projection
pub mod orientation;

/// Wire messages
pub mod protocol;

/// Owner/replica replication
pub mod replication;

/// Hub and clients
pub mod server;

/// Utility functions
pub mod utils;
