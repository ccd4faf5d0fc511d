//! Replica tick loop
//!
//! Drains the mailbox at the configured rate, runs the replica pipeline and
//! publishes the result on a watch channel.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::CursorUpdate;
use crate::replication::{CursorEntity, Mailbox, ReplicationStats};

/// Run until `stop` flips to true or its sender goes away
pub(super) async fn run_replica_ticks(
    mut entity: CursorEntity,
    mailbox: Mailbox,
    period: Duration,
    updates: watch::Sender<CursorUpdate>,
    mut stop: watch::Receiver<bool>,
) -> ReplicationStats {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Replica tick loop started ({:?} period)", period);
    let mut tick: u64 = 0;
    let mut last = *updates.borrow();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
        }

        tick += 1;
        let output = match entity.apply_inbox(mailbox.drain()) {
            Ok(output) => output,
            Err(e) => {
                error!("Replica tick failed: {}", e);
                break;
            }
        };

        if let Some(area) = output.action_area {
            info!("Action area now ({:.3}, {:.3})", area.x, area.y);
        }

        let update = CursorUpdate {
            tick,
            position: output.cursor,
            state: output.state,
            action_area: output.action_area.unwrap_or(last.action_area),
        };
        if update.differs_from(&last) {
            if let Some(p) = update.position {
                debug!("Cursor ({:.4}, {:.4}) [{}] at tick {}", p.x, p.y, update.state, tick);
            }
            updates.send_replace(update);
            last = update;
        }
    }

    let stats = entity
        .as_replica()
        .map(|replica| *replica.stats())
        .unwrap_or_default();
    info!("Replica tick loop stopped after {} ticks", tick);
    stats
}
