//! Game worker: runs the coordinator on its own thread.
//!
//! Robot and log calls block, so the coordinator lives on a dedicated OS
//! thread and the async connection tasks talk to it over a channel. Every
//! event is handled to completion before the next one is taken, which keeps
//! robot commands strictly serialized across both players.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::coordinator::{Coordinator, Delivery, Event, Snapshot};
use crate::protocol::Outbound;
use crate::session::ConnId;

enum Command {
    Connect {
        conn: ConnId,
        outbox: mpsc::UnboundedSender<Outbound>,
    },
    Event(Event),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Cheap, cloneable handle to the game worker.
#[derive(Clone)]
pub struct GameHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_conn: Arc<AtomicU64>,
}

impl GameHandle {
    /// Fresh connection id.
    pub fn next_conn_id(&self) -> ConnId {
        self.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a connection; its messages arrive on `outbox`.
    pub fn connect(&self, conn: ConnId, outbox: mpsc::UnboundedSender<Outbound>) {
        let _ = self.commands.send(Command::Connect { conn, outbox });
    }

    pub fn send(&self, event: Event) {
        let _ = self.commands.send(Command::Event(event));
    }

    /// Current match state, or `None` if the worker has stopped.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Snapshot(tx)).ok()?;
        rx.await.ok()
    }
}

/// Start the worker thread. It stops once every handle is dropped.
pub fn spawn(coordinator: Coordinator) -> std::io::Result<(GameHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let join = thread::Builder::new()
        .name("game-worker".to_string())
        .spawn(move || run(coordinator, rx))?;
    let handle = GameHandle {
        commands: tx,
        next_conn: Arc::new(AtomicU64::new(1)),
    };
    Ok((handle, join))
}

fn run(mut coordinator: Coordinator, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut outboxes: HashMap<ConnId, mpsc::UnboundedSender<Outbound>> = HashMap::new();

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::Connect { conn, outbox } => {
                outboxes.insert(conn, outbox);
                let deliveries = coordinator.handle(Event::Connected(conn));
                dispatch(&mut outboxes, deliveries);
            }
            Command::Event(event) => {
                let gone = match event {
                    Event::Disconnected(conn) => Some(conn),
                    _ => None,
                };
                let deliveries = coordinator.handle(event);
                dispatch(&mut outboxes, deliveries);
                if let Some(conn) = gone {
                    outboxes.remove(&conn);
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(coordinator.snapshot());
            }
        }
    }

    info!("Game worker stopping");
    coordinator.shutdown();
}

fn dispatch(outboxes: &mut HashMap<ConnId, mpsc::UnboundedSender<Outbound>>, deliveries: Vec<Delivery>) {
    for Delivery { to, outbound } in deliveries {
        let closing = outbound == Outbound::Close;
        match outboxes.get(&to) {
            Some(outbox) => {
                if outbox.send(outbound).is_err() {
                    debug!(conn = to, "Connection already gone");
                }
            }
            None => debug!(conn = to, "No outbox for connection"),
        }
        if closing {
            outboxes.remove(&to);
        }
    }
}
