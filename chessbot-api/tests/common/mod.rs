//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chessbot_api::{
    Actuator, ActuatorError, ClientMessage, Coordinator, LogStoreError, MemoryStore, MoveLogStore,
};
use chessbot_core::{BoardId, Color, Layout, LogEntry, Piece, Square, Transfer};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Default)]
struct Script {
    /// Transfers the robot acknowledged, in order.
    done: Vec<Transfer>,
    /// Outcomes for the next calls; `true` is `Done`. Empty means `Done`.
    outcomes: VecDeque<bool>,
}

/// Robot stand-in that records transfers and fails on request.
#[derive(Clone, Default)]
pub struct ScriptedRobot {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next calls.
    pub fn script(&self, outcomes: &[bool]) {
        self.script.lock().unwrap().outcomes.extend(outcomes);
    }

    /// Every acknowledged transfer so far.
    pub fn done(&self) -> Vec<Transfer> {
        self.script.lock().unwrap().done.clone()
    }

    /// Acknowledged transfers after the first `skip`.
    pub fn done_since(&self, skip: usize) -> Vec<Transfer> {
        self.done().into_iter().skip(skip).collect()
    }
}

impl Actuator for ScriptedRobot {
    fn transfer(&mut self, transfer: Transfer) -> Result<(), ActuatorError> {
        let mut script = self.script.lock().unwrap();
        if script.outcomes.pop_front().unwrap_or(true) {
            script.done.push(transfer);
            Ok(())
        } else {
            Err(ActuatorError::Rejected("Error".to_string()))
        }
    }
}

/// In-memory log whose appends can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyLog {
    inner: MemoryStore,
    /// Outcomes for the next appends; `true` is written. Empty means written.
    appends: Arc<Mutex<VecDeque<bool>>>,
}

impl FlakyLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next appends.
    pub fn script(&self, outcomes: &[bool]) {
        self.appends.lock().unwrap().extend(outcomes);
    }

    pub fn raw(&self, color: Color) -> Vec<String> {
        self.inner.raw(color)
    }
}

impl MoveLogStore for FlakyLog {
    fn append(&mut self, color: Color, entry: &LogEntry) -> Result<(), LogStoreError> {
        if self.appends.lock().unwrap().pop_front().unwrap_or(true) {
            self.inner.append(color, entry)
        } else {
            Err(LogStoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    fn read_all(&mut self, color: Color) -> Result<Vec<LogEntry>, LogStoreError> {
        self.inner.read_all(color)
    }

    fn clear(&mut self) -> Result<(), LogStoreError> {
        self.inner.clear()
    }
}

/// Both physical boards, driven by the transfers the robot acknowledged.
#[derive(Debug)]
pub struct Physical {
    pub board: Layout,
    pub holding: HashMap<u8, Piece>,
}

impl Physical {
    /// The boards after `transfers`, starting from the opening layout.
    /// Panics on a transfer no robot could carry out.
    pub fn after(transfers: &[Transfer]) -> Physical {
        let mut physical = Physical {
            board: Layout::starting(),
            holding: HashMap::new(),
        };
        for &t in transfers {
            physical.transfer(t);
        }
        physical
    }

    fn transfer(&mut self, t: Transfer) {
        let piece = match t.from.board {
            BoardId::Active => self
                .board
                .take(Square::from_linear(u32::from(t.from.pos)).unwrap())
                .unwrap_or_else(|| panic!("{t}: nothing at source")),
            BoardId::Holding => self
                .holding
                .remove(&t.from.pos)
                .unwrap_or_else(|| panic!("{t}: holding slot is empty")),
        };
        match t.to.board {
            BoardId::Active => {
                let to = Square::from_linear(u32::from(t.to.pos)).unwrap();
                assert!(self.board.get(to).is_none(), "{t}: destination is occupied");
                self.board.set(to, Some(piece));
            }
            BoardId::Holding => {
                assert!(self.holding.insert(t.to.pos, piece).is_none(), "{t}: slot taken");
            }
        }
    }

    /// Whether everything stands on its starting square again.
    pub fn is_restored(&self) -> bool {
        self.board == Layout::starting() && self.holding.is_empty()
    }
}

/// Coordinator wired to a scripted robot and a log that can fail writes.
pub fn flaky_coordinator() -> (Coordinator, ScriptedRobot, FlakyLog) {
    let robot = ScriptedRobot::new();
    let log = FlakyLog::new();
    let coordinator = Coordinator::new(Box::new(robot.clone()), Box::new(log.clone()));
    (coordinator, robot, log)
}

/// Coordinator wired to a scripted robot and an in-memory log.
pub fn coordinator() -> (Coordinator, ScriptedRobot, MemoryStore) {
    let robot = ScriptedRobot::new();
    let log = MemoryStore::new();
    let coordinator = Coordinator::new(Box::new(robot.clone()), Box::new(log.clone()));
    (coordinator, robot, log)
}

pub fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

pub fn make_move(from: &str, to: &str) -> ClientMessage {
    ClientMessage::MakeMove {
        pos_start: from.to_string(),
        pos_end: to.to_string(),
        promotion: None,
    }
}
