//! Session Coordinator: one match, two players, one robot.
//!
//! The coordinator is a plain state machine. It consumes [`Event`]s and
//! returns the [`Delivery`]s to write back, so the same code runs under
//! the WebSocket worker and in tests. Robot and log calls are blocking and
//! happen inline; nothing else is processed while a move is in flight.
//!
//! Make-move order:
//!
//! ```text
//! resolve move ──illegal──> error to mover (no robot call, no log write)
//!      │
//!      ├─ capture?  robot: board1 square -> board2 slot   log: {sq}-{slot}-{victim}-1
//!      ├─ robot: from -> to                               log: {from}-{to}-{mover}-0
//!      ├─ commit board, flip turn
//!      ├─ castling? robot: rook corner -> rook target     log: {corner}-{target}-{mover}-R-0
//!      └─ broadcast update_game_state
//! ```
//!
//! An entry is only written after its transfer went through. When the write
//! itself fails, the transfer is taken back on the robot. Anything that
//! leaves the robot's board differing from a finished move marks the match
//! out of sync until recovery runs.

use chessbot_core::{BoardModel, Color, MoveRequest, Role, Square, Transfer};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::error::{LogStoreError, ProtocolError, RecoveryFailure};
use crate::move_log::MoveLogStore;
use crate::protocol::{BoardState, ClientMessage, Outbound, ServerMessage};
use crate::recovery::{recover, RecoveryReport};
use crate::session::{ConnId, Player, Session, SessionState};

pub const NOT_STARTED: &str = "The game has not started yet";
pub const NOT_YOUR_TURN: &str = "It is not your turn";
pub const INVALID_SQUARES: &str = "Invalid fields pos_start and pos_end. Please try again.";
pub const INVALID_PROMOTION: &str = "Invalid promotion piece";
pub const ILLEGAL_MOVE: &str = "Illegal move";
pub const GAME_OVER: &str = "The game is over";
pub const ROBOT_FAILED: &str = "The robot failed to make a move";
pub const OUT_OF_SYNC: &str =
    "The board is out of sync with the robot; reset the board or reconnect to recover";
pub const NOT_RECORDED: &str = "The move could not be recorded and was taken back";
pub const OPPONENT_LEFT: &str = "Your opponent disconnected; the session has been reset";
pub const RECOVERY_FAILED: &str = "Board recovery failed; check the robot";

/// Input to the coordinator.
#[derive(Clone, Debug)]
pub enum Event {
    Connected(ConnId),
    Disconnected(ConnId),
    Request(ConnId, ClientMessage),
    Malformed(ConnId, ProtocolError),
}

/// One message for one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnId,
    pub outbound: Outbound,
}

impl Delivery {
    pub fn message(to: ConnId, message: ServerMessage) -> Self {
        Delivery {
            to,
            outbound: Outbound::Message(message),
        }
    }

    pub fn close(to: ConnId) -> Self {
        Delivery {
            to,
            outbound: Outbound::Close,
        }
    }
}

/// Read-only view of the match for the HTTP status endpoint.
#[derive(Serialize, Clone, Debug)]
pub struct Snapshot {
    pub state: SessionState,
    pub players: usize,
    pub active: bool,
    pub board_state: BoardState,
    pub player_color: Color,
    pub holding_counter: u8,
    pub game_over: bool,
    pub desynchronized: bool,
}

/// Why a physical move stopped.
enum MoveFailure {
    /// Nothing moved; state is as before.
    Clean,
    /// Some pieces moved; the robot's board no longer matches ours.
    Partial,
}

/// The single match of this process.
pub struct Coordinator {
    session: Session,
    board: BoardModel,
    /// Last board-2 slot handed out; 0 means none.
    holding_counter: u8,
    /// Set after a half-finished move; cleared by recovery.
    desynced: bool,
    actuator: Box<dyn Actuator>,
    log: Box<dyn MoveLogStore>,
}

impl Coordinator {
    pub fn new(actuator: Box<dyn Actuator>, log: Box<dyn MoveLogStore>) -> Self {
        Self {
            session: Session::new(),
            board: BoardModel::new(),
            holding_counter: 0,
            desynced: false,
            actuator,
            log,
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    #[inline]
    pub fn holding_counter(&self) -> u8 {
        self.holding_counter
    }

    #[inline]
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.session.state(),
            players: self.session.active_count(),
            active: self.session.is_active(),
            board_state: BoardState {
                fen: self.board.serialize(),
            },
            player_color: self.board.turn(),
            holding_counter: self.holding_counter,
            game_over: self.board.is_terminal(),
            desynchronized: self.desynced,
        }
    }

    /// Process one event and return what to send where.
    pub fn handle(&mut self, event: Event) -> Vec<Delivery> {
        match event {
            Event::Connected(conn) => self.connect(conn),
            Event::Disconnected(conn) => self.disconnect(conn),
            Event::Malformed(conn, err) => {
                debug!(conn, error = %err, "Malformed client message");
                vec![Delivery::message(conn, ServerMessage::error(err.to_string()))]
            }
            Event::Request(conn, request) => self.request(conn, request),
        }
    }

    /// Release the robot connection.
    pub fn shutdown(&mut self) {
        self.actuator.close();
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn connect(&mut self, conn: ConnId) -> Vec<Delivery> {
        let Some(player) = self.session.add_player(conn) else {
            info!(conn, "Session full, rejecting connection");
            return vec![
                Delivery::message(conn, ServerMessage::session_full()),
                Delivery::close(conn),
            ];
        };
        info!(conn, color = player.color.name(), "Player joined");

        if !self.session.is_active() {
            return Vec::new();
        }

        info!("Both players seated, match starting");
        self.session
            .players()
            .map(|p| Delivery::message(p.conn, ServerMessage::init_game(p.color)))
            .collect()
    }

    fn disconnect(&mut self, conn: ConnId) -> Vec<Delivery> {
        if self.session.player(conn).is_none() {
            return Vec::new();
        }
        info!(conn, "Player left, tearing down session");

        if let Err(e) = self.recover_board() {
            error!(error = %e, "Recovery after disconnect failed; resetting anyway");
        }
        self.restart_match();

        self.session
            .reset()
            .into_iter()
            .filter(|p| p.conn != conn)
            .flat_map(|p| {
                [
                    Delivery::message(p.conn, ServerMessage::error(OPPONENT_LEFT)),
                    Delivery::close(p.conn),
                ]
            })
            .collect()
    }

    /// Drive the robot back to the starting layout.
    fn recover_board(&mut self) -> Result<RecoveryReport, RecoveryFailure> {
        let report = recover(self.actuator.as_mut(), self.log.as_mut())?;
        if !report.stranded.is_empty() {
            warn!(count = report.stranded.len(), "Recovery left pieces stranded");
        }
        Ok(report)
    }

    /// Fresh board, empty log, white to move. Players stay seated.
    fn restart_match(&mut self) {
        if let Err(e) = self.log.clear() {
            error!(error = %e, "Failed to clear move log");
        }
        self.board.reset();
        self.holding_counter = 0;
        self.desynced = false;
        self.session.restart_turns();
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn request(&mut self, conn: ConnId, request: ClientMessage) -> Vec<Delivery> {
        if self.session.player(conn).is_none() || !self.session.is_active() {
            return vec![Delivery::message(conn, ServerMessage::error(NOT_STARTED))];
        }

        match request {
            ClientMessage::GetBoardState => vec![Delivery::message(
                conn,
                ServerMessage::board_state(self.board.serialize(), self.board.turn()),
            )],
            ClientMessage::ResetBoard => self.reset_board(conn),
            ClientMessage::MakeMove {
                pos_start,
                pos_end,
                promotion,
            } => self.make_move(conn, &pos_start, &pos_end, promotion.as_deref()),
        }
    }

    fn reset_board(&mut self, conn: ConnId) -> Vec<Delivery> {
        info!(conn, "Board reset requested");
        if let Err(e) = self.recover_board() {
            error!(error = %e, "Recovery for board reset failed");
            // Log stays so teardown can retry; the match cannot continue.
            self.desynced = true;
            return vec![Delivery::message(conn, ServerMessage::error(RECOVERY_FAILED))];
        }
        self.restart_match();
        self.broadcast_update()
    }

    fn make_move(
        &mut self,
        conn: ConnId,
        pos_start: &str,
        pos_end: &str,
        promotion: Option<&str>,
    ) -> Vec<Delivery> {
        let reply = |message: &str| vec![Delivery::message(conn, ServerMessage::error(message))];

        if self.session.current_player().map(|p| p.conn) != Some(conn) {
            return reply(NOT_YOUR_TURN);
        }
        if self.desynced {
            return reply(OUT_OF_SYNC);
        }
        if self.board.is_terminal() {
            return reply(GAME_OVER);
        }

        let request = match parse_request(pos_start, pos_end, promotion) {
            Ok(request) => request,
            Err(message) => return reply(message),
        };
        let Some(applied) = self.board.preview(request) else {
            debug!(conn, from = pos_start, to = pos_end, "Illegal move");
            return reply(ILLEGAL_MOVE);
        };

        // Capture first: the victim leaves board 1 for the next holding slot.
        let mut moved_anything = false;
        if let Some((transfer, entry)) = applied.capture_step(self.holding_counter + 1) {
            if self.actuator.transfer(transfer).is_err() {
                return self.fail_move(conn, MoveFailure::Clean);
            }
            if let Err(e) = self.log.append(entry.color(), &entry) {
                return self.log_failed(conn, e, transfer, false);
            }
            self.holding_counter += 1;
            moved_anything = true;
        }

        let main = applied.main_transfer();
        if self.actuator.transfer(main).is_err() {
            let failure = if moved_anything {
                MoveFailure::Partial
            } else {
                MoveFailure::Clean
            };
            return self.fail_move(conn, failure);
        }
        let entry = applied.log_entry();
        if let Err(e) = self.log.append(entry.color(), &entry) {
            return self.log_failed(conn, e, main, moved_anything);
        }

        // The turn is logged; the board follows it.
        if !self.board.commit(&applied) {
            error!("Previewed move no longer legal");
            self.desynced = true;
            return reply(OUT_OF_SYNC);
        }
        self.session.advance_turn();
        info!(
            conn,
            piece = %applied.mover,
            from = %applied.from,
            to = %applied.to,
            capture = applied.capture.is_some(),
            "Move played"
        );

        // Castling: the rook entry is only written once the rook has moved.
        if let Some((transfer, entry)) = applied.rook_step() {
            if self.actuator.transfer(transfer).is_err() {
                return self.fail_move(conn, MoveFailure::Partial);
            }
            if let Err(e) = self.log.append(entry.color(), &entry) {
                return self.log_failed(conn, e, transfer, true);
            }
        }
        self.broadcast_update()
    }

    fn fail_move(&mut self, conn: ConnId, failure: MoveFailure) -> Vec<Delivery> {
        match failure {
            MoveFailure::Clean => warn!(conn, "Robot failed, move abandoned"),
            MoveFailure::Partial => {
                error!(conn, "Robot failed mid-move, board out of sync");
                self.desynced = true;
            }
        }
        vec![Delivery::message(conn, ServerMessage::error(ROBOT_FAILED))]
    }

    /// `done` went through on the robot but its entry was not written. Carry
    /// the piece back so the log never runs ahead of the board.
    fn log_failed(
        &mut self,
        conn: ConnId,
        err: LogStoreError,
        done: Transfer,
        earlier_steps: bool,
    ) -> Vec<Delivery> {
        error!(conn, error = %err, transfer = %done, "Move log write failed, taking the transfer back");
        let taken_back = match self.actuator.transfer(done.reversed()) {
            Ok(()) => true,
            Err(e) => {
                error!(conn, error = %e, "Robot could not take the transfer back");
                false
            }
        };
        if taken_back && !earlier_steps {
            return vec![Delivery::message(conn, ServerMessage::error(NOT_RECORDED))];
        }
        self.desynced = true;
        vec![Delivery::message(conn, ServerMessage::error(OUT_OF_SYNC))]
    }

    fn broadcast_update(&self) -> Vec<Delivery> {
        let message = ServerMessage::update_game_state(self.board.serialize(), self.board.turn());
        self.session
            .players()
            .map(|p: Player| Delivery::message(p.conn, message.clone()))
            .collect()
    }
}

/// Squares and promotion piece from the raw request fields.
fn parse_request(
    pos_start: &str,
    pos_end: &str,
    promotion: Option<&str>,
) -> Result<MoveRequest, &'static str> {
    let (Ok(from), Ok(to)) = (pos_start.parse::<Square>(), pos_end.parse::<Square>()) else {
        return Err(INVALID_SQUARES);
    };
    let promotion = match promotion {
        None => None,
        Some(letter) => {
            let mut chars = letter.chars();
            match (chars.next().and_then(Role::from_letter), chars.next()) {
                (Some(role @ (Role::Queen | Role::Rook | Role::Bishop | Role::Knight)), None) => {
                    Some(role)
                }
                _ => return Err(INVALID_PROMOTION),
            }
        }
    };
    Ok(MoveRequest {
        from,
        to,
        promotion,
    })
}
