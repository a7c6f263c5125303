//! Random Game Recovery Testing
//!
//! Plays seeded random games the way the session drives the actuator:
//! capture to holding first, then the moving piece, then the castling rook.
//! Every physical step is applied to a model of the two boards and logged.
//! At the end the recovery plan must put the physical boards back in the
//! starting layout without ever touching an empty or occupied square wrongly.

use std::collections::HashMap;

use chessbot_core::{
    is_rook_leg, plan_recovery, recovery::replay, BoardId, BoardModel, Color, Layout, LogEntry, Piece,
    Square, Transfer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Both physical boards.
struct Physical {
    board: Layout,
    holding: HashMap<u8, Piece>,
}

impl Physical {
    fn new() -> Self {
        Physical {
            board: Layout::starting(),
            holding: HashMap::new(),
        }
    }

    fn transfer(&mut self, t: Transfer) {
        let piece = match t.from.board {
            BoardId::Active => self
                .board
                .take(Square::from_linear(u32::from(t.from.pos)).unwrap())
                .unwrap_or_else(|| panic!("{t}: source square is empty")),
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
}

/// Log stored as strings, the way the store keeps it.
#[derive(Default)]
struct Log {
    white: Vec<String>,
    black: Vec<String>,
}

impl Log {
    fn append(&mut self, entry: LogEntry) {
        match entry.color() {
            Color::White => self.white.push(entry.to_string()),
            Color::Black => self.black.push(entry.to_string()),
        }
    }

    fn read(&self) -> (Vec<LogEntry>, Vec<LogEntry>) {
        let parse = |list: &[String]| -> Vec<LogEntry> {
            list.iter().map(|e| e.parse().unwrap()).collect()
        };
        (parse(&self.white), parse(&self.black))
    }
}

/// Play up to `plies` random moves, promotions to any piece included.
fn play_random_game(seed: u64, plies: usize) -> (Physical, Log, BoardModel) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = BoardModel::new();
    let mut physical = Physical::new();
    let mut log = Log::default();
    let mut holding_counter = 0u8;

    for _ in 0..plies {
        let moves = board.legal_moves();
        if moves.is_empty() || board.is_terminal() {
            break;
        }
        let request = moves[rng.random_range(0..moves.len())];
        let applied = board.preview(request).expect("legal move resolves");

        if applied.capture.is_some() {
            holding_counter += 1;
            let (transfer, entry) = applied.capture_step(holding_counter).unwrap();
            physical.transfer(transfer);
            log.append(entry);
        }
        physical.transfer(applied.main_transfer());
        log.append(applied.log_entry());
        if let Some((rook, entry)) = applied.rook_step() {
            physical.transfer(rook);
            log.append(entry);
        }
        assert!(board.commit(&applied));

        assert_eq!(physical.board, board.layout(), "physical board drifted");
    }

    (physical, log, board)
}

#[test]
fn test_random_games_recover_to_start() {
    for seed in 0..40 {
        let (mut physical, log, _) = play_random_game(seed, 80);
        let (white, black) = log.read();

        let plan = plan_recovery(&white, &black).unwrap();
        for &t in &plan.transfers {
            physical.transfer(t);
        }

        assert!(plan.stranded.is_empty(), "seed {seed}: stranded {:?}", plan.stranded);
        assert_eq!(physical.board, Layout::starting(), "seed {seed}");
        assert!(physical.holding.is_empty(), "seed {seed}");
    }
}

#[test]
fn test_log_replay_matches_live_board() {
    for seed in 100..120 {
        let (_, log, board) = play_random_game(seed, 60);
        let (white, black) = log.read();
        let replayed = replay(&white, &black).unwrap();
        // the promotion piece is not logged, so compare what stands where
        assert_eq!(replayed.layout(), board.layout(), "seed {seed}");
        assert_eq!(replayed.turn(), board.turn(), "seed {seed}");
    }
}

#[test]
fn test_games_with_promotions_recover() {
    let mut promoted = 0;
    for seed in 400..600 {
        let (mut physical, log, board) = play_random_game(seed, 200);
        let on_board = board.all_occupied_squares();
        let differs = on_board
            .iter()
            .any(|&(square, piece)| board.layout().get(square) != Some(piece));
        if !differs {
            continue;
        }
        promoted += 1;

        let (white, black) = log.read();
        let plan = plan_recovery(&white, &black).unwrap();
        for &t in &plan.transfers {
            physical.transfer(t);
        }
        assert!(plan.stranded.is_empty(), "seed {seed}: stranded {:?}", plan.stranded);
        assert_eq!(physical.board, Layout::starting(), "seed {seed}");
    }
    assert!(promoted > 0, "no random game kept a promoted piece");
}

#[test]
fn test_capture_accounting() {
    for seed in 200..220 {
        let (physical, log, _) = play_random_game(seed, 100);
        let (white, black) = log.read();

        for (color, entries) in [(Color::White, &white), (Color::Black, &black)] {
            let captured = entries
                .iter()
                .filter(|e| matches!(e, LogEntry::Captured { .. }))
                .count();
            let on_board = physical
                .board
                .occupied()
                .into_iter()
                .filter(|(_, piece)| piece.color == color)
                .count();
            assert_eq!(captured + on_board, 16, "seed {seed} {color:?}");
        }
    }
}

#[test]
fn test_turn_counts_stay_within_one() {
    for seed in 300..310 {
        let (_, log, _) = play_random_game(seed, 50);
        let (white, black) = log.read();
        let moved = |entries: &[LogEntry]| {
            entries
                .iter()
                .enumerate()
                .filter(|&(i, e)| matches!(e, LogEntry::Moved { .. }) && !is_rook_leg(entries, i))
                .count()
        };
        let (w, b) = (moved(&white), moved(&black));
        assert!(w == b || w == b + 1, "seed {seed}: {w} white vs {b} black moves");
    }
}

#[test]
fn test_second_recovery_is_a_no_op() {
    let (mut physical, log, _) = play_random_game(7, 40);
    let (white, black) = log.read();
    for &t in &plan_recovery(&white, &black).unwrap().transfers {
        physical.transfer(t);
    }

    // the log is cleared after a successful recovery
    let again = plan_recovery(&[], &[]).unwrap();
    assert!(again.transfers.is_empty());
    assert_eq!(physical.board, Layout::starting());
}
