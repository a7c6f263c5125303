//! Robot simulator.
//!
//! Speaks the robot side of the line protocol so the server can run without
//! hardware. It tracks both boards, starting from the standard layout, and
//! answers `Done` only for transfers that are physically possible: a piece
//! must stand on the source and the destination must be free.
//!
//! Usage: robot_sim [--listen 127.0.0.1:12345] [--delay-ms 0] [--fail-after N]

use std::collections::HashMap;
use std::time::Duration;

use chessbot_core::{BoardId, Layout, Piece, Spot, Square};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

/// Fake robot controller for local development.
#[derive(Parser, Debug)]
#[command(name = "robot_sim")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:12345")]
    listen: String,

    /// Pretend each transfer takes this long
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Answer `Error` to every command after this many
    #[arg(long)]
    fail_after: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Simulated state of both boards.
struct Boards {
    active: Layout,
    holding: HashMap<u8, Piece>,
}

impl Boards {
    fn new() -> Self {
        Self {
            active: Layout::starting(),
            holding: HashMap::new(),
        }
    }

    fn take(&mut self, spot: Spot) -> Option<Piece> {
        match spot.board {
            BoardId::Active => self.active.take(Square::from_linear(u32::from(spot.pos)).ok()?),
            BoardId::Holding => self.holding.remove(&spot.pos),
        }
    }

    fn is_free(&self, spot: Spot) -> bool {
        match spot.board {
            BoardId::Active => Square::from_linear(u32::from(spot.pos))
                .map(|sq| self.active.get(sq).is_none())
                .unwrap_or(false),
            BoardId::Holding => !self.holding.contains_key(&spot.pos),
        }
    }

    fn put(&mut self, spot: Spot, piece: Piece) {
        match spot.board {
            BoardId::Active => {
                if let Ok(sq) = Square::from_linear(u32::from(spot.pos)) {
                    self.active.set(sq, Some(piece));
                }
            }
            BoardId::Holding => {
                self.holding.insert(spot.pos, piece);
            }
        }
    }

    /// Carry out one transfer; `Err` describes why it is impossible.
    fn transfer(&mut self, from: Spot, to: Spot) -> Result<Piece, String> {
        if !self.is_free(to) {
            return Err(format!("destination {to} is occupied"));
        }
        let piece = self.take(from).ok_or_else(|| format!("nothing to pick up at {from}"))?;
        self.put(to, piece);
        Ok(piece)
    }
}

/// Parse `Move,{b},{p},{b},{p}`.
fn parse_command(line: &str) -> Option<(Spot, Spot)> {
    let mut fields = line.trim_end().split(',');
    if fields.next()? != "Move" {
        return None;
    }
    let mut spot = || -> Option<Spot> {
        let board = match fields.next()?.trim().parse::<u8>().ok()? {
            1 => BoardId::Active,
            2 => BoardId::Holding,
            _ => return None,
        };
        let pos: u8 = fields.next()?.trim().parse().ok()?;
        (1..=64).contains(&pos).then_some(Spot { board, pos })
    };
    let from = spot()?;
    let to = spot()?;
    fields.next().is_none().then_some((from, to))
}

async fn serve(stream: TcpStream, args: &Args, boards: &mut Boards, handled: &mut usize) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        *handled += 1;
        let reply = match parse_command(&line) {
            None => {
                warn!(line = %line, "Unparseable command");
                "Error"
            }
            Some(_) if args.fail_after.is_some_and(|n| *handled > n) => {
                warn!(line = %line, "Injected failure");
                "Error"
            }
            Some((from, to)) => match boards.transfer(from, to) {
                Ok(piece) => {
                    tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
                    info!(piece = %piece, from = %from, to = %to, "Moved");
                    "Done"
                }
                Err(reason) => {
                    warn!(from = %from, to = %to, reason = %reason, "Impossible transfer");
                    "Error"
                }
            },
        };
        write.write_all(format!("{reply}\r\n").as_bytes()).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    chessbot_api::logging::init(&args.log_level);

    let listener = TcpListener::bind(&args.listen).await?;
    info!(addr = %args.listen, "Robot simulator listening");

    // One controller, one server: connections are served one after another
    // and the boards persist between them, like the real hardware.
    let mut boards = Boards::new();
    let mut handled = 0usize;
    loop {
        let (stream, peer) = listener.accept().await?;
        info!(peer = %peer, "Server connected");
        if let Err(e) = serve(stream, &args, &mut boards, &mut handled).await {
            warn!(error = %e, "Connection error");
        }
        info!(peer = %peer, "Server disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn test_parse_command() {
        let (from, to) = parse_command("Move,1,13,1,29\r\n").unwrap();
        assert_eq!(from, Spot::active(sq("e2")));
        assert_eq!(to, Spot::active(sq("e4")));

        let (_, to) = parse_command("Move,1,36,2,3").unwrap();
        assert_eq!(to, Spot::holding(3));

        assert!(parse_command("Move,3,1,1,1").is_none());
        assert!(parse_command("Move,1,0,1,1").is_none());
        assert!(parse_command("Move,1,65,1,1").is_none());
        assert!(parse_command("Move,1,1,1").is_none());
        assert!(parse_command("Move,1,1,1,2,3").is_none());
        assert!(parse_command("Jump,1,1,1,2").is_none());
    }

    #[test]
    fn test_boards_reject_impossible_transfers() {
        let mut boards = Boards::new();
        assert!(boards.transfer(Spot::active(sq("e2")), Spot::active(sq("e4"))).is_ok());
        // e2 is empty now
        assert!(boards.transfer(Spot::active(sq("e2")), Spot::active(sq("e3"))).is_err());
        // d2 is occupied
        assert!(boards.transfer(Spot::active(sq("e4")), Spot::active(sq("d2"))).is_err());

        assert!(boards.transfer(Spot::active(sq("d7")), Spot::holding(1)).is_ok());
        assert!(boards.transfer(Spot::active(sq("c7")), Spot::holding(1)).is_err());
        assert!(boards.transfer(Spot::holding(1), Spot::active(sq("d7"))).is_ok());
        assert!(boards.holding.is_empty());
    }
}
