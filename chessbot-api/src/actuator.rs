//! Actuator Link: the TCP line protocol to the robot controller.
//!
//! One command per physical transfer:
//!
//! ```text
//! server -> robot   Move,{fromBoard},{fromPos},{toBoard},{toPos}\r\n
//! robot  -> server  Done\r\n
//! ```
//!
//! Commands are strictly sequential; the next one is only sent after the
//! previous reply arrived. Any reply other than `Done` is a failure.
//!
//! After a timeout or a socket error the link is closed for good: a late
//! reply would otherwise be read as the answer to the next command.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chessbot_core::Transfer;
use tracing::{debug, info, warn};

use crate::error::ActuatorError;

/// Reply the robot sends after completing a transfer.
pub const DONE: &str = "Done";

/// Something that can physically carry out a transfer.
pub trait Actuator: Send {
    /// Perform one transfer, blocking until it is acknowledged.
    fn transfer(&mut self, transfer: Transfer) -> Result<(), ActuatorError>;

    /// Release the underlying connection. Safe to call more than once.
    fn close(&mut self) {}
}

/// Wire form of one transfer, including the line terminator.
pub fn encode_command(transfer: &Transfer) -> String {
    format!(
        "Move,{},{},{},{}\r\n",
        transfer.from.board.number(),
        transfer.from.pos,
        transfer.to.board.number(),
        transfer.to.pos
    )
}

/// A connected robot controller.
pub struct ActuatorLink {
    reader: Option<BufReader<TcpStream>>,
    timeout: Duration,
}

impl ActuatorLink {
    /// Connect to the robot. Fails immediately if nobody is listening.
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, ActuatorError> {
        let connect_err = |source| ActuatorError::Connect {
            addr: addr.to_string(),
            source,
        };

        let target = addr
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| connect_err(std::io::Error::from(ErrorKind::AddrNotAvailable)))?;
        let stream = TcpStream::connect_timeout(&target, timeout).map_err(connect_err)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        info!(addr = %addr, timeout_secs = timeout.as_secs(), "Connected to robot");
        Ok(Self {
            reader: Some(BufReader::new(stream)),
            timeout,
        })
    }

    /// Whether the link is still open.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Send one command and read its reply line.
    fn exchange(&mut self, command: &str) -> Result<String, ActuatorError> {
        let stream = self.reader.as_mut().ok_or(ActuatorError::Closed)?.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.flush()?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<String, ActuatorError> {
        let reader = self.reader.as_mut().ok_or(ActuatorError::Closed)?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => Err(ActuatorError::Disconnected),
            Ok(_) => Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(ActuatorError::Timeout(self.timeout))
            }
            Err(e) => Err(ActuatorError::Io(e)),
        }
    }
}

impl Actuator for ActuatorLink {
    fn transfer(&mut self, transfer: Transfer) -> Result<(), ActuatorError> {
        let command = encode_command(&transfer);
        debug!(command = %command.trim_end(), "Sending to robot");

        let reply = match self.exchange(&command) {
            Ok(reply) => reply,
            Err(ActuatorError::Closed) => return Err(ActuatorError::Closed),
            Err(e) => {
                warn!(transfer = %transfer, error = %e, "Robot link unusable, closing");
                self.close();
                return Err(e);
            }
        };
        if reply == DONE {
            debug!(transfer = %transfer, "Robot done");
            Ok(())
        } else {
            warn!(transfer = %transfer, reply = %reply, "Robot rejected transfer");
            Err(ActuatorError::Rejected(reply))
        }
    }

    fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = reader.get_ref().shutdown(Shutdown::Both);
            info!("Robot link closed");
        }
    }
}

impl Drop for ActuatorLink {
    fn drop(&mut self) {
        self.close();
    }
}
