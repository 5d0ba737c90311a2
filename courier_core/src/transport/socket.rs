/*!
 * TCP connector whose sockets can be shut down from another thread.
 *
 * Every tracked request runs on its own helper thread. The helper binds a
 * `SocketSlot` to itself before calling into `ureq`, and each socket the
 * connector opens on that thread is registered in the slot. Closing the
 * slot shuts those sockets down: a read or write blocked inside `ureq`
 * fails at once, the helper unwinds and the collector sees the connection
 * go away.
 *
 * A socket opened after the slot was closed is shut down on the spot, so
 * an abort that lands during connection setup still wins.
 */
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;
use ureq::unversioned::transport::{
    Buffers, ConnectionDetails, Connector, LazyBuffers, NextTimeout, Transport,
};
use ureq::Timeout;

thread_local! {
    static CURRENT_SLOT: RefCell<Option<SocketSlot>> = const { RefCell::new(None) };
}

// ---------------------------------------------------------------------------
// SocketSlot
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct SocketSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Default)]
struct SlotState {
    closed: bool,
    sockets: Vec<TcpStream>,
}

impl SocketSlot {
    /// Sockets opened on this thread from now on belong to the slot.
    pub(crate) fn bind_to_current_thread(&self) {
        CURRENT_SLOT.with(|current| *current.borrow_mut() = Some(self.clone()));
    }

    fn current() -> Option<SocketSlot> {
        CURRENT_SLOT.with(|current| current.borrow().clone())
    }

    fn attach(&self, stream: &TcpStream) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("socket slot poisoned"))?;

        if state.closed {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(io::Error::new(io::ErrorKind::Interrupted, "request aborted"));
        }

        state.sockets.push(stream.try_clone()?);
        Ok(())
    }

    /**
     * Shuts down every registered socket and refuses new ones.
     *
     * Returns how many sockets were shut down.
     */
    pub(crate) fn close(&self) -> usize {
        let Ok(mut state) = self.inner.lock() else {
            return 0;
        };
        state.closed = true;

        let sockets = std::mem::take(&mut state.sockets);
        for socket in &sockets {
            let _ = socket.shutdown(Shutdown::Both);
        }
        sockets.len()
    }
}

// ---------------------------------------------------------------------------
// SocketConnector
// ---------------------------------------------------------------------------

/// First link of the agent's connector chain. TLS is layered on top.
#[derive(Debug, Default)]
pub(crate) struct SocketConnector;

impl Connector<()> for SocketConnector {
    type Out = SocketTransport;

    fn connect(
        &self,
        details: &ConnectionDetails,
        _chained: Option<()>,
    ) -> Result<Option<Self::Out>, ureq::Error> {
        let budget = details.timeout.not_zero().map(|after| *after);
        let mut last_err = None;

        for addr in &details.addrs {
            let attempt = match budget {
                Some(budget) => TcpStream::connect_timeout(addr, budget),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    if details.config.no_delay() {
                        stream.set_nodelay(true)?;
                    }
                    if let Some(slot) = SocketSlot::current() {
                        slot.attach(&stream)?;
                    }
                    debug!(%addr, "socket connected");

                    let buffers = LazyBuffers::new(
                        details.config.input_buffer_size(),
                        details.config.output_buffer_size(),
                    );
                    return Ok(Some(SocketTransport::new(stream, buffers)));
                }
                Err(err) => last_err = Some(err),
            }
        }

        let err = last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionRefused, "no address to connect to")
        });
        Err(map_io(err, Timeout::Connect))
    }
}

// ---------------------------------------------------------------------------
// SocketTransport
// ---------------------------------------------------------------------------

pub(crate) struct SocketTransport {
    stream: TcpStream,
    buffers: LazyBuffers,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl SocketTransport {
    fn new(stream: TcpStream, buffers: LazyBuffers) -> Self {
        Self {
            stream,
            buffers,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl Transport for SocketTransport {
    fn buffers(&mut self) -> &mut dyn Buffers {
        &mut self.buffers
    }

    fn transmit_output(&mut self, amount: usize, timeout: NextTimeout) -> Result<(), ureq::Error> {
        let wanted = timeout.not_zero().map(|after| *after);
        if wanted != self.write_timeout {
            self.stream.set_write_timeout(wanted)?;
            self.write_timeout = wanted;
        }

        let output = &self.buffers.output()[..amount];
        self.stream
            .write_all(output)
            .map_err(|err| map_io(err, timeout.reason))
    }

    fn await_input(&mut self, timeout: NextTimeout) -> Result<bool, ureq::Error> {
        let wanted = timeout.not_zero().map(|after| *after);
        if wanted != self.read_timeout {
            self.stream.set_read_timeout(wanted)?;
            self.read_timeout = wanted;
        }

        let input = self.buffers.input_append_buf();
        let amount = self
            .stream
            .read(input)
            .map_err(|err| map_io(err, timeout.reason))?;
        self.buffers.input_appended(amount);

        Ok(amount > 0)
    }

    fn is_open(&mut self) -> bool {
        idle_and_open(&self.stream).unwrap_or(false)
    }
}

impl fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransport")
            .field("peer", &self.stream.peer_addr().ok())
            .finish()
    }
}

/// An idle connection is usable only if reading would block.
fn idle_and_open(stream: &TcpStream) -> io::Result<bool> {
    stream.set_nonblocking(true)?;
    let mut reader = stream;
    let mut buf = [0];
    let open = match reader.read(&mut buf) {
        Err(err) => err.kind() == io::ErrorKind::WouldBlock,
        Ok(_) => false,
    };
    stream.set_nonblocking(false)?;
    Ok(open)
}

fn map_io(err: io::Error, reason: Timeout) -> ureq::Error {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ureq::Error::Timeout(reason),
        _ => ureq::Error::Io(err),
    }
}
