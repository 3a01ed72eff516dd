//! Listener lifecycle for an [`AppService`].
//!
//! The host stack stays mutable while a listener runs: binding or unbinding
//! a definition takes effect on the next request.

use super::service::AppService;
use may::coroutine::JoinHandle;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const READY_POLL: Duration = Duration::from_millis(5);

/// A running listener.
pub struct ServerHandle {
    addr: SocketAddr,
    started: Instant,
    handle: JoinHandle<()>,
}

/// Serve `service` on the first address `addr` resolves to that can be bound.
pub fn serve<A: ToSocketAddrs>(service: AppService, addr: A) -> io::Result<ServerHandle> {
    let mut last_err = None;
    for candidate in addr.to_socket_addrs()? {
        match may_minihttp::HttpServer(service.clone()).start(candidate) {
            Ok(handle) => {
                info!(addr = %candidate, "Listening");
                return Ok(ServerHandle {
                    addr: candidate,
                    started: Instant::now(),
                    handle,
                });
            }
            Err(e) => {
                warn!(addr = %candidate, error = %e, "Bind failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Block until the listener accepts a connection or `timeout` passes.
    pub fn wait_ready(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match TcpStream::connect(self.addr) {
                Ok(_) => return Ok(()),
                Err(e) if Instant::now() >= deadline => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} not accepting after {timeout:?}: {e}", self.addr),
                    ));
                }
                Err(_) => thread::sleep(READY_POLL),
            }
        }
    }

    /// Cancel the accept coroutine and wait for it.
    pub fn stop(self) {
        // SAFETY: the handle is owned here and never joined elsewhere
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!(addr = %self.addr, uptime = ?self.started.elapsed(), "Listener stopped");
    }

    /// Block until the accept coroutine ends.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
