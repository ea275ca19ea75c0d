// OS signal handling - any of the registered signals requests shutdown

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

#[cfg(unix)]
const SIGABRT: i32 = 6;

/// Registered shutdown signals (SIGINT, SIGTERM, SIGHUP, SIGABRT)
#[cfg(unix)]
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    abort: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    pub fn register() -> std::io::Result<Self> {
        Ok(ShutdownSignals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            abort: signal(SignalKind::from_raw(SIGABRT))?,
        })
    }

    /// Wait for the first signal and return its name
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.abort.recv() => "SIGABRT",
        }
    }
}

#[cfg(not(unix))]
pub struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn register() -> std::io::Result<Self> {
        Ok(ShutdownSignals)
    }

    pub async fn recv(self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
