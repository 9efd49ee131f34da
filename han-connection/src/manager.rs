//! Connection manager
//!
//! Maintains exactly one live connection and reconnects when it is lost.
//! Reconnecting uses an exponential back-off for connect failures and a
//! simple circuit breaker that injects a fixed sleep when disconnects recur
//! in rapid succession, so a flapping link cannot drive a tight
//! connect/disconnect oscillation.
//!
//! All connect and transport failures are retried internally and only
//! logged; [`ConnectionManager::run_loop`] returns solely when a close
//! request has been honored.

use crate::backoff::{BackOffStrategy, ExponentialBackOff};
use crate::connection::MeterConnection;
use crate::factory::ConnectionFactory;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Default window within which a repeated disconnect counts as rapid
pub const DEFAULT_LOST_THRESHOLD: Duration = Duration::from_secs(5);
/// Default extra sleep injected before reconnecting after rapid disconnects
pub const DEFAULT_LOST_BACK_OFF_SLEEP: Duration = Duration::from_secs(5);

type SharedShutdown = Arc<Mutex<Option<watch::Sender<bool>>>>;

/// Cloneable handle that can stop the manager from anywhere
///
/// Intended for signal handlers: it only flips flags and sends on a
/// channel, so it is safe to call from any task at any time.
#[derive(Clone)]
pub struct CloseHandle {
    closing_tx: watch::Sender<bool>,
    active_shutdown: SharedShutdown,
}

impl CloseHandle {
    /// Close the current connection, if any, and stop reconnecting
    ///
    /// Idempotent. The running [`ConnectionManager::run_loop`] observes the
    /// request at its next suspension point.
    pub fn close(&self) {
        let _ = self.closing_tx.send(true);
        let shutdown = self.active_shutdown.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(shutdown) = shutdown {
            log::info!("Close connection and abort connect loop");
            let _ = shutdown.send(true);
        }
    }
}

/// Maintain a connection and reconnect if it is lost
pub struct ConnectionManager {
    factory: Box<dyn ConnectionFactory>,
    connection: Option<MeterConnection>,
    active_shutdown: SharedShutdown,
    closing_tx: watch::Sender<bool>,
    closing_rx: watch::Receiver<bool>,

    /// Back-off applied to failed connect attempts
    pub connect_back_off: Box<dyn BackOffStrategy>,

    /// Two losses closer together than this count as a rapid disconnect.
    /// Independent from `lost_back_off_sleep`; they only share a default.
    pub lost_threshold: Duration,
    /// Extra sleep before reconnecting after a rapid disconnect
    pub lost_back_off_sleep: Duration,

    last_lost_at: Option<Instant>,
    sleep_before_reconnect: bool,
}

impl ConnectionManager {
    /// Create a manager driving the given connection factory
    pub fn new(factory: Box<dyn ConnectionFactory>) -> Self {
        let (closing_tx, closing_rx) = watch::channel(false);
        Self {
            factory,
            connection: None,
            active_shutdown: Arc::new(Mutex::new(None)),
            closing_tx,
            closing_rx,
            connect_back_off: Box::new(ExponentialBackOff::new()),
            lost_threshold: DEFAULT_LOST_THRESHOLD,
            lost_back_off_sleep: DEFAULT_LOST_BACK_OFF_SLEEP,
            last_lost_at: None,
            sleep_before_reconnect: false,
        }
    }

    /// Handle for closing the manager from another task or a signal handler
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            closing_tx: self.closing_tx.clone(),
            active_shutdown: self.active_shutdown.clone(),
        }
    }

    /// Close the current connection, if any, and stop reconnecting
    pub fn close(&self) {
        self.close_handle().close();
    }

    /// Whether a connection is currently live
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect via the factory and keep reconnecting on loss
    ///
    /// Runs until [`close`](ConnectionManager::close) is observed. Each
    /// iteration races the connect attempt (including its back-off sleep)
    /// against the close request; the losing future is dropped, which
    /// genuinely cancels an in-flight connect. Once connected it waits for
    /// either the connection's done signal or a close request.
    pub async fn run_loop(&mut self) {
        while !self.is_closing() {
            let mut closing = self.closing_rx.clone();
            tokio::select! {
                _ = self.try_connect() => {}
                _ = closing.wait_for(|closing| *closing) => {}
            }

            let done = self.connection.as_ref().map(|connection| connection.done());
            if let Some(mut done) = done {
                let mut closing = self.closing_rx.clone();
                tokio::select! {
                    _ = done.wait() => {}
                    _ = closing.wait_for(|closing| *closing) => {}
                }

                if !self.is_closing() {
                    log::warn!("Connection lost");
                    self.update_lost_circuit_breaker();
                }

                // Dropping the pair asks its pump to close the transport,
                // whether this was a loss or a close request.
                self.connection = None;
                self.active_shutdown
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take();
            }
        }

        // Done closing; allow the instance to be reused for a new loop.
        let _ = self.closing_tx.send(false);
        log::info!("Connect loop done");
    }

    fn is_closing(&self) -> bool {
        *self.closing_rx.borrow()
    }

    async fn try_connect(&mut self) {
        let sleep_time = self.back_off_time();
        if sleep_time > Duration::ZERO {
            tokio::time::sleep(sleep_time).await;
        }

        if self.is_closing() {
            return;
        }

        log::debug!("Try to connect");
        match self.factory.connect().await {
            Ok(connection) => {
                *self
                    .active_shutdown
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(connection.shutdown_handle());
                self.connection = Some(connection);
                self.connect_back_off.reset();
            }
            Err(e) => {
                self.connection = None;
                self.connect_back_off.failure();
                log::warn!("Error connecting: {}", e);
            }
        }
    }

    /// Delay before the next connect attempt
    ///
    /// Combines the exponential connect-failure back-off and the circuit
    /// breaker's fixed sleep via max, not sum.
    fn back_off_time(&self) -> Duration {
        let connect_error_delay = self.connect_back_off.current_delay();
        if connect_error_delay.is_zero() && !self.sleep_before_reconnect {
            return Duration::ZERO;
        }

        let reconnect_sleep = if self.sleep_before_reconnect {
            self.lost_back_off_sleep
        } else {
            Duration::ZERO
        };

        let sleep_time = connect_error_delay.max(reconnect_sleep);
        log::info!(
            "Back-off for {} sec before reconnecting",
            sleep_time.as_secs()
        );
        sleep_time
    }

    fn update_lost_circuit_breaker(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_lost_at {
            self.sleep_before_reconnect = now.duration_since(last) < self.lost_threshold;
        }
        self.last_lost_at = Some(now);
    }
}
