//! Background dashboard refresh
//!
//! Re-reads the dashboard on a fixed interval and sends each result to the
//! caller over a tokio channel. Reads go through the cache, so keys that are
//! still fresh cost nothing.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::dashboard::{DashboardData, DashboardService};

/// Messages sent from the background refresh to the caller
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A refresh cycle is starting
    RefreshStarted,
    /// Dashboard data was read
    DashboardUpdated {
        data: Box<DashboardData>,
        read_at: DateTime<Local>,
    },
}

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between dashboard reads
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Handle for controlling the background refresh
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the refresh loop; the first read happens immediately
    pub fn spawn(service: DashboardService, config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if msg_tx.send(RefreshMessage::RefreshStarted).await.is_err() {
                            break;
                        }
                        let data = service.dashboard_data().await;
                        let message = RefreshMessage::DashboardUpdated {
                            data: Box::new(data),
                            read_at: Local::now(),
                        };
                        if msg_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            debug!("refresh loop stopped");
        });

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Stops the refresh loop; the receiver drains and then closes
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
