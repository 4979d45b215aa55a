//! Session state machine
//!
//! Tracks one client connection from accept to close.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;

use crate::registry::SubscriberId;
use crate::stats::SessionStats;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connected, no command seen yet
    Connected,
    /// At least one command processed
    Active,
    /// Session is closing
    Closing,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Last time a command was received or a message was written
    pub last_activity: Instant,

    /// Registry id, once the session has subscribed to something
    pub subscriber: Option<SubscriberId>,

    /// Counters for this session
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connected,
            connected_at: now,
            last_activity: now,
            subscriber: None,
            stats: SessionStats::new(),
        }
    }

    /// Record an incoming command line
    pub fn on_command(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Active;
        }
        self.last_activity = Instant::now();
        self.stats.commands += 1;
    }

    /// Record the outcome of a publish
    pub fn on_publish(&mut self, accepted: bool) {
        if accepted {
            self.stats.published += 1;
        } else {
            self.stats.rejected += 1;
        }
    }

    /// Record a record written to the peer
    ///
    /// Counts as activity, so a listen-only subscriber stays connected while
    /// records keep flowing.
    pub fn on_message_sent(&mut self, bytes: usize) {
        self.last_activity = Instant::now();
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += bytes as u64;
    }

    /// Remember the registry id assigned to this session
    pub fn attach_subscriber(&mut self, id: SubscriberId) {
        self.subscriber = Some(id);
    }

    /// Whether this session receives deliveries
    pub fn is_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Time since the last command or delivery
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Start closing the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closing;
    }

    /// Mark the session fully closed
    ///
    /// Returns the subscriber id that still needs to be disconnected, if any.
    pub fn finish(&mut self) -> Option<SubscriberId> {
        self.phase = SessionPhase::Closed;
        self.subscriber.take()
    }
}
