//! # Event Bus System
//!
//! Provides event-driven notifications for database updates using `tokio::sync::broadcast`.
//! The update walk publishes what it changes; hosts subscribe to refresh views,
//! schedule a save, or show progress.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for library and update events
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ UpdateWalk  ├──────────────>│ EventBus  ├─────────────────>│ Subscriber │
//! └─────────────┘               │ (broadcast│                  └────────────┘
//!                               │  channel) │     subscribe    ┌────────────┐
//!                               │           ├─────────────────>│ Subscriber │
//!                               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! let event_bus = EventBus::new(100);
//! let _subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Library(LibraryEvent::SongAdded {
//!         uri: "mods/pack.zip/intro.mod".to_string(),
//!     }))
//!     .ok();
//! ```
//!
//! ### Filtering Events
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream};
//!
//! let event_bus = EventBus::new(100);
//! let archive_failures = EventStream::new(event_bus.subscribe()).filter(|event| {
//!     matches!(
//!         event,
//!         CoreEvent::Update(core_runtime::events::UpdateEvent::ArchiveFailed { .. })
//!     )
//! });
//! # drop(archive_failures);
//! ```
//!
//! ## Notes
//!
//! - Emitting with no subscribers returns an error; publishers ignore it.
//! - Slow subscribers receive `Lagged` errors but don't block the walk.
//! - The walk itself is synchronous; `emit` never blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Changes to the database tree
    Library(LibraryEvent),
    /// Progress of an update walk
    Update(UpdateEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Update(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Update(UpdateEvent::ArchiveFailed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::DirectoryRemoved { .. }) => EventSeverity::Warning,
            CoreEvent::Update(UpdateEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Update(UpdateEvent::Finished { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::DatabaseModified) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Library Events
// ============================================================================

/// Events describing mutations of the database tree.
///
/// Paths and URIs are '/'-separated and relative to the database root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A directory node was created.
    DirectoryAdded {
        path: String,
        /// True when the directory belongs to an archive subtree.
        in_archive: bool,
    },
    /// A directory node and its whole subtree were deleted.
    DirectoryRemoved { path: String },
    /// A song was added.
    SongAdded { uri: String },
    /// A song was removed.
    SongRemoved { uri: String },
    /// The database went from clean to modified.
    DatabaseModified,
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::DirectoryAdded { .. } => "Directory added to database",
            LibraryEvent::DirectoryRemoved { .. } => "Directory removed from database",
            LibraryEvent::SongAdded { .. } => "Song added to database",
            LibraryEvent::SongRemoved { .. } => "Song removed from database",
            LibraryEvent::DatabaseModified => "Database modified",
        }
    }
}

// ============================================================================
// Update Events
// ============================================================================

/// Events describing the progress of an update walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UpdateEvent {
    /// A walk started.
    Started {
        /// Whether stored timestamps are ignored for this walk.
        discard: bool,
    },
    /// An archive was opened and is being visited.
    ArchiveOpened {
        uri: String,
        /// Name of the plugin that opened it.
        plugin: String,
    },
    /// An archive could not be opened.
    ArchiveFailed { uri: String, message: String },
    /// A walk finished.
    Finished {
        directories_scanned: u64,
        archives_opened: u64,
        archives_skipped: u64,
        archives_failed: u64,
        songs_added: u64,
        songs_updated: u64,
        songs_removed: u64,
        directories_removed: u64,
        modified: bool,
    },
}

impl UpdateEvent {
    fn description(&self) -> &str {
        match self {
            UpdateEvent::Started { .. } => "Database update started",
            UpdateEvent::ArchiveOpened { .. } => "Archive opened",
            UpdateEvent::ArchiveFailed { .. } => "Archive failed to open",
            UpdateEvent::Finished { .. } => "Database update finished",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning is cheap and every clone publishes into the same channel.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, UpdateEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut subscriber = event_bus.subscribe();
///
/// event_bus
///     .emit(CoreEvent::Update(UpdateEvent::Started { discard: false }))
///     .ok();
///
/// assert!(subscriber.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()` and `try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently buffered that passes the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
