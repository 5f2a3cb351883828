//! Note store: durable storage with a background writer and live updates.
//!
//! # Responsibility
//! - Open the database on the caller's thread so open failures surface.
//! - Hand the connection to a single writer thread for all mutations,
//!   including first-run seeding.
//! - Expose the live note list through `NotesFeed`.
//!
//! # Invariants
//! - Mutating calls only enqueue; they never wait for SQLite.
//! - Writes are applied in submission order.
//! - Seeding, when needed, is the first unit of work on the writer.
//! - Dropping the store drains queued writes and joins the writer.

use crate::config::StoreConfig;
use crate::db::{open_with, DbError, SchemaState};
use crate::model::note::{Note, NoteDraft, NoteId};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

mod cell;
pub mod feed;
mod writer;

pub use cell::StoreCell;
pub use feed::{NoteList, NotesFeed, NotesWatch, Subscription};

use writer::{Command, WriteOp, WriteStats, Writer};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store lifecycle errors.
#[derive(Debug)]
pub enum StoreError {
    /// The backing database cannot be opened or created.
    Unavailable(DbError),
    /// The writer thread could not be started.
    Spawn(std::io::Error),
    /// The writer has stopped; no further writes are accepted.
    WriterStopped,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "note store unavailable: {err}"),
            Self::Spawn(err) => write!(f, "failed to start note writer: {err}"),
            Self::WriterStopped => write!(f, "note writer has stopped"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            Self::Spawn(err) => Some(err),
            Self::WriterStopped => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Unavailable(value)
    }
}

/// Handle to an open note store.
pub struct NoteStore {
    commands: Option<mpsc::UnboundedSender<Command>>,
    feed: Arc<NotesFeed>,
    stats: Arc<WriteStats>,
    writer: Option<JoinHandle<()>>,
    schema_state: SchemaState,
}

impl NoteStore {
    /// Opens the store and starts its writer.
    ///
    /// Seeding of a created or recreated store runs on the writer; this call
    /// returns without waiting for it.
    ///
    /// # Errors
    /// - `Unavailable` when the database cannot be opened or its schema
    ///   cannot be prepared.
    /// - `Spawn` when the writer thread cannot be started.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let opened = open_with(config)?;
        let feed = NotesFeed::new();
        let stats = Arc::new(WriteStats::default());
        let (commands, queue) = mpsc::unbounded_channel();

        let writer = Writer::new(
            opened.conn,
            opened.state.needs_seed(),
            Arc::clone(&feed),
            Arc::clone(&stats),
        )
        .spawn(queue)
        .map_err(|err| {
            error!(
                "event=store_open module=store status=error error_code=writer_spawn_failed error={}",
                err
            );
            StoreError::Spawn(err)
        })?;

        info!(
            "event=store_open module=store status=ok state={}",
            opened.state.as_str()
        );
        Ok(Self {
            commands: Some(commands),
            feed,
            stats,
            writer: Some(writer),
            schema_state: opened.state,
        })
    }

    /// Schema state observed while opening.
    pub fn schema_state(&self) -> SchemaState {
        self.schema_state
    }

    /// Queues insertion of a new note. The id is assigned by the writer.
    pub fn insert(&self, draft: NoteDraft) -> StoreResult<()> {
        self.submit(WriteOp::Insert(draft))
    }

    /// Queues full replacement of the note with `note.id`.
    ///
    /// An unknown id is reported by the writer as a failed write
    /// (`failed_writes`), not to the caller.
    pub fn update(&self, note: Note) -> StoreResult<()> {
        self.submit(WriteOp::Update(note))
    }

    /// Queues deletion of one note. Unknown ids count as failed writes.
    pub fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.submit(WriteOp::Delete(id))
    }

    /// Queues removal of every note.
    pub fn delete_all(&self) -> StoreResult<()> {
        self.submit(WriteOp::DeleteAll)
    }

    /// Opens a watch stream over the live note list.
    pub fn all_notes(&self) -> NotesWatch {
        self.feed.watch()
    }

    /// Registers a callback for the live note list.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&[Note]) + Send + 'static,
    {
        self.feed.subscribe(callback)
    }

    /// Latest published snapshot, if the writer has loaded one.
    pub fn current(&self) -> Option<NoteList> {
        self.feed.current()
    }

    /// Blocks until every write submitted before this call is applied and
    /// published.
    ///
    /// Must not be called from inside an async runtime or an observer
    /// callback; use `flush_async` from async code.
    pub fn flush(&self) -> StoreResult<()> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        done.blocking_recv().map_err(|_| StoreError::WriterStopped)
    }

    /// Async variant of `flush`.
    pub async fn flush_async(&self) -> StoreResult<()> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        done.await.map_err(|_| StoreError::WriterStopped)
    }

    /// Writes that completed successfully so far.
    pub fn applied_writes(&self) -> u64 {
        self.stats.applied()
    }

    /// Writes (including seeding) that failed so far.
    pub fn failed_writes(&self) -> u64 {
        self.stats.failed()
    }

    fn submit(&self, op: WriteOp) -> StoreResult<()> {
        self.send(Command::Write(op))
    }

    fn send(&self, command: Command) -> StoreResult<()> {
        self.commands
            .as_ref()
            .ok_or(StoreError::WriterStopped)?
            .send(command)
            .map_err(|_| StoreError::WriterStopped)
    }
}

impl Drop for NoteStore {
    fn drop(&mut self) {
        self.commands.take();
        let Some(writer) = self.writer.take() else {
            return;
        };
        // Joining from the writer itself (last handle dropped in a callback)
        // would deadlock; the thread exits on its own once the queue drains.
        if writer.thread().id() == std::thread::current().id() {
            return;
        }
        if writer.join().is_err() {
            error!("event=store_close module=store status=error error_code=writer_panicked");
        }
    }
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("schema_state", &self.schema_state)
            .field("applied_writes", &self.applied_writes())
            .field("failed_writes", &self.failed_writes())
            .finish()
    }
}
