//! Single background writer that owns the SQLite connection.
//!
//! # Responsibility
//! - Seed a newly created store before any other work.
//! - Apply queued writes in submission order.
//! - Re-query and publish the full note list after every successful write.
//!
//! # Invariants
//! - Only this thread touches the connection after `NoteStore::open`.
//! - A failed write is logged and counted; the loop keeps running.
//! - Writes still queued when the store shuts down are applied before exit.

use crate::model::note::{seed_notes, Note, NoteDraft, NoteId};
use crate::repo::note_repo::{NoteDao, RepoResult, SqliteNoteDao};
use crate::store::feed::NotesFeed;
use log::{error, info, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

pub(crate) const WRITER_THREAD_NAME: &str = "notekeeper-writer";

/// One mutating unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriteOp {
    Insert(NoteDraft),
    Update(Note),
    Delete(NoteId),
    DeleteAll,
}

impl WriteOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::DeleteAll => "delete_all",
        }
    }
}

pub(crate) enum Command {
    Write(WriteOp),
    /// Answered once every earlier command has been applied and published.
    Flush(oneshot::Sender<()>),
}

/// Counters exposed for diagnostics.
#[derive(Debug, Default)]
pub(crate) struct WriteStats {
    applied: AtomicU64,
    failed: AtomicU64,
}

impl WriteStats {
    pub(crate) fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub(crate) struct Writer {
    conn: Connection,
    seed_pending: bool,
    feed: Arc<NotesFeed>,
    stats: Arc<WriteStats>,
}

impl Writer {
    pub(crate) fn new(
        conn: Connection,
        seed_pending: bool,
        feed: Arc<NotesFeed>,
        stats: Arc<WriteStats>,
    ) -> Self {
        Self {
            conn,
            seed_pending,
            feed,
            stats,
        }
    }

    pub(crate) fn spawn(
        self,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || self.run(commands))
    }

    fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(
            "event=writer_start module=store status=ok seed_pending={}",
            self.seed_pending
        );
        if self.seed_pending {
            self.seed();
        }
        self.publish();

        while let Some(command) = commands.blocking_recv() {
            match command {
                Command::Write(op) => {
                    if self.apply(op) {
                        self.publish();
                    }
                }
                Command::Flush(reply) => {
                    let _ = reply.send(());
                }
            }
        }

        info!(
            "event=writer_stop module=store status=ok applied={} failed={}",
            self.stats.applied(),
            self.stats.failed()
        );
    }

    fn seed(&mut self) {
        let started_at = Instant::now();
        let drafts = seed_notes();
        match SqliteNoteDao::new(&mut self.conn).seed_notes(&drafts) {
            Ok(ids) => {
                info!(
                    "event=store_seed module=store status=ok rows={} duration_ms={}",
                    ids.len(),
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "event=store_seed module=store status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
            }
        }
    }

    fn apply(&mut self, op: WriteOp) -> bool {
        let started_at = Instant::now();
        let name = op.name();
        let mut dao = SqliteNoteDao::new(&mut self.conn);
        let result: RepoResult<String> = match &op {
            WriteOp::Insert(draft) => dao.insert_note(draft).map(|id| format!("note_id={id}")),
            WriteOp::Update(note) => dao
                .update_note(note)
                .map(|()| format!("note_id={}", note.id)),
            WriteOp::Delete(id) => dao.delete_note(*id).map(|()| format!("note_id={id}")),
            WriteOp::DeleteAll => dao.delete_all_notes().map(|rows| format!("rows={rows}")),
        };

        match result {
            Ok(detail) => {
                self.stats.applied.fetch_add(1, Ordering::Relaxed);
                info!(
                    "event=note_write module=store status=ok op={} {} duration_ms={}",
                    name,
                    detail,
                    started_at.elapsed().as_millis()
                );
                true
            }
            Err(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "event=note_write module=store status=error op={} duration_ms={} error_code={} error={}",
                    name,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                false
            }
        }
    }

    fn publish(&mut self) {
        match SqliteNoteDao::new(&mut self.conn).list_notes() {
            Ok(notes) => {
                let count = notes.len();
                self.feed.publish(notes);
                info!(
                    "event=notes_publish module=store status=ok count={} observers={}",
                    count,
                    self.feed.observer_count()
                );
            }
            Err(err) => error!(
                "event=notes_publish module=store status=error error_code={} error={}",
                err.code(),
                err
            ),
        }
    }
}
