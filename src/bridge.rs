//! # Execution Bridge
//!
//! Message-passing boundary between callers and the isolated execution
//! context. The engine session lives on a dedicated worker thread; callers
//! share no mutable state with it apart from the progress registry, and all
//! traffic crosses two mpsc channels:
//!
//! ```text
//! caller ──Request{id, action}──▶ worker thread (EngineSession)
//!                                     │
//!   dispatcher ◀──Reply{id, result} / Progress{id, pct}──┘
//!       │
//!       ├─ Reply: resolve the pending call registered under `id`
//!       └─ Progress: invoke the handler registered under the counter id
//! ```
//!
//! ## Correlation
//!
//! Every call registers a `(request id, reply sender)` pair in the pending
//! table before sending its request; the dispatcher resolves exactly that
//! pair when the matching reply arrives. Concurrent outstanding calls can
//! never cross-resolve; there is deliberately no shared "current handler"
//! slot. Replies for unknown ids are dropped.
//!
//! ## Progress
//!
//! Progress messages resolve nothing; they are routed to the handler
//! registered under their counter id and the dispatcher keeps listening.
//! The owning import's completion is signaled separately by its own reply.
//! Events for unregistered ids are dropped.
//!
//! ## Ordering and teardown
//!
//! The request channel is FIFO: the worker executes strictly sequentially in
//! send order, so sequential calls from one caller complete in issue order.
//! `shut_down` closes the request channel; the worker drains outstanding
//! requests and exits, the dispatcher fails any still-pending calls with a
//! `Bridge` error once the message channel closes, and both threads are
//! joined. Calls after teardown fail immediately.

use crate::error::DbError;
use crate::session::EngineSession;
use crate::types::{ProgressEvent, ResultSet, Value};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

/// Callback registered for one long-running operation; receives the
/// percentage after each committed chunk.
pub type ProgressHandler = Box<dyn FnMut(u8) + Send>;

/// One operation the worker can perform against its session.
#[derive(Debug)]
pub enum Action {
    Open {
        image: Option<Vec<u8>>,
    },
    Exec {
        sql: String,
        params: Vec<Value>,
    },
    Import {
        table: String,
        data: ResultSet,
        progress_id: u64,
        chunk_size: usize,
    },
    Export,
    Close,
}

/// Success payload of one resolved call.
#[derive(Debug)]
pub enum Payload {
    Opened,
    Results(Vec<ResultSet>),
    Imported,
    Image(Vec<u8>),
    Closed,
}

struct Request {
    id: u64,
    action: Action,
}

enum Message {
    Reply {
        id: u64,
        result: Result<Payload, DbError>,
    },
    Progress(ProgressEvent),
}

type Pending = Arc<Mutex<HashMap<u64, mpsc::Sender<Result<Payload, DbError>>>>>;
type Registry = Arc<Mutex<HashMap<u64, ProgressHandler>>>;

/// Handle to the worker pair. Owned by the facade; dropping it tears the
/// worker down.
pub struct Bridge {
    requests: Mutex<Option<mpsc::Sender<Request>>>,
    pending: Pending,
    progress: Registry,
    next_request_id: AtomicU64,
    next_counter_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Spawns the worker and dispatcher threads around a fresh session.
    pub fn spawn() -> Bridge {
        let (req_tx, req_rx) = mpsc::channel::<Request>();
        let (msg_tx, msg_rx) = mpsc::channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let progress: Registry = Arc::new(Mutex::new(HashMap::new()));

        let worker = thread::spawn(move || {
            let mut session = EngineSession::new();
            while let Ok(Request { id, action }) = req_rx.recv() {
                let result = run_action(&mut session, action, &msg_tx);
                if msg_tx.send(Message::Reply { id, result }).is_err() {
                    break;
                }
            }
            session.close();
        });

        let dispatcher = thread::spawn({
            let pending = Arc::clone(&pending);
            let progress = Arc::clone(&progress);
            move || {
                while let Ok(msg) = msg_rx.recv() {
                    match msg {
                        Message::Reply { id, result } => {
                            let resolver = pending.lock().remove(&id);
                            // unknown ids are dropped; a resolver whose
                            // caller gave up is ignored
                            if let Some(resolver) = resolver {
                                let _ = resolver.send(result);
                            }
                        }
                        Message::Progress(event) => {
                            let mut registry = progress.lock();
                            if let Some(handler) = registry.get_mut(&event.id) {
                                handler(event.progress);
                            }
                        }
                    }
                }
                // worker is gone; fail whatever is still outstanding
                for (_, resolver) in pending.lock().drain() {
                    let _ = resolver.send(Err(DbError::Bridge(
                        "worker terminated before replying".to_string(),
                    )));
                }
            }
        });

        Bridge {
            requests: Mutex::new(Some(req_tx)),
            pending,
            progress,
            next_request_id: AtomicU64::new(0),
            next_counter_id: AtomicU64::new(0),
            worker: Mutex::new(Some(worker)),
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Sends one request and blocks until its correlated reply arrives.
    pub fn call(&self, action: Action) -> Result<Payload, DbError> {
        let Some(sender) = self.requests.lock().clone() else {
            return Err(DbError::Bridge("bridge is shut down".to_string()));
        };

        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (resolver, reply) = mpsc::channel();
        self.pending.lock().insert(id, resolver);

        if sender.send(Request { id, action }).is_err() {
            self.pending.lock().remove(&id);
            return Err(DbError::Bridge("bridge is shut down".to_string()));
        }
        // keep no sender clone alive while blocked, so teardown can proceed
        drop(sender);

        match reply.recv() {
            Ok(result) => result,
            Err(_) => Err(DbError::Bridge(
                "reply channel closed before resolution".to_string(),
            )),
        }
    }

    /// Registers a progress handler and returns its unique counter id.
    ///
    /// The handler runs on the dispatcher thread while the registry lock is
    /// held; it must not create or delete counters itself.
    pub fn create_progress_counter(&self, handler: impl FnMut(u8) + Send + 'static) -> u64 {
        let id = self.next_counter_id.fetch_add(1, Ordering::Relaxed);
        self.progress.lock().insert(id, Box::new(handler));
        id
    }

    /// Removes a counter; later events for its id are dropped.
    pub fn delete_progress_counter(&self, id: u64) {
        self.progress.lock().remove(&id);
    }

    /// Closes the request channel and joins both threads. Idempotent;
    /// outstanding calls resolve with a `Bridge` error.
    pub fn shut_down(&self) {
        drop(self.requests.lock().take());
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.dispatcher.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shut_down();
    }
}

fn run_action(
    session: &mut EngineSession,
    action: Action,
    messages: &mpsc::Sender<Message>,
) -> Result<Payload, DbError> {
    match action {
        Action::Open { image } => {
            session.open(image.as_deref())?;
            Ok(Payload::Opened)
        }
        Action::Exec { sql, params } => Ok(Payload::Results(session.exec(&sql, &params)?)),
        Action::Import {
            table,
            data,
            progress_id,
            chunk_size,
        } => {
            let mut sink = |event: ProgressEvent| {
                let _ = messages.send(Message::Progress(event));
            };
            session.import(&table, &data, progress_id, &mut sink, chunk_size)?;
            Ok(Payload::Imported)
        }
        Action::Export => Ok(Payload::Image(session.export()?)),
        Action::Close => {
            session.close();
            Ok(Payload::Closed)
        }
    }
}
