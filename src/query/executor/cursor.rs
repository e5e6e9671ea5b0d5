// Row Cursor
//
// A procedure body runs on its own producer thread and hands rows to the
// caller one at a time over rendezvous channels. The producer blocks on every
// row until the consumer asks for the next one. When the body ends the
// producer drops its row channel and sends a single completion message.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, select, Receiver, Sender};
use log::debug;
use parking_lot::Mutex;

use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::Value;

/// Destination for rows produced by `return` and `return next`
pub trait RowSink {
    fn emit(&mut self, row: Vec<Value>) -> InterpreterResult<()>;
}

/// Nested procedure calls collect their rows in memory
impl RowSink for Vec<Vec<Value>> {
    fn emit(&mut self, row: Vec<Value>) -> InterpreterResult<()> {
        self.push(row);
        Ok(())
    }
}

/// Cooperative cancellation shared between a caller and running procedures.
///
/// Cancelling drops the token's internal sender, which disconnects every
/// cloned receiver at once, so blocked channel operations wake up.
#[derive(Debug, Clone)]
pub struct CancelToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    pub fn cancel(&self) {
        self.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Becomes ready (disconnected) once the token is cancelled
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a successful run, sent after the last row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cost_spent: i64,
    pub notices: Vec<String>,
}

#[derive(Debug)]
pub enum Completion {
    Finished(RunSummary),
    Failed(InterpreterError),
}

/// Producer side of the row channel
pub struct ChannelSink {
    rows: Sender<Vec<Value>>,
    cancel: CancelToken,
}

impl RowSink for ChannelSink {
    fn emit(&mut self, row: Vec<Value>) -> InterpreterResult<()> {
        select! {
            send(self.rows, row) -> sent => sent.map_err(|_| InterpreterError::Cancelled),
            recv(self.cancel.signal()) -> _ => Err(InterpreterError::Cancelled),
        }
    }
}

/// Thread settings for a producer
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

enum CursorState {
    Open,
    Finished(RunSummary),
    Failed,
}

/// Consumer side of a running procedure
pub struct Cursor {
    rows: Receiver<Vec<Value>>,
    completion: Receiver<Completion>,
    cancel: CancelToken,
    producer: Option<JoinHandle<()>>,
    state: CursorState,
}

impl Cursor {
    /// Start `body` on a producer thread. `body` emits rows into the sink it is
    /// given and returns how the run ended.
    pub fn spawn<F>(options: &ProducerOptions, cancel: &CancelToken, body: F) -> InterpreterResult<Self>
    where
        F: FnOnce(&mut ChannelSink) -> Completion + Send + 'static,
    {
        let (row_tx, row_rx) = bounded(0);
        let (done_tx, done_rx) = bounded(0);
        let producer_cancel = cancel.clone();

        let mut builder = thread::Builder::new().name(options.thread_name.clone());
        if let Some(size) = options.stack_size {
            builder = builder.stack_size(size);
        }

        let producer = builder
            .spawn(move || {
                let mut sink = ChannelSink {
                    rows: row_tx,
                    cancel: producer_cancel.clone(),
                };
                let completion = body(&mut sink);
                drop(sink);
                let delivered = select! {
                    send(done_tx, completion) -> sent => sent.is_ok(),
                    recv(producer_cancel.signal()) -> _ => false,
                };
                if !delivered {
                    debug!("Procedure producer finished after its consumer went away");
                }
            })
            .map_err(|e| InterpreterError::ExecutionError(format!("Failed to start producer thread: {}", e)))?;

        Ok(Self {
            rows: row_rx,
            completion: done_rx,
            cancel: cancel.clone(),
            producer: Some(producer),
            state: CursorState::Open,
        })
    }

    /// Pull the next row. Returns `Ok(None)` once the procedure has finished.
    pub fn next(&mut self) -> InterpreterResult<Option<Vec<Value>>> {
        if !matches!(self.state, CursorState::Open) {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            return self.fail(InterpreterError::Cancelled);
        }

        select! {
            recv(self.rows) -> row => match row {
                Ok(row) => Ok(Some(row)),
                Err(_) => self.await_completion(),
            },
            recv(self.completion) -> done => self.complete(done.ok()),
            recv(self.cancel.signal()) -> _ => self.fail(InterpreterError::Cancelled),
        }
    }

    /// Summary of a run that finished successfully
    pub fn summary(&self) -> Option<&RunSummary> {
        match &self.state {
            CursorState::Finished(summary) => Some(summary),
            _ => None,
        }
    }

    /// Drain every remaining row
    pub fn collect_rows(&mut self) -> InterpreterResult<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn await_completion(&mut self) -> InterpreterResult<Option<Vec<Value>>> {
        select! {
            recv(self.completion) -> done => self.complete(done.ok()),
            recv(self.cancel.signal()) -> _ => self.fail(InterpreterError::Cancelled),
        }
    }

    fn complete(&mut self, completion: Option<Completion>) -> InterpreterResult<Option<Vec<Value>>> {
        let joined = self.producer.take().map(|handle| handle.join().is_ok()).unwrap_or(true);
        match completion {
            Some(Completion::Finished(summary)) => {
                self.state = CursorState::Finished(summary);
                Ok(None)
            }
            Some(Completion::Failed(err)) => self.fail(err),
            None if !joined => self.fail(InterpreterError::ExecutionError("procedure producer panicked".to_string())),
            None => self.fail(InterpreterError::ExecutionError(
                "procedure producer exited without completing".to_string(),
            )),
        }
    }

    fn fail(&mut self, err: InterpreterError) -> InterpreterResult<Option<Vec<Value>>> {
        self.state = CursorState::Failed;
        Err(err)
    }
}
