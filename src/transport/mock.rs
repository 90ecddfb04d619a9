//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportFuture};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// Something that happened on the mock link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockEvent {
    Open,
    Write(Vec<u8>),
    Read(u8),
    Timeout,
    Clear,
}

#[derive(Default)]
struct MockState {
    open: bool,
    fail_open: bool,
    fail_writes: bool,
    rx: VecDeque<u8>,
    script: VecDeque<Vec<Vec<u8>>>,
    responder: Option<Responder>,
    events: Vec<MockEvent>,
}

/// Clonable handle to a shared mock link; keep one clone to inspect the log.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queues bytes that are readable right away.
    pub(crate) fn push_rx(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes);
    }

    /// Queues the replies delivered after the next unanswered write.
    pub(crate) fn reply_with(&self, replies: &[&[u8]]) {
        self.lock()
            .script
            .push_back(replies.iter().map(|r| r.to_vec()).collect());
    }

    /// Answers every unscripted write through `responder`.
    pub(crate) fn respond_with(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
        self.lock().responder = Some(Box::new(responder));
    }

    pub(crate) fn fail_open(&self) {
        self.lock().fail_open = true;
    }

    pub(crate) fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    pub(crate) fn restore_writes(&self) {
        self.lock().fail_writes = false;
    }

    pub(crate) fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().rx.len()
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            if state.fail_open {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no such device",
                )));
            }
            state.open = true;
            state.events.push(MockEvent::Open);
            Ok(())
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.lock().open = false;
            Ok(())
        })
    }

    fn write(&mut self, data: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            // Give other tasks a chance to run between lock and I/O
            tokio::task::yield_now().await;
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.fail_writes {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "cable unplugged",
                )));
            }
            state.events.push(MockEvent::Write(data.to_vec()));
            if let Some(replies) = state.script.pop_front() {
                for reply in replies {
                    state.rx.extend(reply);
                }
            } else if let Some(responder) = state.responder.as_mut() {
                let reply = responder(&data[..]);
                state.rx.extend(reply);
            }
            Ok(())
        })
    }

    fn read_byte(&mut self) -> TransportFuture<'_, Option<u8>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut state = self.lock();
            if let Some(byte) = state.rx.pop_front() {
                state.events.push(MockEvent::Read(byte));
                Ok(Some(byte))
            } else {
                state.events.push(MockEvent::Timeout);
                Ok(None)
            }
        })
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        Ok(self.lock().rx.len())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.rx.clear();
        state.events.push(MockEvent::Clear);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}
