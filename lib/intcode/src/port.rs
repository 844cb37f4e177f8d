//! I/O boundary of a [`Machine`](crate::Machine).
//!
//! A machine only talks to the outside world through a [`Port`]. Returning
//! [`Poll::Pending`] from either method suspends the machine at the current
//! instruction; running it again retries the same instruction.

use std::{
    collections::VecDeque,
    sync::mpsc::{self, Receiver, Sender, SyncSender},
    task::Poll,
};

use crate::error::{Error, Result};

pub trait Port {
    fn input(&mut self) -> Poll<Result<i64>>;
    fn output(&mut self, value: i64) -> Poll<Result<()>>;
}

impl<P: Port + ?Sized> Port for &mut P {
    fn input(&mut self) -> Poll<Result<i64>> {
        (**self).input()
    }

    fn output(&mut self, value: i64) -> Poll<Result<()>> {
        (**self).output(value)
    }
}

/// In-memory input and output buffers.
///
/// Input that is not yet available makes the machine suspend, so a caller can
/// alternate between feeding input, running, and draining output.
#[derive(Clone, Debug, Default)]
pub struct Queue {
    input: VecDeque<i64>,
    output: VecDeque<i64>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_port(&mut self, buf: &[i64]) {
        self.input.extend(buf);
    }

    pub fn read_port(&mut self) -> Poll<i64> {
        if let Some(n) = self.output.pop_front() {
            Poll::Ready(n)
        } else {
            Poll::Pending
        }
    }

    /// Fills `buf` only if enough output is buffered, otherwise leaves the
    /// output untouched.
    pub fn read_exact(&mut self, buf: &mut [i64]) -> Poll<()> {
        let len = buf.len();
        if len > self.output.len() {
            return Poll::Pending;
        }
        for (c, n) in buf.iter_mut().zip(self.output.drain(..len)) {
            *c = n;
        }
        Poll::Ready(())
    }

    pub fn read_all(&mut self) -> Vec<i64> {
        self.output.drain(..).collect()
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl Port for Queue {
    fn input(&mut self) -> Poll<Result<i64>> {
        match self.input.pop_front() {
            Some(v) => Poll::Ready(Ok(v)),
            None => Poll::Pending,
        }
    }

    fn output(&mut self, value: i64) -> Poll<Result<()>> {
        self.output.push_back(value);
        Poll::Ready(Ok(()))
    }
}

/// Synchronous callbacks invoked at each input and output instruction.
pub struct Callbacks<I, O> {
    provide: I,
    consume: O,
}

impl<I, O> Callbacks<I, O>
where
    I: FnMut() -> i64,
    O: FnMut(i64),
{
    pub fn new(provide: I, consume: O) -> Self {
        Callbacks { provide, consume }
    }
}

impl<I, O> Port for Callbacks<I, O>
where
    I: FnMut() -> i64,
    O: FnMut(i64),
{
    fn input(&mut self) -> Poll<Result<i64>> {
        Poll::Ready(Ok((self.provide)()))
    }

    fn output(&mut self, value: i64) -> Poll<Result<()>> {
        (self.consume)(value);
        Poll::Ready(Ok(()))
    }
}

/// Sending half of a conduit. A bounded sink blocks while the conduit is full.
#[derive(Clone, Debug)]
pub enum Sink {
    Unbounded(Sender<i64>),
    Bounded(SyncSender<i64>),
}

impl Sink {
    pub fn send(&self, value: i64) -> Result<()> {
        let sent = match self {
            Sink::Unbounded(tx) => tx.send(value),
            Sink::Bounded(tx) => tx.send(value),
        };
        sent.map_err(|_| Error::OutputClosed)
    }
}

impl From<Sender<i64>> for Sink {
    fn from(tx: Sender<i64>) -> Self {
        Sink::Unbounded(tx)
    }
}

impl From<SyncSender<i64>> for Sink {
    fn from(tx: SyncSender<i64>) -> Self {
        Sink::Bounded(tx)
    }
}

/// Creates a conduit. `None` is unbounded, `Some(n)` holds at most `n` values
/// before the sender blocks (`Some(0)` is a rendezvous).
pub fn conduit(capacity: Option<usize>) -> (Sink, Receiver<i64>) {
    match capacity {
        Some(n) => {
            let (tx, rx) = mpsc::sync_channel(n);
            (Sink::Bounded(tx), rx)
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (Sink::Unbounded(tx), rx)
        }
    }
}

/// Blocking conduit ends. Never returns `Pending`.
#[derive(Debug)]
pub struct Channels {
    pub input: Receiver<i64>,
    pub output: Sink,
}

impl Channels {
    pub fn new(input: Receiver<i64>, output: impl Into<Sink>) -> Self {
        Channels {
            input,
            output: output.into(),
        }
    }
}

impl Port for Channels {
    fn input(&mut self) -> Poll<Result<i64>> {
        Poll::Ready(self.input.recv().map_err(|_| Error::InputClosed))
    }

    fn output(&mut self, value: i64) -> Poll<Result<()>> {
        Poll::Ready(self.output.send(value))
    }
}
