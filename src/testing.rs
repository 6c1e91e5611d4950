//! Test doubles: a fake clock, a scripted transport and a recording publisher.

use crate::publish::{Channel, Publisher, Reading, Target};
use crate::transport::{Clock, Transport};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Clock that only moves when somebody sleeps.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// Transport whose receive side releases chunks of bytes at fixed points in
/// fake time. Replies can also be queued per written command.
#[derive(Debug)]
pub struct ScriptedTransport {
    clock: FakeClock,
    pending: VecDeque<(Duration, Vec<u8>)>,
    rx: VecDeque<u8>,
    written: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn new(clock: FakeClock, script: &[(u64, &[u8])]) -> Self {
        Self {
            clock,
            pending: script
                .iter()
                .map(|(at, bytes)| (Duration::from_millis(*at), bytes.to_vec()))
                .collect(),
            rx: VecDeque::new(),
            written: Vec::new(),
            replies: VecDeque::new(),
        }
    }

    /// Queues a reply that becomes readable right after the next write.
    pub fn reply(&mut self, bytes: &[u8]) -> &mut Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    fn release(&mut self) {
        let now = self.clock.now();
        while self.pending.front().is_some_and(|(at, _)| *at <= now) {
            if let Some((_, bytes)) = self.pending.pop_front() {
                self.rx.extend(bytes);
            }
        }
    }
}

impl Transport for ScriptedTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.release();
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.release();
        Ok(self.rx.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Owned {
    Number(f32),
    Text(String),
}

/// Publisher that remembers everything it was handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    pub published: Rc<RefCell<Vec<(Target, Channel, Owned)>>>,
    pub cycles: Rc<Cell<usize>>,
}

impl RecordingPublisher {
    pub fn get(&self, target: Target, channel: Channel) -> Vec<Owned> {
        self.published
            .borrow()
            .iter()
            .filter(|(t, c, _)| *t == target && *c == channel)
            .map(|(_, _, v)| v.clone())
            .collect()
    }

    pub fn last_number(&self, target: Target, channel: Channel) -> Option<f32> {
        self.get(target, channel).into_iter().rev().find_map(|v| match v {
            Owned::Number(n) => Some(n),
            Owned::Text(_) => None,
        })
    }

    pub fn last_text(&self, target: Target, channel: Channel) -> Option<String> {
        self.get(target, channel).into_iter().rev().find_map(|v| match v {
            Owned::Text(s) => Some(s),
            Owned::Number(_) => None,
        })
    }

    pub fn clear(&self) {
        self.published.borrow_mut().clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        let value = match reading {
            Reading::Number(n) => Owned::Number(n),
            Reading::Text(s) => Owned::Text(s.to_string()),
        };
        self.published.borrow_mut().push((target, channel, value));
    }

    fn end_cycle(&mut self) {
        self.cycles.set(self.cycles.get() + 1);
    }
}
