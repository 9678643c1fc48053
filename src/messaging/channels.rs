// Lock-free SPSC channels between host, scheduler and audio threads

use std::thread;
use std::time::Duration;

use ringbuf::HeapRb;
use ringbuf::traits::{Producer, Split};

use crate::messaging::command::TimedCommand;
use crate::scheduler::PlaybackCommand;

/// Host input -> scheduling thread
pub type CommandProducer = ringbuf::HeapProd<TimedCommand>;
pub type CommandConsumer = ringbuf::HeapCons<TimedCommand>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<TimedCommand>::new(capacity);
    rb.split()
}

/// Push `command`, sleeping `retry` between attempts while the queue is full
///
/// For commands that must not be lost (`Quit`); the consumer polls every
/// scheduling pass, so the wait is bounded by one poll period.
pub fn push_until_accepted(tx: &mut CommandProducer, command: TimedCommand, retry: Duration) {
    let mut pending = command;
    while let Err(rejected) = tx.try_push(pending) {
        pending = rejected;
        thread::sleep(retry);
    }
}

/// Scheduling thread -> audio callback
pub type PlaybackProducer = ringbuf::HeapProd<PlaybackCommand>;
pub type PlaybackConsumer = ringbuf::HeapCons<PlaybackCommand>;

pub fn create_playback_channel(capacity: usize) -> (PlaybackProducer, PlaybackConsumer) {
    let rb = HeapRb::<PlaybackCommand>::new(capacity);
    rb.split()
}
