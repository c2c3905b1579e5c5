//! Inter-core queues.
//!
//! Both directions are lock-free single-producer/single-consumer rings
//! (`heapless::spsc`).  The control core owns the consumer half of the
//! command queue and the producer half of the status queue; neither side
//! ever blocks.
//!
//! ```text
//! ┌────────────────┐  CommandFrame   ┌────────────────┐
//! │ Companion core │────────────────▶│  Control loop  │
//! │                │◀────────────────│  (100 ms tick) │
//! └────────────────┘ StatusSnapshot  └────────────────┘
//! ```
//!
//! `heapless::spsc::Queue<T, N>` holds `N - 1` elements.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::app::commands::CommandFrame;
use crate::app::events::StatusSnapshot;
use crate::app::ports::{CommandSource, StatusSink};

/// Ring size of the command queue (holds one less).
pub const COMMAND_QUEUE_LEN: usize = 9;

/// Ring size of the status queue: exactly one snapshot in flight.
pub const STATUS_QUEUE_LEN: usize = 2;

pub type CommandQueue = Queue<CommandFrame, COMMAND_QUEUE_LEN>;
pub type StatusQueue = Queue<StatusSnapshot, STATUS_QUEUE_LEN>;

pub type CommandProducer<'a> = Producer<'a, CommandFrame, COMMAND_QUEUE_LEN>;
pub type CommandConsumer<'a> = Consumer<'a, CommandFrame, COMMAND_QUEUE_LEN>;
pub type StatusProducer<'a> = Producer<'a, StatusSnapshot, STATUS_QUEUE_LEN>;
pub type StatusConsumer<'a> = Consumer<'a, StatusSnapshot, STATUS_QUEUE_LEN>;

impl<const N: usize> CommandSource for Consumer<'_, CommandFrame, N> {
    fn is_empty(&self) -> bool {
        !self.ready()
    }

    fn remove(&mut self) -> Option<CommandFrame> {
        self.dequeue()
    }
}

impl<const N: usize> StatusSink for Producer<'_, StatusSnapshot, N> {
    fn is_full(&self) -> bool {
        !self.ready()
    }

    fn try_add(&mut self, snapshot: StatusSnapshot) -> Result<(), StatusSnapshot> {
        self.enqueue(snapshot)
    }
}
