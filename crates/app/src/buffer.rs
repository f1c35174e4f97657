use std::sync::{Arc, Mutex};

use crate::data::FramePacket;

/// Single-slot latest-wins frame buffer.
///
/// The pipeline loop is the only writer; any number of stream sessions read
/// concurrently. Each publish swaps the whole `Arc` under the lock, so a
/// reader either sees the previous frame or the new one, never a mixture,
/// and a snapshot stays valid after later publishes. Readers hold the lock
/// only for the pointer clone, never across I/O.
#[derive(Default)]
pub struct FrameBuffer {
    slot: Mutex<Option<Arc<FramePacket>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered frame. Pipeline loop only.
    pub fn publish(&self, packet: FramePacket) {
        let packet = Arc::new(packet);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(packet);
        }
    }

    /// Snapshot the most recent frame. `None` until the first publish.
    pub fn snapshot(&self) -> Option<Arc<FramePacket>> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        }
    }
}
