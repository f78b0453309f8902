use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;

use crate::traits::Link;

const INITIAL_QUEUE_CAPACITY: usize = 256;

type Queue = Arc<Mutex<BytesMut>>;

/// One endpoint of an in-process byte pipe.
///
/// [`pair`] returns two connected endpoints; bytes written to one become
/// available on the other. Both ends implement [`Link`], so one can be
/// attached to a device channel while a test drives the other as the host.
pub struct MemoryLink {
    rx: Queue,
    tx: Queue,
}

/// Create a connected pair of in-memory links.
pub fn pair() -> (MemoryLink, MemoryLink) {
    let a_to_b = Arc::new(Mutex::new(BytesMut::with_capacity(INITIAL_QUEUE_CAPACITY)));
    let b_to_a = Arc::new(Mutex::new(BytesMut::with_capacity(INITIAL_QUEUE_CAPACITY)));

    let a = MemoryLink {
        rx: Arc::clone(&b_to_a),
        tx: Arc::clone(&a_to_b),
    };
    let b = MemoryLink {
        rx: a_to_b,
        tx: b_to_a,
    };
    (a, b)
}

impl Link for MemoryLink {
    fn available(&mut self) -> usize {
        self.rx.lock().len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut queue = self.rx.lock();
        let n = queue.len().min(buf.len());
        buf[..n].copy_from_slice(&queue[..n]);
        queue.advance(n);
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        self.tx.lock().extend_from_slice(buf);
        buf.len()
    }
}
