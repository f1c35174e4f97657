use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use visionfeed::{FrameBuffer, FramePacket};

fn packet(seq: u64, fill: u8, len: usize) -> FramePacket {
    FramePacket {
        jpeg: vec![fill; len],
        frame_number: seq,
        timestamp_ms: seq as i64,
        fps: 30.0,
        detections: Vec::new(),
    }
}

#[test]
fn empty_buffer_reports_no_frame_yet() {
    let buffer = FrameBuffer::new();
    assert!(buffer.snapshot().is_none());
}

#[test]
fn snapshot_survives_a_later_publish() {
    let buffer = FrameBuffer::new();
    buffer.publish(packet(1, 0x11, 16));
    let old = buffer.snapshot().expect("first frame");
    buffer.publish(packet(2, 0x22, 16));

    assert_eq!(old.frame_number, 1);
    assert!(old.jpeg.iter().all(|&b| b == 0x11));
    let new = buffer.snapshot().expect("second frame");
    assert_eq!(new.frame_number, 2);
    assert!(new.jpeg.iter().all(|&b| b == 0x22));
}

#[test]
fn fifty_concurrent_readers_never_observe_a_torn_frame() {
    const READERS: usize = 50;
    const MIN_PUBLISHES: u64 = 400;
    const PAYLOAD: usize = 4096;

    let buffer = Arc::new(FrameBuffer::new());
    let done = Arc::new(AtomicBool::new(false));
    let readers_with_frames = Arc::new(AtomicUsize::new(0));

    let mut readers = Vec::with_capacity(READERS);
    for _ in 0..READERS {
        let buffer = buffer.clone();
        let done = done.clone();
        let readers_with_frames = readers_with_frames.clone();
        readers.push(thread::spawn(move || {
            let mut seen: u64 = 0;
            let mut last_seq: u64 = 0;
            while !done.load(Ordering::Relaxed) {
                if let Some(snapshot) = buffer.snapshot() {
                    // Each publish fills the payload with one byte derived
                    // from its sequence; a mixed payload means a torn read.
                    let expected = (snapshot.frame_number % 251) as u8;
                    assert!(
                        snapshot.jpeg.iter().all(|&b| b == expected),
                        "torn frame at seq {}",
                        snapshot.frame_number
                    );
                    assert!(
                        snapshot.frame_number >= last_seq,
                        "sequence went backwards"
                    );
                    last_seq = snapshot.frame_number;
                    if seen == 0 {
                        readers_with_frames.fetch_add(1, Ordering::SeqCst);
                    }
                    seen += 1;
                }
            }
            seen
        }));
    }

    // Keep the writer going until every reader has reported at least one
    // observation, so shutdown never outruns thread scheduling. The deadline
    // only bounds the test if a reader dies without reporting.
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seq: u64 = 0;
    while seq < MIN_PUBLISHES
        || (readers_with_frames.load(Ordering::SeqCst) < READERS && Instant::now() < deadline)
    {
        seq += 1;
        buffer.publish(packet(seq, (seq % 251) as u8, PAYLOAD));
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        let seen = reader.join().expect("reader panicked");
        assert!(seen > 0, "reader never observed a frame");
    }
}
