use frame_ingest::{FrameSource, TestPatternSource};
use visionfeed::encode;

#[test]
fn chunk_framing_is_exact() {
    let jpeg = vec![0xFFu8, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9];
    let chunk = encode::mjpeg_chunk(&jpeg);

    assert!(chunk.starts_with(b"--frame\r\n"));
    assert!(chunk.ends_with(b"\r\n\r\n"));

    let header = b"Content-Type: image/jpeg\r\n\r\n";
    let occurrences = chunk
        .windows(header.len())
        .filter(|window| *window == header)
        .count();
    assert_eq!(occurrences, 1, "exactly one image header per part");

    let body_start = b"--frame\r\n".len() + header.len();
    let body_end = chunk.len() - b"\r\n\r\n".len();
    assert_eq!(&chunk[body_start..body_end], jpeg.as_slice());
}

#[test]
fn encoded_frames_are_valid_jpeg() {
    let mut source = TestPatternSource::new(64, 48);
    let frame = source.capture().expect("frame");
    let image = encode::to_rgb_image(&frame).expect("rgb");
    let jpeg = encode::to_jpeg(&image, 85).expect("jpeg");

    assert!(jpeg.starts_with(&[0xFF, 0xD8]), "missing SOI marker");
    assert!(jpeg.ends_with(&[0xFF, 0xD9]), "missing EOI marker");

    let decoded = image::load_from_memory(&jpeg).expect("decodable jpeg");
    assert_eq!(decoded.width(), 64);
    assert_eq!(decoded.height(), 48);
}

#[test]
fn undersized_frame_buffers_are_rejected() {
    let frame = frame_ingest::Frame {
        data: vec![0u8; 10],
        width: 64,
        height: 48,
        timestamp_ms: 0,
        format: frame_ingest::FrameFormat::Bgr8,
    };
    assert!(encode::to_rgb_image(&frame).is_err());
}
