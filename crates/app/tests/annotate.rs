use detect_core::Detection;
use frame_ingest::{Frame, FrameFormat};
use image::Rgb;
use visionfeed::{annotate, encode};

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

fn gray_frame(width: i32, height: i32) -> Frame {
    Frame {
        data: vec![128u8; (width * height * 3) as usize],
        width,
        height,
        timestamp_ms: 0,
        format: FrameFormat::Bgr8,
    }
}

fn detection(class_id: i64, center: (f32, f32), width: f32, height: f32, conf: f32) -> Detection {
    Detection {
        class_id,
        center,
        width,
        height,
        confidence: conf,
    }
}

#[test]
fn scenario_box_is_drawn_at_center_plus_minus_half_extent() {
    let frame = gray_frame(200, 200);
    let det = detection(2, (100.0, 100.0), 40.0, 60.0, 0.87);

    assert_eq!(annotate::corners(&det, 200, 200), (80, 70, 120, 130));

    let mut image = encode::to_rgb_image(&frame).expect("rgb");
    annotate::draw_detections(&mut image, &[det]);

    // All four edges of the rectangle.
    for x in 80..=120 {
        assert_eq!(image.get_pixel(x, 70), &GREEN, "top edge at x={x}");
        assert_eq!(image.get_pixel(x, 130), &GREEN, "bottom edge at x={x}");
    }
    for y in 70..=130 {
        assert_eq!(image.get_pixel(80, y), &GREEN, "left edge at y={y}");
        assert_eq!(image.get_pixel(120, y), &GREEN, "right edge at y={y}");
    }
    // Interior untouched.
    assert_eq!(image.get_pixel(100, 100), &Rgb([128, 128, 128]));
}

#[test]
fn scenario_label_sits_just_above_the_top_left_corner() {
    let frame = gray_frame(200, 200);
    let det = detection(2, (100.0, 100.0), 40.0, 60.0, 0.87);
    let mut image = encode::to_rgb_image(&frame).expect("rgb");
    annotate::draw_detections(&mut image, &[det]);

    // "Class: 2, Conf: 0.87" starts near (80, 60): glyph pixels in the 7-px
    // band above the box, none overlapping the box top edge.
    let mut label_pixels = 0;
    for y in 60..67 {
        for x in 80..200 {
            if image.get_pixel(x, y) == &GREEN {
                label_pixels += 1;
            }
        }
    }
    assert!(label_pixels > 0, "no label pixels found near (80, 60)");
    for x in 0..80 {
        for y in 60..67 {
            assert_ne!(image.get_pixel(x, y), &GREEN, "label leaked left of the box");
        }
    }
}

#[test]
fn one_rectangle_per_detection() {
    let frame = gray_frame(200, 200);
    let detections = vec![
        detection(0, (30.0, 30.0), 20.0, 20.0, 0.5),
        detection(1, (100.0, 100.0), 20.0, 20.0, 0.6),
        detection(2, (170.0, 170.0), 20.0, 20.0, 0.7),
    ];
    let mut image = encode::to_rgb_image(&frame).expect("rgb");
    annotate::draw_detections(&mut image, &detections);

    for det in &detections {
        let (left, top, right, bottom) = annotate::corners(det, 200, 200);
        assert_eq!(image.get_pixel(left as u32, top as u32), &GREEN);
        assert_eq!(image.get_pixel(right as u32, bottom as u32), &GREEN);
        // Box interiors stay untouched.
        let (cx, cy) = det.center;
        assert_eq!(image.get_pixel(cx as u32, cy as u32), &Rgb([128, 128, 128]));
    }
}

#[test]
fn out_of_bounds_geometry_is_clamped_not_panicking() {
    let frame = gray_frame(100, 100);
    let detections = vec![
        detection(0, (-50.0, -50.0), 40.0, 40.0, 0.9),
        detection(1, (150.0, 150.0), 400.0, 400.0, 0.9),
        detection(2, (50.0, 50.0), 1000.0, 1000.0, 0.9),
    ];
    assert_eq!(annotate::corners(&detections[0], 100, 100), (0, 0, 0, 0));
    assert_eq!(annotate::corners(&detections[2], 100, 100), (0, 0, 99, 99));

    let mut image = encode::to_rgb_image(&frame).expect("rgb");
    annotate::draw_detections(&mut image, &detections);
    // Full-frame box leaves its border on the image edge.
    assert_eq!(image.get_pixel(0, 50), &GREEN);
    assert_eq!(image.get_pixel(99, 50), &GREEN);
}

#[test]
fn empty_detections_leave_the_frame_pixel_identical() {
    let frame = gray_frame(64, 48);
    let reference = encode::to_rgb_image(&frame).expect("rgb");
    let mut image = encode::to_rgb_image(&frame).expect("rgb");
    annotate::draw_detections(&mut image, &[]);
    assert_eq!(image.as_raw(), reference.as_raw());
}
