use wallpaper::{Placement, Size, cover};

fn assert_covers(frame: Size, natural: Size, p: Placement) {
    assert!(p.width >= frame.width, "width {} < frame {}", p.width, frame.width);
    assert!(p.height >= frame.height, "height {} < frame {}", p.height, frame.height);
    let r0 = natural.width / natural.height;
    let r1 = p.width / p.height;
    assert!((r0 - r1).abs() <= r0 * 1e-9, "aspect changed: {r0} vs {r1}");
    assert!(p.left <= 0.0 && p.top <= 0.0, "offsets not centered: {p:?}");
    assert_eq!(p.left, -(p.width - frame.width) / 2.0);
    assert_eq!(p.top, -(p.height - frame.height) / 2.0);
}

#[test]
fn wide_media_on_landscape_frame() {
    let p = cover(Size::new(800.0, 600.0), Size::new(1600.0, 400.0)).unwrap();
    assert_eq!(
        p,
        Placement {
            width: 2400.0,
            height: 600.0,
            left: -800.0,
            top: 0.0,
        }
    );
}

#[test]
fn tall_media_on_square_frame_widens() {
    let p = cover(Size::new(400.0, 400.0), Size::new(100.0, 200.0)).unwrap();
    assert_eq!(
        p,
        Placement {
            width: 400.0,
            height: 800.0,
            left: 0.0,
            top: -200.0,
        }
    );
}

#[test]
fn matching_aspect_fills_exactly() {
    let p = cover(Size::new(1920.0, 1080.0), Size::new(3840.0, 2160.0)).unwrap();
    assert_eq!((p.width, p.height, p.left, p.top), (1920.0, 1080.0, 0.0, 0.0));
}

#[test]
fn small_media_is_upscaled() {
    let frame = Size::new(1920.0, 1080.0);
    let natural = Size::new(320.0, 240.0);
    let p = cover(frame, natural).unwrap();
    assert_eq!(p.width, 1920.0);
    assert_covers(frame, natural, p);
}

#[test]
fn covers_across_frames_and_media() {
    let frames = [(800.0, 600.0), (1080.0, 1920.0), (1.0, 1000.0), (333.0, 333.0)];
    let media = [(1600.0, 400.0), (100.0, 200.0), (4032.0, 3024.0), (7.0, 3.0), (1.0, 1.0)];
    for (fw, fh) in frames {
        for (mw, mh) in media {
            let frame = Size::new(fw, fh);
            let natural = Size::new(mw, mh);
            let p = cover(frame, natural).unwrap();
            assert_covers(frame, natural, p);
        }
    }
}

#[test]
fn same_inputs_same_output() {
    let frame = Size::new(1366.0, 768.0);
    let natural = Size::new(1024.0, 1024.0);
    assert_eq!(cover(frame, natural).unwrap(), cover(frame, natural).unwrap());
}
