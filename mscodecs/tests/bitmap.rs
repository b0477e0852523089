use mscodecs::bitmap::{self, DecodeError, FrameGeometry, TransparencyMap, TransparencyRun};

fn decode_plain(src: &[u8], width: u32, height: u32) -> (Vec<u8>, TransparencyMap) {
    bitmap::decode(src, &FrameGeometry::new(width, height), None).unwrap()
}

#[test]
fn literal_run_example() {
    // The canonical five-pixel example stream: header, one literal run, EOR.
    let (pixels, map) = decode_plain(&[0x00, 0x00, 0x05, 0x2a, 0x00, 0x00], 5, 1);
    assert_eq!(pixels, [0x2a; 5]);
    assert!(map.is_empty());
}

#[test]
fn literal_run_sets_exactly_n_pixels() {
    let (pixels, _) = decode_plain(&[0x07, 0x33, 0x00, 0x00], 10, 1);
    assert_eq!(&pixels[..7], &[0x33; 7]);
    assert_eq!(&pixels[7..], &[0x00; 3]);
}

#[test]
fn header_skip_is_idempotent() {
    let body = [0x03, 0x2a, 0x02, 0x11, 0x00, 0x01];
    let with_header: Vec<u8> = [0x00, 0x00].iter().chain(&body).copied().collect();

    let (bare, _) = decode_plain(&body, 5, 1);
    let (headered, _) = decode_plain(&with_header, 5, 1);
    assert_eq!(bare, headered);
    assert_eq!(bare, [0x2a, 0x2a, 0x2a, 0x11, 0x11]);
}

#[test]
fn short_streams_decode_to_blank_canvas() {
    for src in [&[][..], &[0x00][..], &[0x00, 0x00][..]] {
        let (pixels, map) = decode_plain(src, 4, 3);
        assert_eq!(pixels, [0x00; 12]);
        assert!(map.is_empty());
    }
}

#[test]
fn raw_run_skips_padding_byte_after_odd_length() {
    // Raw run of 5 ends at an odd stream position, so one pad byte (0x99)
    // must be skipped before the next token.
    let src = [
        0x00, 0x00, // header
        0x00, 0x05, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, // raw run of 5
        0x99, // padding
        0x03, 0x11, // literal run of 3
        0x00, 0x01, // end of image
    ];
    let (pixels, _) = decode_plain(&src, 8, 1);
    assert_eq!(pixels, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x11, 0x11, 0x11]);
}

#[test]
fn raw_run_with_even_length_has_no_padding() {
    let src = [
        0x00, 0x00, // header
        0x00, 0x04, 0xaa, 0xbb, 0xcc, 0xdd, // raw run of 4, ends even
        0x02, 0x11, // literal run of 2
        0x00, 0x01,
    ];
    let (pixels, _) = decode_plain(&src, 6, 1);
    assert_eq!(pixels, [0xaa, 0xbb, 0xcc, 0xdd, 0x11, 0x11]);
}

#[test]
fn reposition_moves_cursor_without_writing() {
    let src = [
        0x00, 0x00, // header
        0x01, 0x11, // one pixel
        0x00, 0x03, 0x02, 0x00, // skip two columns
        0x02, 0x22, // two pixels
        0x00, 0x01,
    ];
    let (pixels, _) = decode_plain(&src, 6, 1);
    assert_eq!(pixels, [0x11, 0x00, 0x00, 0x22, 0x22, 0x00]);
}

#[test]
fn end_of_image_halts_mid_row_and_leaves_rest_zero() {
    let src = [
        0x00, 0x00, // header
        0x02, 0x22, // two of four pixels on row 0
        0x00, 0x01, // end of image
        0xde, 0xad, // never consumed
    ];
    let (pixels, _) = decode_plain(&src, 4, 2);
    assert_eq!(pixels, [0x22, 0x22, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn input_exhaustion_at_token_boundary_ends_image() {
    let (pixels, map) = decode_plain(&[0x00, 0x00, 0x05, 0x2a], 5, 2);
    assert_eq!(&pixels[..5], &[0x2a; 5]);
    assert_eq!(&pixels[5..], &[0x00; 5]);
    assert!(map.is_empty());
}

#[test]
fn truncated_mid_token_is_an_error() {
    let geometry = FrameGeometry::new(8, 2);
    let cases: &[&[u8]] = &[
        &[0x00, 0x00, 0x05],             // literal run with no color byte
        &[0x00, 0x00, 0x00],             // escape with no opcode
        &[0x00, 0x00, 0x00, 0x03, 0x05], // reposition missing delta-y
        &[0x00, 0x00, 0x00, 0x06, 0x01, 0x02, 0x03], // short raw-run payload
    ];
    for src in cases {
        let err = bitmap::decode(src, &geometry, None).unwrap_err();
        assert!(
            matches!(err, DecodeError::TruncatedStream { .. }),
            "{src:02x?} gave {err:?}"
        );
    }
}

#[test]
fn frame_placed_inside_larger_canvas() {
    let src = [
        0x00, 0x00, // header
        0x02, 0xaa, 0x00, 0x00, // row 0 of the frame
        0x02, 0xbb, 0x00, 0x01, // row 1, then end of image
    ];
    let geometry = FrameGeometry::new(2, 2).on_canvas(4, 4).at(1, 1);
    let (pixels, _) = bitmap::decode(&src, &geometry, None).unwrap();

    let mut expected = [0x00u8; 16];
    expected[4 + 1] = 0xaa;
    expected[4 + 2] = 0xaa;
    expected[8 + 1] = 0xbb;
    expected[8 + 2] = 0xbb;
    assert_eq!(pixels, expected);
}

#[test]
fn geometry_overflow_is_reported() {
    let geometry = FrameGeometry::new(5, 1).on_canvas(5, 1).at(1, 0);
    let err = bitmap::decode(&[0x00, 0x00], &geometry, None).unwrap_err();
    assert!(matches!(err, DecodeError::GeometryOverflow { .. }));
}

#[test]
fn keyframe_size_mismatch_is_reported() {
    let geometry = FrameGeometry::new(4, 1);
    let err = bitmap::decode(&[0x00, 0x00], &geometry, Some(&[0x01, 0x02])).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::SizeMismatch {
            expected: 4,
            actual: 2
        }
    ));
}

#[test]
fn run_past_canvas_edge_is_reported() {
    let err = bitmap::decode(&[0x00, 0x00, 0x08, 0x11], &FrameGeometry::new(4, 1), None)
        .unwrap_err();
    assert!(matches!(err, DecodeError::CanvasOverrun { .. }));
}

#[test]
fn decode_into_rejects_short_output() {
    let mut output = [0u8; 3];
    let err = bitmap::decode_into(&[0x00, 0x00], &FrameGeometry::new(4, 1), &mut output)
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::OutputTooSmall {
            expected: 4,
            actual: 3
        }
    ));
}

#[test]
fn transparency_run_uses_keyframe_when_present() {
    let src = [
        0x00, 0x00, // header
        0x01, 0x55, // opaque pixel at column 0
        0x00, 0x02, // arm transparency
        0x02, 0x00, // transparent literal run at columns 1..3
        0x00, 0x01,
    ];
    let geometry = FrameGeometry::new(4, 1);

    let (pixels, map) = bitmap::decode(&src, &geometry, None).unwrap();
    assert_eq!(pixels, [0x55, 0x00, 0x00, 0x00]);
    assert_eq!(map.runs(), [TransparencyRun { row: 0, col: 1, len: 2 }]);

    let keyframe = [0x01, 0x02, 0x03, 0x04];
    let (composited, _) = bitmap::decode(&src, &geometry, Some(&keyframe)).unwrap();
    assert_eq!(composited, [0x55, 0x02, 0x03, 0x00]);
}

#[test]
fn transparency_length_spans_an_intervening_reposition() {
    // Armed at column 0, cursor repositioned two columns right, then a
    // two-pixel literal run: the recorded run covers all four columns.
    let src = [
        0x00, 0x00, // header
        0x00, 0x02, // arm transparency
        0x00, 0x03, 0x02, 0x00, // reposition +2
        0x02, 0x00, // literal run at columns 2..4
        0x00, 0x01,
    ];
    let (_, map) = decode_plain(&src, 5, 1);
    assert_eq!(map.runs(), [TransparencyRun { row: 0, col: 0, len: 4 }]);
}

#[test]
fn arming_without_a_literal_run_records_nothing() {
    let src = [
        0x00, 0x00, // header
        0x00, 0x02, // arm transparency
        0x00, 0x00, // end of row with no literal run
        0x02, 0x77, 0x00, 0x01, // row 1
    ];
    let (_, map) = decode_plain(&src, 4, 2);
    assert!(map.is_empty());
}

#[test]
fn background_fallback_applies_only_without_runs() {
    let geometry = FrameGeometry::new(4, 1);
    let keyframe = [0x01, 0x02, 0x03, 0x04];

    // No transparency runs: every background-index pixel shows the keyframe.
    let plain = [0x00, 0x00, 0x02, 0x77, 0x02, 0x00, 0x00, 0x01];
    let (pixels, map) = bitmap::decode(&plain, &geometry, Some(&keyframe)).unwrap();
    assert!(map.is_empty());
    assert_eq!(pixels, [0x77, 0x77, 0x03, 0x04]);

    // One recorded run: background pixels outside it stay opaque.
    let with_run = [
        0x00, 0x00, // header
        0x00, 0x02, 0x01, 0x00, // transparent pixel at column 0
        0x02, 0x00, // plain background pixels at columns 1..3
        0x00, 0x01,
    ];
    let (pixels, map) = bitmap::decode(&with_run, &geometry, Some(&keyframe)).unwrap();
    assert_eq!(map.runs(), [TransparencyRun { row: 0, col: 0, len: 1 }]);
    assert_eq!(pixels, [0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn mask_round_trips_to_run_list() {
    let src = [
        0x00, 0x00, // header
        0x00, 0x02, 0x02, 0x00, // transparent run at (0, 0..2)
        0x01, 0x66, // opaque separator
        0x00, 0x02, 0x01, 0x00, // transparent run at (0, 3..4)
        0x00, 0x00, // end of row
        0x00, 0x02, 0x03, 0x00, // transparent run at (1, 0..3)
        0x00, 0x01,
    ];
    let (_, map) = decode_plain(&src, 5, 2);
    assert_eq!(
        map.runs(),
        [
            TransparencyRun { row: 0, col: 0, len: 2 },
            TransparencyRun { row: 0, col: 3, len: 1 },
            TransparencyRun { row: 1, col: 0, len: 3 },
        ]
    );

    let mask = map.to_mask();
    assert_eq!(
        mask,
        [
            0xff, 0xff, 0x00, 0xff, 0x00, //
            0xff, 0xff, 0xff, 0x00, 0x00,
        ]
    );
    assert_eq!(TransparencyMap::from_mask(&mask, 5).runs(), map.runs());
}
