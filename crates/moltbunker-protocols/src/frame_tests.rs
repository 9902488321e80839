use super::*;

#[test]
fn test_frame_type_tags() {
    assert_eq!(FrameType::Data.as_byte(), 0x01);
    assert_eq!(FrameType::Resize.as_byte(), 0x02);
    assert_eq!(FrameType::Ping.as_byte(), 0x03);
    assert_eq!(FrameType::Pong.as_byte(), 0x04);
    assert_eq!(FrameType::Close.as_byte(), 0x05);
    assert_eq!(FrameType::Error.as_byte(), 0x06);
}

#[test]
fn test_encode_prepends_tag_only() {
    let encoded = encode(FrameType::Data, b"ls -la\n");
    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..], b"ls -la\n");
    assert_eq!(encoded.len(), 8);
}

#[test]
fn test_close_frame_is_single_byte() {
    assert_eq!(&ExecMessage::Close.encode()[..], &[0x05]);
}

#[test]
fn test_decode_empty_is_error() {
    assert_eq!(Frame::decode(Bytes::new()), Err(FrameError::Empty));
}

#[test]
fn test_decode_unknown_type() {
    assert_eq!(
        Frame::decode(vec![0x09u8, 1, 2]),
        Err(FrameError::UnknownType(0x09))
    );
    assert_eq!(Frame::decode(vec![0x00u8]), Err(FrameError::UnknownType(0x00)));
}

#[test]
fn test_decode_tag_without_payload() {
    let frame = Frame::decode(vec![0x03u8]).unwrap();
    assert_eq!(frame.frame_type, FrameType::Ping);
    assert!(frame.payload.is_empty());
}

#[test]
fn test_raw_roundtrip_for_every_type() {
    let payloads: [&[u8]; 4] = [b"", b"x", &[0x00, 0xff, 0x05], b"\x1b[A hello"];
    for frame_type in FrameType::ALL {
        for payload in payloads {
            let decoded = Frame::decode(encode(frame_type, payload)).unwrap();
            assert_eq!(decoded.frame_type, frame_type);
            assert_eq!(&decoded.payload[..], payload);
        }
    }
}

#[test]
fn test_raw_decode_does_not_validate_resize() {
    // Payload structure is checked by ExecMessage, not Frame.
    let frame = Frame::decode(vec![0x02u8, 0x00]).unwrap();
    assert_eq!(frame.frame_type, FrameType::Resize);
    assert_eq!(frame.payload.len(), 1);
}

#[test]
fn test_resize_big_endian_layout() {
    assert_eq!(encode_resize(120, 40), [0x00, 0x78, 0x00, 0x28]);
    assert_eq!(encode_resize(0x0102, 0x0304), [0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_resize_roundtrip_extremes() {
    for (cols, rows) in [(0, 0), (80, 24), (u16::MAX, 1), (1, u16::MAX), (u16::MAX, u16::MAX)] {
        let msg = ExecMessage::Resize { cols, rows };
        assert_eq!(ExecMessage::decode(msg.encode()).unwrap(), msg);
    }
}

#[test]
fn test_resize_rejects_wrong_length() {
    for len in [0usize, 1, 3, 5, 8] {
        let mut raw = vec![0x02];
        raw.extend(vec![0u8; len]);
        assert_eq!(
            ExecMessage::decode(raw),
            Err(FrameError::InvalidResize { len })
        );
    }
}

#[test]
fn test_error_frame_lossy_utf8() {
    let raw = vec![0x06, b'b', b'a', b'd', 0xff, b'!'];
    match ExecMessage::decode(raw).unwrap() {
        ExecMessage::Error(text) => assert_eq!(text, "bad\u{fffd}!"),
        other => panic!("expected error frame, got {:?}", other),
    }
}

#[test]
fn test_data_payload_is_zero_copy_slice() {
    let raw = Bytes::from_static(b"\x01hello");
    let msg = ExecMessage::decode(raw).unwrap();
    assert_eq!(msg, ExecMessage::Data(Bytes::from_static(b"hello")));
    assert_eq!(msg.frame_type(), FrameType::Data);
}

#[test]
fn test_control_frames_ignore_payload() {
    assert_eq!(ExecMessage::decode(vec![0x03u8, 0xaa]).unwrap(), ExecMessage::Ping);
    assert_eq!(ExecMessage::decode(vec![0x05u8, 0xaa]).unwrap(), ExecMessage::Close);
}

#[test]
fn test_try_from_conversions() {
    assert_eq!(FrameType::try_from(0x06u8), Ok(FrameType::Error));
    assert_eq!(FrameType::try_from(0x07u8), Err(FrameError::UnknownType(0x07)));

    let frame = Frame::decode(vec![0x06u8, b'n', b'o']).unwrap();
    assert_eq!(ExecMessage::try_from(frame), Ok(ExecMessage::Error("no".to_string())));

    let short = Frame::decode(vec![0x02u8, 0x00]).unwrap();
    assert!(ExecMessage::try_from(short).is_err());
}
