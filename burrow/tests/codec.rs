#[cfg(test)]
mod tests {
    use burrow::{AmqpCodec, CodecError, Decoded, FRAME_MAX_SIZE, FrameCodec, FrameKind, RawFrame};

    #[test]
    fn test_heartbeat_wire_format() {
        let bytes = AmqpCodec::new().marshal(&RawFrame::heartbeat(), 0);
        assert_eq!(&bytes[..], &[8, 0, 0, 0, 0, 0, 0, 0xCE]);
    }

    #[test]
    fn test_header_carries_channel_and_size() {
        let frame = RawFrame::new(FrameKind::Method, vec![0x00, 0x0A, 0x00, 0x0B]);
        let bytes = AmqpCodec::new().marshal(&frame, 0x0102);

        assert_eq!(&bytes[..7], &[1, 0x01, 0x02, 0, 0, 0, 4]);
        assert_eq!(&bytes[7..11], &[0x00, 0x0A, 0x00, 0x0B]);
        assert_eq!(bytes[11], 0xCE);
    }

    #[test]
    fn test_unmarshal_reports_consumed_bytes() {
        let codec = AmqpCodec::new();
        let frame = RawFrame::new(FrameKind::Body, &b"payload"[..]);

        let mut stream = codec.marshal(&frame, 7).to_vec();
        stream.extend_from_slice(&codec.marshal(&RawFrame::heartbeat(), 0));

        match codec.unmarshal(&stream) {
            Decoded::Frame {
                consumed,
                channel,
                frame: decoded,
            } => {
                assert_eq!(consumed, 7 + 7 + 1);
                assert_eq!(channel, 7);
                assert_eq!(decoded, frame);
            }
            other => panic!("Expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_frame_needs_more_data() {
        let codec = AmqpCodec::new();
        let bytes = codec.marshal(&RawFrame::new(FrameKind::Header, vec![1, 2, 3]), 1);

        for end in 0..bytes.len() {
            assert_eq!(codec.unmarshal(&bytes[..end]), Decoded::NeedMoreData, "prefix {end}");
        }
    }

    #[test]
    fn test_bad_frame_end_is_malformed() {
        let codec = AmqpCodec::new();
        let mut bytes = codec.marshal(&RawFrame::heartbeat(), 0).to_vec();
        *bytes.last_mut().expect("Frame is empty") = 0x00;

        assert_eq!(
            codec.unmarshal(&bytes),
            Decoded::Malformed(CodecError::BadFrameEnd(0x00))
        );
    }

    #[test]
    fn test_unknown_frame_type_is_malformed() {
        let bytes = [0x63, 0, 0, 0, 0, 0, 0, 0xCE];

        assert_eq!(
            AmqpCodec::new().unmarshal(&bytes),
            Decoded::Malformed(CodecError::UnknownFrameType(0x63))
        );
    }

    #[test]
    fn test_oversized_frame_is_malformed_before_payload_arrives() {
        let codec = AmqpCodec::new().with_max_payload(4);
        let header = [3, 0, 1, 0, 0, 0, 5];

        assert_eq!(
            codec.unmarshal(&header),
            Decoded::Malformed(CodecError::Oversized { size: 5, max: 4 })
        );
    }

    #[test]
    fn test_default_limit_is_frame_max_size() {
        let header = [3, 0, 1, 0, 2, 0, 1];
        let size = 0x0002_0001;
        assert!(size > FRAME_MAX_SIZE);

        assert_eq!(
            AmqpCodec::default().unmarshal(&header),
            Decoded::Malformed(CodecError::Oversized {
                size,
                max: FRAME_MAX_SIZE
            })
        );
    }
}
