mod support;

#[cfg(test)]
mod tests {
    use crate::support::{Recording, ScriptedTransport, init_logging};
    use burrow::reactor::wakeup::{WakeupPair, WakeupTrigger};
    use burrow::reactor::{EventLoop, FrameWriter, outbound_queue};
    use burrow::{AmqpCodec, FrameCodec, FrameKind, RawFrame, Signals};

    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    struct Fixture {
        event_loop: EventLoop<ScriptedTransport, AmqpCodec>,
        writer: FrameWriter<RawFrame>,
        trigger: WakeupTrigger,
        peer: UnixStream,
        running: Arc<AtomicBool>,
    }

    fn fixture(caps: Vec<usize>) -> Fixture {
        init_logging();

        let (local, peer) = UnixStream::pair().expect("Failed to create socket pair");
        let (reader, trigger) = WakeupPair::new()
            .expect("Failed to create wakeup pair")
            .into_parts();
        let (writer, outbound) = outbound_queue(trigger.clone());

        let running = Arc::new(AtomicBool::new(true));

        let event_loop = EventLoop::new(
            ScriptedTransport::new(local, caps),
            Arc::new(AmqpCodec::new()),
            outbound,
            reader,
            running.clone(),
            Arc::new(Signals::new()),
        )
        .expect("Failed to create event loop")
        .with_poll_timeout(Duration::from_millis(200));

        Fixture {
            event_loop,
            writer,
            trigger,
            peer,
            running,
        }
    }

    fn body(payload: &[u8]) -> RawFrame {
        RawFrame::new(FrameKind::Body, payload.to_vec())
    }

    #[test]
    fn test_short_send_requeues_remainder_at_front() {
        let mut fx = fixture(vec![6]);
        let mut handler = Recording::default();

        let frame = body(&[0xAB, 0xCD]);
        let expected = AmqpCodec::new().marshal(&frame, 3);
        assert_eq!(expected.len(), 10);

        fx.writer.write(3, frame).expect("Failed to queue frame");

        fx.event_loop.turn(&mut handler);
        assert_eq!(fx.event_loop.write_buffer().len(), 1);
        assert_eq!(fx.event_loop.write_buffer()[0], expected.slice(6..));

        fx.event_loop.turn(&mut handler);
        assert!(fx.event_loop.write_buffer().is_empty());

        let mut received = [0u8; 10];
        fx.peer
            .read_exact(&mut received)
            .expect("Failed to read from peer");
        assert_eq!(&received[..], &expected[..]);
        assert!(handler.errors.is_empty());
    }

    #[test]
    fn test_would_block_keeps_whole_chunk() {
        let mut fx = fixture(vec![0]);
        let mut handler = Recording::default();

        let frame = RawFrame::heartbeat();
        let expected = AmqpCodec::new().marshal(&frame, 0);
        fx.writer.write(0, frame).expect("Failed to queue frame");

        fx.event_loop.turn(&mut handler);
        assert_eq!(fx.event_loop.write_buffer().len(), 1);
        assert_eq!(fx.event_loop.write_buffer()[0], expected);
        assert!(fx.event_loop.is_active());

        fx.event_loop.turn(&mut handler);
        assert!(fx.event_loop.write_buffer().is_empty());
        assert!(handler.errors.is_empty());
    }

    #[test]
    fn test_frames_leave_in_enqueue_order() {
        let mut fx = fixture(vec![3, 5, 1, 0, 2]);
        let mut handler = Recording::default();
        let codec = AmqpCodec::new();

        let frames = [(1, body(b"first")), (2, body(b"second")), (0, RawFrame::heartbeat())];
        let mut expected = Vec::new();

        for (channel, frame) in frames {
            expected.extend_from_slice(&codec.marshal(&frame, channel));
            fx.writer.write(channel, frame).expect("Failed to queue frame");
        }

        for _ in 0..32 {
            fx.event_loop.turn(&mut handler);
            if fx.event_loop.write_buffer().is_empty() {
                break;
            }
        }
        assert!(fx.event_loop.write_buffer().is_empty());

        let mut received = vec![0u8; expected.len()];
        fx.peer
            .read_exact(&mut received)
            .expect("Failed to read from peer");
        assert_eq!(received, expected);
    }

    #[test]
    fn test_inbound_bytes_reach_handler() {
        let mut fx = fixture(vec![]);
        let mut handler = Recording::default();

        fx.peer
            .write_all(b"inbound bytes")
            .expect("Failed to write to peer");

        fx.event_loop.turn(&mut handler);
        assert_eq!(handler.read, b"inbound bytes");
    }

    #[test]
    fn test_peer_close_stops_loop_with_one_error() {
        let mut fx = fixture(vec![]);
        let mut handler = Recording::default();

        drop(fx.peer);

        for _ in 0..4 {
            if !fx.event_loop.is_active() {
                break;
            }
            fx.event_loop.turn(&mut handler);
        }

        assert!(!fx.event_loop.is_active());
        assert!(!fx.running.load(Ordering::Acquire));
        assert_eq!(handler.errors.len(), 1);
    }

    #[test]
    fn test_wakeup_only_turn_does_no_io() {
        let mut fx = fixture(vec![]);
        let mut handler = Recording::default();

        fx.trigger.notify();
        fx.event_loop.turn(&mut handler);

        assert!(handler.read.is_empty());
        assert!(handler.errors.is_empty());
        assert!(fx.event_loop.is_active());
    }

    #[test]
    fn test_closed_writer_stops_the_loop() {
        let mut fx = fixture(vec![]);
        fx.event_loop = fx.event_loop.with_poll_timeout(Duration::from_secs(3600));
        let mut handler = Recording::default();

        fx.writer.close();
        fx.event_loop.turn(&mut handler);

        assert!(!fx.event_loop.is_active());
        assert!(!fx.running.load(Ordering::Acquire));
        assert!(handler.errors.is_empty());
        assert!(fx.event_loop.write_buffer().is_empty());
    }

    #[test]
    fn test_run_returns_after_stop() {
        let (local, _peer) = UnixStream::pair().expect("Failed to create socket pair");
        let (reader, trigger) = WakeupPair::new()
            .expect("Failed to create wakeup pair")
            .into_parts();
        let (writer, outbound) = outbound_queue::<RawFrame>(trigger);
        let running = Arc::new(AtomicBool::new(true));

        let flag = running.clone();
        let handle = thread::spawn(move || {
            let mut event_loop = EventLoop::new(
                ScriptedTransport::new(local, Vec::new()),
                Arc::new(AmqpCodec::new()),
                outbound,
                reader,
                flag,
                Arc::new(Signals::new()),
            )
            .expect("Failed to create event loop");

            let mut handler = Recording::default();
            event_loop.run(&mut handler);
            handler
        });

        thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::Release);
        writer.close();

        let handler = handle.join().expect("Thread panicked");
        assert!(handler.errors.is_empty());
    }
}
