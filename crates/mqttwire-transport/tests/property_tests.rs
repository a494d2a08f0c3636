//! Property-based tests for frame reassembly over byte streams.
//!
//! However the stream splits the bytes, every packet must come out whole, in
//! order, and the counters must agree with the encoded lengths.

#![cfg(feature = "tcp")]

use bytes::Bytes;
use mqttwire_transport::{Connection, Packet, Publish, QoS, StreamBackend};
use proptest::prelude::*;
use tokio::io::duplex;

fn packet_strategy() -> impl Strategy<Value = Packet> {
    prop_oneof![
        Just(Packet::Pingreq),
        Just(Packet::Pingresp),
        (1u16..=u16::MAX).prop_map(Packet::Puback),
        (
            "[a-z]{1,12}(/[a-z]{1,12}){0,3}",
            prop::collection::vec(any::<u8>(), 0..600),
            any::<bool>(),
        )
            .prop_map(|(topic, payload, retain)| {
                Packet::Publish(Publish {
                    retain,
                    ..Publish::new(topic, Bytes::from(payload))
                })
            }),
        ("[a-z]{1,20}", 1u16..=u16::MAX).prop_map(|(topic, id)| {
            Packet::Publish(Publish {
                qos: QoS::ExactlyOnce,
                packet_id: id,
                ..Publish::new(topic, Bytes::from_static(b"payload"))
            })
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Packets survive arbitrary chunking of the stream.
    #[test]
    fn prop_stream_reassembly(
        packets in prop::collection::vec(packet_strategy(), 1..20),
        chunk_size in 1usize..64,
        pipe_size in 8usize..256,
    ) {
        let (received, written, read) = tokio_test::block_on(async {
            let (a, b) = duplex(pipe_size);
            let sender = Connection::new(StreamBackend::new(a));
            let receiver = Connection::new(StreamBackend::new(b).with_chunk_size(chunk_size));

            let send_all = async {
                for packet in &packets {
                    sender.send(packet).await.unwrap();
                }
            };
            let receive_all = async {
                let mut out = Vec::with_capacity(packets.len());
                for _ in 0..packets.len() {
                    out.push(receiver.receive().await.unwrap());
                }
                out
            };
            let ((), received) = tokio::join!(send_all, receive_all);
            (received, sender.bytes_written(), receiver.bytes_read())
        });

        let expected: u64 = packets.iter().map(|p| p.len() as u64).sum();
        prop_assert_eq!(received, packets);
        prop_assert_eq!(written, expected);
        prop_assert_eq!(read, expected);
    }

    /// A frame over the read limit is rejected without being counted.
    #[test]
    fn prop_read_limit_rejects_larger_frames(
        payload in prop::collection::vec(any::<u8>(), 1..400),
        slack in 1u64..32,
    ) {
        let packet = Packet::Publish(Publish::new("limit", Bytes::from(payload)));
        let limit = (packet.len() as u64).saturating_sub(slack).max(1);

        let (code, read) = tokio_test::block_on(async {
            let (a, b) = duplex(1024);
            let sender = Connection::new(StreamBackend::new(a));
            let receiver = Connection::new(StreamBackend::new(b));
            receiver.set_read_limit(limit);

            sender.send(&packet).await.unwrap();
            let code = receiver.receive().await.unwrap_err().code();
            (code, receiver.bytes_read())
        });

        prop_assert_eq!(code, mqttwire_transport::ErrorCode::ReadLimitExceeded);
        prop_assert_eq!(read, 0);
    }
}
