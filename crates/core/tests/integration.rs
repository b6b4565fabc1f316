//! Integration test: access unit → packetizer → wire bytes → unmarshal →
//! NAL units.
//!
//! Every packet is marshalled and parsed back as a receiver would, then the
//! NAL units are rebuilt from single, aggregation and fragmentation payloads
//! and compared with the input.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rtp::nal::{h264, h265};
use rtp::rtp::extension;
use rtp::{H264Payloader, H265Payloader, Packet, Packetizer, PacketizerConfig, WrappingSequencer};

const MTU: usize = 300;

fn clock() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn annexb(nals: &[Vec<u8>]) -> Vec<u8> {
    nals.iter().flat_map(|nal| [&[0, 0, 0, 1][..], &nal[..]].concat()).collect()
}

fn over_the_wire(packets: &[Packet]) -> Vec<Packet> {
    packets
        .iter()
        .map(|packet| {
            let raw = packet.marshal().expect("marshal");
            assert!(raw.len() <= MTU, "packet of {} bytes", raw.len());
            Packet::unmarshal(&raw).expect("unmarshal")
        })
        .collect()
}

fn depacketize_h264(packets: &[Packet]) -> Vec<Vec<u8>> {
    let mut nals = Vec::new();
    let mut fragmented: Option<Vec<u8>> = None;
    for packet in packets {
        let payload = h264::H264Packet::unmarshal(&packet.payload).expect("payload header");
        let packet_type = payload.packet_type();
        if packet_type == h264::RtpPacketType::STAP_A {
            for unit in payload.aggregation_units().expect("STAP-A units") {
                nals.push(unit.to_vec());
            }
        } else if let Some(fu) = payload.fu_header() {
            if fu.start_bit {
                let header = h264::NalHeader {
                    nal_unit_type: fu.nal_unit_type,
                    ..payload.header
                };
                fragmented = Some(vec![header.marshal()]);
            }
            let nal = fragmented.as_mut().expect("fragment without start");
            nal.extend_from_slice(payload.fu_payload().expect("FU-A data"));
            if fu.end_bit {
                nals.extend(fragmented.take());
            }
        } else {
            assert!(packet_type.is_single_nal_unit());
            nals.push(packet.payload.clone());
        }
    }
    assert!(fragmented.is_none(), "unterminated fragmentation unit");
    nals
}

fn depacketize_h265(packets: &[Packet]) -> Vec<Vec<u8>> {
    let mut nals = Vec::new();
    let mut fragmented: Option<Vec<u8>> = None;
    for packet in packets {
        let payload = h265::H265Packet::unmarshal(&packet.payload).expect("payload header");
        let packet_type = payload.packet_type();
        if packet_type.is_aggregation_packet() {
            for unit in payload.aggregation_units().expect("AP units") {
                nals.push(unit.to_vec());
            }
        } else if let Some(fu) = payload.fu_header() {
            if fu.start_bit {
                let header = h265::NalHeader {
                    nal_unit_type: fu.fu_type,
                    ..payload.header
                };
                fragmented = Some(header.marshal().to_vec());
            }
            let nal = fragmented.as_mut().expect("fragment without start");
            nal.extend_from_slice(payload.fu_payload().expect("FU data"));
            if fu.end_bit {
                nals.extend(fragmented.take());
            }
        } else {
            assert!(packet_type.is_single_nal_unit());
            nals.push(packet.payload.clone());
        }
    }
    assert!(fragmented.is_none(), "unterminated fragmentation unit");
    nals
}

fn packetizer(payloader: Box<dyn rtp::Payloader>) -> Packetizer {
    let config = PacketizerConfig {
        mtu: MTU,
        ssrc: 0xDEAD_BEEF,
        ..Default::default()
    };
    Packetizer::new(config, payloader, Arc::new(WrappingSequencer::new(65532))).with_clock(clock)
}

#[test]
fn h264_keyframe_round_trip() {
    let sps = vec![0x67, 0x42, 0xc0, 0x1f, 0xda, 0x01, 0x40];
    let pps = vec![0x68, 0xce, 0x3c, 0x80];
    let sei = vec![0x06, 0x05, 0x01, 0xAA];
    let idr: Vec<u8> = std::iter::once(0x65).chain((0..1000u32).map(|i| i as u8)).collect();
    let nals = vec![sps, pps, sei, idr];

    let mut p = packetizer(Box::new(H264Payloader::new()));
    p.enable_abs_send_time(2).unwrap();
    let sent = p.packetize(&annexb(&nals), 3000);
    let received = over_the_wire(&sent);

    assert_eq!(received, sent);
    assert_eq!(depacketize_h264(&received), nals);

    // Aggregated parameter sets, then fragments of the IDR slice.
    let first = h264::H264Packet::unmarshal(&received[0].payload).unwrap();
    assert_eq!(first.packet_type(), h264::RtpPacketType::STAP_A);
    assert!(received[1..].iter().all(|packet| packet.payload[0] & 0x1f == 28));

    let (last, rest) = received.split_last().unwrap();
    assert!(last.header.marker);
    assert!(rest.iter().all(|packet| !packet.header.marker && !packet.header.extension));
    assert_eq!(
        extension::parse_abs_send_time(&last.header, 2),
        Some(extension::abs_send_time(extension::to_ntp_time(clock())))
    );

    // Sequence numbers wrap from the configured start.
    let sequence: Vec<u16> = received.iter().map(|packet| packet.header.sequence_number).collect();
    let expected: Vec<u16> = (0..received.len() as u16).map(|i| 65533u16.wrapping_add(i)).collect();
    assert_eq!(sequence, expected);
}

#[test]
fn h265_keyframe_round_trip() {
    let vps = vec![0x40, 0x01, 0x0c, 0x01, 0xff, 0xff];
    let sps = vec![0x42, 0x01, 0x01, 0x01, 0x60, 0x80];
    let pps = vec![0x44, 0x01, 0xc1, 0x72, 0xb4, 0x62];
    let idr: Vec<u8> = [0x26, 0x01].into_iter().chain((0..2000u32).map(|i| (i * 7) as u8)).collect();
    let trail = vec![0x02, 0x01, 0xd0, 0x09, 0x7e];
    let nals = vec![vps, sps, pps, idr, trail];

    let mut p = packetizer(Box::new(H265Payloader::new()));
    let ts = p.timestamp();
    let received = over_the_wire(&p.packetize(&annexb(&nals), 3000));

    assert_eq!(depacketize_h265(&received), nals);
    assert!(received.iter().all(|packet| packet.header.timestamp == ts));
    assert!(received.iter().all(|packet| packet.header.ssrc == 0xDEAD_BEEF));
    assert!(received.iter().all(|packet| !packet.header.extension));
    assert_eq!(p.timestamp(), ts.wrapping_add(3000));
}

#[test]
fn h264_without_aggregation_sends_each_nal() {
    let nals = vec![vec![0x67, 0x42, 0x1f], vec![0x68, 0xce], vec![0x41, 0x9a, 0x22]];
    let mut p = packetizer(Box::new(H264Payloader {
        skip_aggregate: true,
        ..Default::default()
    }));
    let received = over_the_wire(&p.packetize(&annexb(&nals), 3000));

    assert_eq!(received.len(), 3);
    assert_eq!(depacketize_h264(&received), nals);
}

#[test]
fn padded_packet_survives_the_wire() {
    let mut p = packetizer(Box::new(H264Payloader::new()));
    let mut packet = p.packetize(&[0, 0, 1, 0x41, 0x01, 0x02], 3000).remove(0);
    packet.header.padding = true;
    packet.padding_trailer = rtp::PaddingTrailer::with_count(4);

    let raw = packet.marshal().unwrap();
    assert_eq!(raw.len(), 12 + 3 + 4);
    assert_eq!(*raw.last().unwrap(), 4);

    let parsed = Packet::unmarshal(&raw).unwrap();
    assert_eq!(parsed.payload, vec![0x41, 0x01, 0x02]);
    assert_eq!(parsed, packet);
}
