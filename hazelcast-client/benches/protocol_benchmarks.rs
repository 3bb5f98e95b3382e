//! Wire codec, fragmentation and routing hot-path benchmarks.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hazelcast_client::connection::CorrelationRegistry;
use hazelcast_client::partition_of;
use hazelcast_core::compute_partition_hash;
use hazelcast_core::protocol::codecs::client_ping;
use hazelcast_core::protocol::codecs::map_entry_listener::{self, EntryEventBody};
use hazelcast_core::protocol::{encode_message, ClientMessageCodec, DEFAULT_MAX_FRAME_SIZE};
use hazelcast_core::ClientMessage;
use tokio_util::codec::{Decoder, Encoder};

fn entry_event(value_size: usize) -> ClientMessage {
    let body = EntryEventBody {
        event_type: 1,
        member_uuid: None,
        number_of_affected_entries: 1,
        key: Some(Bytes::from(vec![7u8; 64])),
        value: Some(Bytes::from(vec![42u8; value_size])),
        old_value: Some(Bytes::from(vec![41u8; value_size])),
        merging_value: None,
    };
    map_entry_listener::encode_entry_event(1, &body)
}

fn decode_all(codec: &mut ClientMessageCodec, buf: &mut BytesMut) -> Option<ClientMessage> {
    codec.decode(buf).unwrap()
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    group.bench_function("encode_ping", |b| {
        let mut codec = ClientMessageCodec::new();
        let mut buf = BytesMut::with_capacity(1024);
        b.iter(|| {
            buf.clear();
            let mut request = client_ping::encode_request();
            request.set_correlation_id(black_box(17));
            codec.encode(request, &mut buf).unwrap();
            black_box(buf.len())
        })
    });

    for size in [128usize, 4 * 1024, 64 * 1024] {
        let wire = encode_message(entry_event(size), DEFAULT_MAX_FRAME_SIZE).unwrap();
        group.throughput(Throughput::Bytes(wire.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode_entry_event", size), &size, |b, &size| {
            let mut codec = ClientMessageCodec::new();
            let mut buf = BytesMut::with_capacity(wire.len());
            b.iter(|| {
                buf.clear();
                codec.encode(entry_event(size), &mut buf).unwrap();
                black_box(buf.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("decode_entry_event", size), &wire, |b, wire| {
            let mut codec = ClientMessageCodec::new();
            b.iter(|| {
                let mut buf = wire.clone();
                black_box(decode_all(&mut codec, &mut buf))
            })
        });
    }

    group.finish();
}

fn bench_fragmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragmentation");
    let max_frame_size = 16 * 1024;

    for size in [64 * 1024usize, 512 * 1024] {
        let wire = encode_message(entry_event(size), max_frame_size).unwrap();
        group.throughput(Throughput::Bytes(wire.len() as u64));

        group.bench_with_input(BenchmarkId::new("split", size), &size, |b, &size| {
            let mut codec = ClientMessageCodec::with_max_frame_size(max_frame_size);
            let mut buf = BytesMut::with_capacity(wire.len());
            b.iter(|| {
                buf.clear();
                codec.encode(entry_event(size), &mut buf).unwrap();
                black_box(buf.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("reassemble", size), &wire, |b, wire| {
            let mut codec = ClientMessageCodec::with_max_frame_size(max_frame_size);
            b.iter(|| {
                let mut buf = wire.clone();
                black_box(decode_all(&mut codec, &mut buf))
            })
        });
    }

    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");
    let keys: Vec<Vec<u8>> = (0..1024).map(|i| format!("key-{i}").into_bytes()).collect();

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("partition_of", |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for key in &keys {
                sum += partition_of(compute_partition_hash(key), black_box(271)) as i64;
            }
            black_box(sum)
        })
    });

    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");

    group.bench_function("register_resolve", |b| {
        let registry = CorrelationRegistry::new();
        let mut next_id = 0i64;
        b.iter(|| {
            next_id += 1;
            let receiver = registry.register(next_id).unwrap();
            let call = registry.resolve(black_box(next_id)).unwrap();
            call.complete(Ok(client_ping::encode_response()));
            black_box(receiver)
        })
    });

    group.bench_function("register_drain_1000", |b| {
        let registry = CorrelationRegistry::new();
        b.iter(|| {
            let receivers: Vec<_> = (0..1000).map(|id| registry.register(id).unwrap()).collect();
            for call in registry.drain() {
                call.complete(Err(hazelcast_core::HazelcastError::TargetDisconnected(
                    "closed".to_string(),
                )));
            }
            black_box(receivers)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_fragmentation,
    bench_routing,
    bench_correlation
);
criterion_main!(benches);
