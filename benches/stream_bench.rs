use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;
use wsstream::ws::{Role, WsConfig, WsStream};

/// Benchmark one write on one end and reading it back on the other, over an
/// in-memory pipe. Measures the message/byte mapping, not the network.
fn benchmark_write_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("write_read");

    for size in [64usize, 4096, 64 * 1024] {
        let (mut client, mut server) = rt.block_on(async {
            let (a, b) = tokio::io::duplex(1 << 20);
            let config = WsConfig::default();
            let client = WsStream::from_raw_socket(a, Role::Client, &config).await;
            let server = WsStream::from_raw_socket(b, Role::Server, &config).await;
            (client, server)
        });
        let payload = vec![0x5au8; size];
        let mut buf = vec![0u8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    client.write_all(&payload).await.unwrap();
                    server.read_exact(&mut buf).await.unwrap();
                });
                black_box(&buf);
            })
        });
    }

    group.finish();
}

/// Benchmark draining one large message with a small read buffer.
fn benchmark_small_reads(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (mut client, mut server) = rt.block_on(async {
        let (a, b) = tokio::io::duplex(1 << 20);
        let config = WsConfig::default();
        let client = WsStream::from_raw_socket(a, Role::Client, &config).await;
        let server = WsStream::from_raw_socket(b, Role::Server, &config).await;
        (client, server)
    });
    let payload = vec![1u8; 64 * 1024];

    c.bench_function("drain_64k_in_512b_reads", |b| {
        b.iter(|| {
            rt.block_on(async {
                client.write_all(&payload).await.unwrap();
                let mut chunk = [0u8; 512];
                let mut remaining = payload.len();
                while remaining > 0 {
                    let n = server.read(&mut chunk).await.unwrap();
                    remaining -= n;
                }
                black_box(chunk);
            })
        })
    });
}

criterion_group!(benches, benchmark_write_read, benchmark_small_reads);
criterion_main!(benches);
