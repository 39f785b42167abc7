//! # Blockmania Subsystem Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | bm-02 Quorum | assemble a 64-member bucket and gate its job | < 1ms |
//! | bm-05 Gossip | encode + decode a full batch | < 1ms |
//! | bm-01 Storage | put + by_hash on the in-memory backend | < 1ms |

use bm_01_graph_storage::{BlockGraphStore, GraphStorageService};
use bm_02_quorum::domain::{assemble, bucket_by_hash, incoming, new_job, JobContext};
use bm_05_gossip::{decode_batch, encode_batch};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{BlockGraph, BlockId, GossipBatch, Hash, NodeId, SignedPayload};
use std::time::Duration;

const H: Hash = [0x7E; 32];

fn record(node: u8) -> BlockGraph<Vec<u8>> {
    let mut signed = SignedPayload::unsigned(vec![node; 128]);
    signed.public_key = vec![node; 32];
    signed.signature = vec![node; 64];
    BlockGraph::new(BlockId {
        hash: H,
        node: NodeId::repeat(node),
        round: 1,
        signed,
        previous_hash: None,
    })
}

// ============================================================================
// BM-02: Quorum
// ============================================================================

fn bench_quorum_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-02-quorum");
    group.measurement_time(Duration::from_secs(5));

    for size in [4u8, 16, 64] {
        let bucket: Vec<_> = (1..=size).map(record).collect();
        let local = NodeId::repeat(1);
        let peers: Vec<_> = (2..=size).map(NodeId::repeat).collect();

        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("assemble_and_gate", size), &bucket, |b, bucket| {
            b.iter(|| {
                let assembled = assemble(bucket_by_hash(bucket.clone()), &local);
                let root = &assembled[0].root;
                let ctx = JobContext {
                    local,
                    peers: &peers,
                    expected_total_nodes: usize::from(size),
                    now: 0,
                };
                let job = new_job(H, root, &ctx);
                black_box(incoming(&job, root))
            })
        });
    }
    group.finish();
}

// ============================================================================
// BM-05: Gossip codec
// ============================================================================

fn bench_gossip_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-05-gossip");

    let batch = GossipBatch {
        sender: NodeId::repeat(1),
        fragments: (1..=20).map(record).collect(),
    };
    group.throughput(Throughput::Elements(batch.fragments.len() as u64));
    group.bench_function("encode_decode_batch", |b| {
        b.iter(|| {
            let bytes = encode_batch(&batch).unwrap();
            black_box(decode_batch::<Vec<u8>>(&bytes).unwrap())
        })
    });
    group.finish();
}

// ============================================================================
// BM-01: Graph storage
// ============================================================================

fn bench_graph_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-01-graph-storage");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("put_then_by_hash", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let store = GraphStorageService::<Vec<u8>>::new_in_memory();
                for node in 1..=16 {
                    store.put(&record(node)).await.unwrap();
                }
                black_box(store.by_hash(&H).await.unwrap().len())
            })
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_quorum_assembly,
    bench_gossip_codec,
    bench_graph_storage
);
criterion_main!(benches);
