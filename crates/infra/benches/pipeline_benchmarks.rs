use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use arena_ai::{LabelPair, LabelPolicy, NamingRequest};
use arena_core::{
    BattleOutcome, BattleResolver, Participant, ParticipantId, RatingChange, ResolveError,
};
use arena_infra::jobs::{
    BattleJob, CleanupSweeper, DocumentStore, InMemoryDocumentStore, JobProcessor, JobStatus,
    PollingSweeper, SweepSettings, claim,
};
use async_trait::async_trait;

struct FirstWins;

#[async_trait]
impl BattleResolver for FirstWins {
    async fn resolve(
        &self,
        participant_a: ParticipantId,
        participant_b: ParticipantId,
    ) -> Result<BattleOutcome, ResolveError> {
        Ok(BattleOutcome {
            winner_id: participant_a,
            loser_id: participant_b,
            narrative_summary: "A won.".to_string(),
        })
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_rating_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("rating_change");
    for (winner, loser) in [(1200, 1000), (1000, 1000), (900, 1400), (700, 2400)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{winner}_vs_{loser}")),
            &(winner, loser),
            |b, &(w, l)| b.iter(|| RatingChange::compute(black_box(w), black_box(l))),
        );
    }
    group.finish();
}

fn bench_label_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_validation");
    let winner = Participant::new("Aria", 40).with_origin("Valoria", "North Reach");
    let loser = Participant::new("Bram", 20).with_origin("Ostmark", "Southmere");
    let request = NamingRequest::for_battle(&winner, &loser, "Aria overcame Bram.");
    let policy = LabelPolicy::default();

    let cases = [
        ("ascii_ok", LabelPair::new("Iron Crown", "Pale Echo")),
        ("cjk_ok", LabelPair::new("暁の剣聖", "沈黙の盾")),
        ("forbidden", LabelPair::new("Iron Crown", "Ostmark Fool")),
    ];
    for (name, pair) in cases {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = policy.validate(black_box(&pair), &request);
            })
        });
    }
    group.finish();
}

fn bench_claim_and_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_and_process");
    let rt = runtime();

    for batch in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                rt.block_on(async {
                    let store = InMemoryDocumentStore::arc();
                    let processor = JobProcessor::new(store.clone(), Arc::new(FirstWins));
                    for _ in 0..batch {
                        let job = BattleJob::new(ParticipantId::new(), ParticipantId::new()).unwrap();
                        let id = store.insert_job(job).await.unwrap();
                        if let Some(claimed) = claim(&*store, id).await.unwrap() {
                            processor.process(&claimed).await;
                        }
                    }
                })
            })
        });
    }
    group.finish();
}

fn bench_sweeps(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweeps");
    let rt = runtime();
    let settings = SweepSettings {
        rounds: 1,
        round_interval: std::time::Duration::ZERO,
        batch_size: 10,
    };

    group.bench_function("polling_sweep_one_round", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::arc();
                for _ in 0..10 {
                    let job = BattleJob::new(ParticipantId::new(), ParticipantId::new()).unwrap();
                    store.insert_job(job).await.unwrap();
                }
                let processor = Arc::new(JobProcessor::new(store.clone(), Arc::new(FirstWins)));
                PollingSweeper::new(store, processor, settings)
                    .run_once()
                    .await
                    .unwrap()
            })
        })
    });

    group.bench_function("cleanup_mixed_failures", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::arc();
                for i in 0..100 {
                    let mut job = BattleJob::new(ParticipantId::new(), ParticipantId::new()).unwrap();
                    job.status = JobStatus::Error;
                    job.finished = i % 2 == 0;
                    store.insert_job(job).await.unwrap();
                }
                CleanupSweeper::new(store).run_once().await.unwrap()
            })
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_rating_change,
    bench_label_validation,
    bench_claim_and_process,
    bench_sweeps
);
criterion_main!(benches);
