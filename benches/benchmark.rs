// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use act_wallet::{ActEngine, ActParams, CryptoEngine, Credits, LocalIssuer, ProtocolEngine};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("benchmark runtime")
}

// Shared across iterations so the parameter derivation is not measured.
fn setup() -> (ActEngine, Arc<LocalIssuer>) {
    let labels = ActParams::default();
    let issuer = Arc::new(LocalIssuer::new(&labels));
    (ActEngine::new(labels), issuer)
}

fn prepare_issuance_benchmark(c: &mut Criterion) {
    let (engine, _) = setup();
    let credits = Credits::new(100).unwrap();

    c.bench_function("prepare_issuance", |b| {
        b.iter(|| black_box(engine.prepare_issuance(credits).unwrap()))
    });
}

fn wallet_issuance_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let (engine, issuer) = setup();

    c.bench_function("wallet_issuance", |b| {
        b.iter_batched(
            || ProtocolEngine::new(&engine, Arc::clone(&issuer)),
            |mut wallet| black_box(rt.block_on(wallet.issue(100u8)).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn wallet_spend_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let (engine, issuer) = setup();

    c.bench_function("wallet_spend", |b| {
        b.iter_batched(
            || {
                let mut wallet = ProtocolEngine::new(&engine, Arc::clone(&issuer));
                rt.block_on(wallet.issue(100u8)).unwrap();
                wallet
            },
            |mut wallet| black_box(rt.block_on(wallet.spend(10u8)).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn wallet_cycle_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let (engine, issuer) = setup();

    c.bench_function("wallet_issue_then_spend_all", |b| {
        b.iter_batched(
            || ProtocolEngine::new(&engine, Arc::clone(&issuer)),
            |mut wallet| {
                rt.block_on(async {
                    wallet.issue(20u8).await.unwrap();
                    for _ in 0..4 {
                        wallet.spend(5u8).await.unwrap();
                    }
                });
                black_box(wallet.balance())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    prepare_issuance_benchmark,
    wallet_issuance_benchmark,
    wallet_spend_benchmark,
    wallet_cycle_benchmark,
);
criterion_main!(benches);
