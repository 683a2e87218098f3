use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use micro_htp::hook::{Hook, fn_callback};
use micro_htp::protocol::{HookStatus, Transaction};

fn build_hook(size: usize) -> Hook<Transaction> {
    let mut hook = Hook::create().expect("hook allocation should succeed");
    for i in 0..size {
        let priority = i32::try_from(i % 10).expect("priority fits i32") * 1000;
        let callback = fn_callback(move |tx: &mut Transaction| {
            if tx.request_method.as_deref() == Some(b"GET") && i % 3 == 0 { HookStatus::Ok } else { HookStatus::Declined }
        });
        hook.register(callback, priority).expect("hook should grow");
    }
    hook
}

fn benchmark_run_all(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("hook_run_all");

    for size in [0, 1, 8, 64] {
        let hook = build_hook(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &hook, |b, hook| {
            b.iter_batched_ref(
                || {
                    let mut tx = Transaction::new(0);
                    tx.request_method = Some(b"GET".to_vec());
                    tx
                },
                |tx| black_box(hook.run_all(tx)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_register(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("hook_register");

    for size in [8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, size| {
            b.iter(|| black_box(build_hook(*size)));
        });
    }

    group.finish();
}

criterion_group!(hook, benchmark_run_all, benchmark_register);
criterion_main!(hook);
