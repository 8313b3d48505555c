use alloy_primitives::U256;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use swap_router::logic::amm::{WAD, constant_product_amount_out, stable_swap_variant_a, stable_swap_variant_b};

fn benchmark_solvers(c: &mut Criterion) {
    let reserve0 = U256::from(1_000_000u64) * WAD;
    let reserve1 = U256::from(1_000_000_000_000u64);
    let amount_in = U256::from(1_000u64) * WAD;

    c.bench_function("constant_product_amount_out", |b| {
        b.iter(|| constant_product_amount_out(black_box(amount_in), black_box(reserve0), black_box(reserve1)).unwrap())
    });

    c.bench_function("stable_swap_variant_a", |b| {
        b.iter(|| stable_swap_variant_a(black_box(amount_in), black_box(reserve0), black_box(reserve1), 18, 6, true).unwrap())
    });

    c.bench_function("stable_swap_variant_b", |b| {
        b.iter(|| stable_swap_variant_b(black_box(amount_in), black_box(reserve0), black_box(reserve1), 18, 6, true).unwrap())
    });
}

criterion_group!(benches, benchmark_solvers);
criterion_main!(benches);
