//! Benchmarks for the integrator hot loop.

use coil::{SpringConfig, SpringSystem, DEFAULT_TIMESTEP_MILLIS};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_spring_ticks(c: &mut Criterion) {
    c.bench_function("tick_one_spring_4_frames", |b| {
        let mut system = SpringSystem::new();
        let id = system.create_spring_with_config(SpringConfig::new(194.0, 25.0));
        let mut target = 0.0;
        b.iter(|| {
            // Flip the target so the spring never settles into a no-op.
            target = if target == 0.0 { 100.0 } else { 0.0 };
            system.spring(id).unwrap().set_end_value(target);
            for _ in 0..4 {
                system.step(DEFAULT_TIMESTEP_MILLIS);
            }
            black_box(system.get_spring(id).unwrap().current_value())
        });
    });

    c.bench_function("tick_hundred_springs_4_frames", |b| {
        let mut system = SpringSystem::new();
        let ids: Vec<_> = (0..100)
            .map(|_| system.create_spring_with_config(SpringConfig::new(194.0, 25.0)))
            .collect();
        let mut target = 0.0;
        b.iter(|| {
            target = if target == 0.0 { 100.0 } else { 0.0 };
            for &id in &ids {
                system.spring(id).unwrap().set_end_value(target);
            }
            for _ in 0..4 {
                system.step(DEFAULT_TIMESTEP_MILLIS);
            }
            black_box(system.is_idle())
        });
    });
}

criterion_group!(benches, bench_spring_ticks);
criterion_main!(benches);
