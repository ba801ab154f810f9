//! Step transition benchmarks

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rf_mechanism::{
    HoldRespinParams, MechanismConfig, MechanismRegistry, Modifier, ModifierKind, ModifierParams,
    Position, StepData,
};

fn bench_hold_respin_fill(c: &mut Criterion) {
    let registry = MechanismRegistry::new();
    let config = MechanismConfig::hold_respin(HoldRespinParams::new("H")).with_grid(3, 5);
    let steps: Vec<StepData> = config
        .grid_size()
        .positions()
        .enumerate()
        .map(|(i, pos)| StepData::new(i as u32).with_landing(pos, "H", 5.0))
        .collect();

    c.bench_function("hold_respin_fill_15", |b| {
        b.iter(|| {
            let mut engine = registry.create(&config).unwrap();
            engine.initialize(None, None).unwrap();
            for step in &steps {
                black_box(engine.process_step(black_box(step)).unwrap());
            }
        })
    });
}

fn bench_modifier_steps(c: &mut Criterion) {
    let registry = MechanismRegistry::new();
    let config = MechanismConfig::modifier(ModifierParams::default(), 64);
    let steps: Vec<StepData> = (0..64)
        .map(|i| {
            StepData::new(i)
                .with_total_win(2.0)
                .with_modifier(Modifier::new(ModifierKind::AddMultiplier, 0.1))
                .with_modifier(Modifier::new(ModifierKind::SymbolSwap, 0.0))
                .with_landing(Position::new(0, (i % 5) as usize), "X", 1.0)
        })
        .collect();

    c.bench_function("modifier_64_steps", |b| {
        b.iter(|| {
            let mut engine = registry.create(&config).unwrap();
            engine.initialize(None, None).unwrap();
            for step in &steps {
                if !engine.is_active() {
                    break;
                }
                black_box(engine.process_step(black_box(step)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_hold_respin_fill, bench_modifier_steps);
criterion_main!(benches);
