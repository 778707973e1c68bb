//! Benchmarks for trial evaluation and generation throughput.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use wmr_evolution::{
    compute::{
        RoverSimulator, SimulationAdapter,
        evolution::{EvolutionEngine, FitnessEvaluator},
    },
    schema::{EvolutionConfig, PopulationConfig, RobotParameters, SimulationSettings},
};

fn bench_rover_trial(c: &mut Criterion) {
    let mut group = c.benchmark_group("rover_trial");
    let simulator = RoverSimulator::default();
    let params = RobotParameters::default();

    for duration in [5.0, 20.0] {
        let settings = SimulationSettings {
            duration,
            ..Default::default()
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}s", duration)),
            &settings,
            |b, settings| {
                b.iter(|| simulator.run_trial(black_box(&params), settings, false));
            },
        );
    }

    group.finish();
}

fn bench_fitness_evaluation(c: &mut Criterion) {
    let config = EvolutionConfig::default();
    let evaluator = FitnessEvaluator::from_config(RoverSimulator::default(), &config);
    let genome = config.parameters.encode(&config.baseline);

    c.bench_function("evaluate_baseline", |b| {
        b.iter(|| evaluator.evaluate(black_box(&genome)));
    });
}

fn bench_generations(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution_run");
    group.sample_size(10);

    for parallel in [false, true] {
        let mut config = EvolutionConfig {
            population: PopulationConfig {
                size: 20,
                max_generations: 3,
                stagnation_limit: 100,
            },
            simulation: SimulationSettings {
                duration: 5.0,
                ..Default::default()
            },
            ..Default::default()
        };
        config.evaluation.parallel = parallel;

        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &config, |b, config| {
            b.iter(|| {
                EvolutionEngine::new(config.clone(), RoverSimulator::default())
                    .and_then(|mut engine| engine.run())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rover_trial,
    bench_fitness_evaluation,
    bench_generations
);
criterion_main!(benches);
