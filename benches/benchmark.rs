use criterion::measurement::WallTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qcirc::gates;
use qcirc::linalg;
use qcirc::runtime::{self, QEngine, QuantumState};
use qcirc::tensor::{multiidx2n, n2multiidx_into};
use std::time::Duration;

// shorter runs than the criterion defaults, the state vector sizes grow fast
fn custom_criterion_config() -> Criterion<WallTime> {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

// textbook qft on n qubits followed by a full measurement
fn qft_source(n: usize) -> String {
    let mut src = format!(
        "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[{n}];\ncreg c[{n}];\nx q[0];\n",
        n = n
    );
    for i in 0..n {
        src.push_str(&format!("h q[{}];\n", i));
        for j in (i + 1)..n {
            src.push_str(&format!("cu1(pi/{}) q[{}],q[{}];\n", 1usize << (j - i), j, i));
        }
    }
    src.push_str("measure q -> c;\n");
    src
}

fn index_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_translation");
    let dims = vec![2; 20];
    let mut midx = vec![0; dims.len()];
    group.throughput(Throughput::Elements(1 << 16));
    group.bench_function("roundtrip_2^16", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for n in 0..(1usize << 16) {
                n2multiidx_into(black_box(n), &dims, &mut midx);
                acc ^= multiidx2n(&midx, &dims);
            }
            acc
        })
    });
    group.finish();
}

fn gate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_gate");

    #[cfg(debug_assertions)]
    let qubit_counts = vec![4, 8];
    #[cfg(not(debug_assertions))]
    let qubit_counts = vec![8, 12, 16, 20];

    for &n in &qubit_counts {
        group.throughput(Throughput::Elements(1 << n));
        let mut state = QuantumState::new(n);
        let h = gates::h();
        group.bench_with_input(BenchmarkId::new("h", n), &n, |b, &n| {
            b.iter(|| state.apply(&h, &[black_box(n / 2)]))
        });
        let cx = gates::cnot();
        group.bench_with_input(BenchmarkId::new("cx", n), &n, |b, &n| {
            b.iter(|| state.apply(&cx, &[0, black_box(n - 1)]))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("expand_gate");
    for n in [4usize, 6] {
        let dims = vec![2; n];
        let ccx = gates::ccx();
        group.bench_with_input(BenchmarkId::new("ccx", n), &n, |b, &n| {
            b.iter(|| linalg::expand(&ccx, &[0, n / 2, n - 1], &dims))
        });
    }
    group.finish();
}

fn circuit_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("qft");
    for n in [4usize, 8, 12] {
        let src = qft_source(n);
        group.bench_with_input(BenchmarkId::new("parse", n), &src, |b, src| {
            b.iter(|| qcirc::read_from_str(black_box(src)))
        });
        let circuit = match qcirc::read_from_str(&src) {
            Ok(circuit) => circuit,
            Err(e) => panic!("qft source does not parse: {}", e),
        };
        group.bench_with_input(BenchmarkId::new("execute", n), &circuit, |b, circuit| {
            b.iter(|| -> qcirc::QResult<()> {
                let mut engine = QEngine::with_seed(circuit, 1)?;
                engine.execute()
            })
        });
        group.bench_with_input(BenchmarkId::new("shots_64", n), &circuit, |b, circuit| {
            b.iter(|| runtime::run_shots(circuit, 64, 7))
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion_config();
    targets = index_benchmarks, gate_benchmarks, circuit_benchmarks
}
criterion_main!(benches);
