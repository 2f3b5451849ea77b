use crate::circuit::{Condition, Operation, QCircuit};
use crate::config::SimConfig;
use crate::error::{QError, SymbolKind};
use crate::gates;
use crate::linalg::{self, CMat, Ket};
use crate::qasm::lexer::{tokenize, TokenKind};
use crate::qasm::{self, QasmReader};
use crate::random::{rng_from_seed, sample_outcome, shot_rng};
use crate::runtime::{self, DitStore, EngineStatus, QEngine, QuantumState};
use crate::tensor::*;
use ndarray::Array1;
use num_complex::Complex64;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

// --- common test helpers ---

const EPS: f64 = 1e-7;

fn fixture(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("circuits").join(rel)
}

fn load(rel: &str) -> QCircuit {
    qasm::read_from_file(fixture(rel)).unwrap()
}

// runs a fixture to completion and returns the final state and dits
fn run(rel: &str, seed: u64) -> (Ket, Vec<usize>) {
    let circuit = load(rel);
    let mut engine = QEngine::with_seed(&circuit, seed).unwrap();
    engine.execute().unwrap();
    (engine.get_psi(), engine.get_dits().to_vec())
}

fn ket0() -> Ket {
    linalg::qubit_ket(&[0]).unwrap()
}

// asserts that two complex numbers are approximately equal.
fn assert_complex_approx_eq(a: Complex64, b: Complex64, epsilon: f64) {
    assert!(
        (a.re - b.re).abs() < epsilon,
        "real parts differ: {} vs {}",
        a.re,
        b.re
    );
    assert!(
        (a.im - b.im).abs() < epsilon,
        "imaginary parts differ: {} vs {}",
        a.im,
        b.im
    );
}

// asserts that two kets are approximately equal entry by entry.
fn assert_amps_approx_eq(actual: &Ket, expected: &Ket, epsilon: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "amplitude vectors have different lengths"
    );
    for (a, b) in actual.iter().zip(expected.iter()) {
        assert_complex_approx_eq(*a, *b, epsilon);
    }
}

// asserts equality up to a global phase.
fn assert_same_ray(actual: &Ket, expected: &Ket, epsilon: f64) {
    let overlap = linalg::inner(actual, expected).norm();
    assert!(
        (overlap - 1.0).abs() < epsilon,
        "states differ beyond a global phase, |<a|b>| = {}",
        overlap
    );
}

fn assert_mat_approx_eq(actual: &CMat, expected: &CMat, epsilon: f64) {
    assert_eq!(actual.dim(), expected.dim(), "matrices have different shapes");
    for (a, b) in actual.iter().zip(expected.iter()) {
        assert_complex_approx_eq(*a, *b, epsilon);
    }
}

// deterministic pseudo-random normalised state over `dims`
fn random_state(dims: &[usize], seed: u64) -> Ket {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let v: Vec<Complex64> = (0..prod_dims(dims))
        .map(|_| Complex64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
        .collect();
    let ket = Array1::from(v);
    let n = linalg::norm(&ket);
    ket.mapv(|z| z / n)
}

fn parse_err(source: &str) -> QError {
    match qasm::read_from_str(source) {
        Ok(_) => panic!("expected an error for:\n{}", source),
        Err(e) => e,
    }
}

// --- index translation ---

#[test]
fn test_n2multiidx_first_subsystem_most_significant() {
    assert_eq!(n2multiidx(5, &[2, 2, 2]), vec![1, 0, 1]);
    assert_eq!(n2multiidx(1, &[2, 2]), vec![0, 1]);
    assert_eq!(n2multiidx(4, &[3, 2]), vec![2, 0]);
    assert_eq!(n2multiidx(0, &[4]), vec![0]);
}

#[test]
fn test_multiidx2n_mixed_dims() {
    assert_eq!(multiidx2n(&[2, 1, 3], &[3, 2, 4]), 23);
    assert_eq!(multiidx2n(&[1, 1], &[2, 2]), 3);
}

proptest! {
    #[test]
    fn prop_index_translation_inverts(dims in prop::collection::vec(1usize..5, 1..5), raw in any::<usize>()) {
        let n = raw % prod_dims(&dims);
        let midx = n2multiidx(n, &dims);
        prop_assert!(midx.iter().zip(dims.iter()).all(|(m, d)| m < d));
        prop_assert_eq!(multiidx2n(&midx, &dims), n);
    }

    #[test]
    fn prop_multiidx_translation_inverts(
        (dims, midx) in prop::collection::vec(1usize..5, 1..5).prop_flat_map(|dims| {
            let digits: Vec<_> = dims.iter().map(|&d| 0..d).collect();
            (Just(dims), digits)
        })
    ) {
        let n = multiidx2n(&midx, &dims);
        prop_assert!(n < prod_dims(&dims));
        prop_assert_eq!(n2multiidx(n, &dims), midx);
    }
}

// --- structural validation ---

#[test]
fn test_check_dims() {
    assert!(check_dims(&[2, 3]));
    assert!(!check_dims(&[]));
    assert!(!check_dims(&[2, 0]));
    assert!(check_dims_match_len(&[2, 3], 6));
    assert!(!check_dims_match_len(&[2, 3], 5));
    assert!(check_eq_dims(&[2, 2, 2], 2));
    assert!(!check_eq_dims(&[2, 3], 2));
    assert!(check_square(4, 4));
    assert!(!check_square(4, 2));
}

#[test]
fn test_check_subsys_and_perm() {
    assert!(check_subsys_match_dims(&[2, 0], &[2, 2, 2]));
    assert!(check_subsys_match_dims(&[], &[2]));
    assert!(!check_subsys_match_dims(&[0, 0], &[2, 2]));
    assert!(!check_subsys_match_dims(&[3], &[2, 2, 2]));
    assert!(check_perm_match_dims(&[2, 0, 1], &[2, 2, 2]));
    assert!(!check_perm_match_dims(&[0, 0, 1], &[2, 2, 2]));
    assert!(!check_perm_match_dims(&[0, 1], &[2, 2, 2]));
}

#[test]
fn test_log_dim() {
    assert_eq!(log_dim(1, 2), Some(0));
    assert_eq!(log_dim(8, 2), Some(3));
    assert_eq!(log_dim(6, 2), None);
    assert_eq!(log_dim(0, 2), None);
    assert_eq!(log_dim(9, 3), Some(2));
}

// --- linear algebra ---

#[test]
fn test_mket_and_bounds() {
    let k = linalg::mket(&[1, 0], &[2, 3]).unwrap();
    assert_eq!(k.len(), 6);
    assert_complex_approx_eq(k[3], linalg::ONE, EPS);
    assert!(matches!(
        linalg::mket(&[2], &[2]),
        Err(QError::OutOfRange { .. })
    ));
    assert!(matches!(
        linalg::mket(&[0], &[2, 2]),
        Err(QError::DimensionMismatch(_))
    ));
}

#[test]
fn test_apply_matches_expanded_operator() {
    let dims = [2, 3, 2];
    let psi = random_state(&dims, 11);
    // operator on the (2, 2)-dimensional pair (2, 0)
    let op = gates::cu3(0.4, 1.1, -0.7);
    let fast = Array1::from(linalg::apply(psi.as_slice().unwrap(), &op, &[2, 0], &dims).unwrap());
    let full = linalg::expand(&op, &[2, 0], &dims).unwrap().dot(&psi);
    assert_amps_approx_eq(&fast, &full, 1e-12);
}

#[test]
fn test_apply_left_matches_expand_then_dot() {
    let dims = [2, 2, 2];
    let m = linalg::kron(&linalg::kron(&gates::h(), &gates::s()), &gates::t());
    let op = gates::cu3(0.2, -0.4, 0.9);
    let expected = linalg::expand(&op, &[2, 0], &dims).unwrap().dot(&m);
    let actual = linalg::apply_left(&op, &[2, 0], &dims, &m).unwrap();
    assert_mat_approx_eq(&actual, &expected, 1e-12);
}

proptest! {
    #[test]
    fn prop_apply_agrees_with_expand(seed in any::<u64>(), a in 0usize..3, b in 0usize..3, theta in -PI..PI) {
        prop_assume!(a != b);
        let dims = [2, 2, 2];
        let psi = random_state(&dims, seed);
        let op = gates::crz(theta);
        let fast = Array1::from(linalg::apply(psi.as_slice().unwrap(), &op, &[a, b], &dims).unwrap());
        let full = linalg::expand(&op, &[a, b], &dims).unwrap().dot(&psi);
        for (x, y) in fast.iter().zip(full.iter()) {
            prop_assert!((x - y).norm() < 1e-12);
        }
        prop_assert!((linalg::norm(&fast) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_apply_rejects_bad_targets() {
    let psi = random_state(&[2, 2], 3);
    let slice = psi.as_slice().unwrap();
    assert!(matches!(
        linalg::apply(slice, &gates::cnot(), &[0, 0], &[2, 2]),
        Err(QError::InvalidTargets(_))
    ));
    assert!(matches!(
        linalg::apply(slice, &gates::cnot(), &[0], &[2, 2]),
        Err(QError::DimensionMismatch(_))
    ));
}

#[test]
fn test_kron_of_identities() {
    let k = linalg::kron(&linalg::identity(2), &linalg::identity(3));
    assert_mat_approx_eq(&k, &linalg::identity(6), EPS);
    let ab = linalg::kron(&gates::x(), &gates::z());
    assert_complex_approx_eq(ab[[0, 2]], linalg::ONE, EPS);
    assert_complex_approx_eq(ab[[1, 3]], -linalg::ONE, EPS);
}

#[test]
fn test_ptrace_of_bell_state_is_maximally_mixed() {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let bell = Array1::from(vec![
        Complex64::new(s, 0.0),
        linalg::ZERO,
        linalg::ZERO,
        Complex64::new(s, 0.0),
    ]);
    let rho = linalg::ptrace(&bell, &[1], &[2, 2]).unwrap();
    assert_mat_approx_eq(&rho, &linalg::identity(2).mapv(|z| z * 0.5), EPS);
}

#[test]
fn test_rho2pure_recovers_product_factor() {
    let a = gates::u3(0.7, 0.3, -1.2).dot(&ket0());
    let b = random_state(&[2, 2], 5);
    let psi = linalg::kron_ket(&a, &b);
    let rho = linalg::ptrace(&psi, &[1, 2], &[2, 2, 2]).unwrap();
    let recovered = linalg::rho2pure(&rho).unwrap();
    assert_same_ray(&recovered, &a, EPS);
    assert!((linalg::norm(&recovered) - 1.0).abs() < EPS);
}

// --- gate library ---

#[test]
fn test_standard_gates_are_unitary() {
    let names: [(&str, &[f64]); 14] = [
        ("x", &[]),
        ("y", &[]),
        ("h", &[]),
        ("t", &[]),
        ("sdg", &[]),
        ("rx", &[0.3]),
        ("ry", &[1.3]),
        ("u2", &[0.1, 0.2]),
        ("u3", &[0.1, 0.2, 0.3]),
        ("ch", &[]),
        ("ccx", &[]),
        ("swap", &[]),
        ("crz", &[0.9]),
        ("cu3", &[0.4, 0.5, 0.6]),
    ];
    for (name, args) in names {
        let m = gates::mapped(name, args).unwrap();
        assert!(gates::unitarity_error(&m) < 1e-12, "{} is not unitary", name);
    }
    assert!(gates::mapped("rx", &[]).is_none());
    assert!(gates::mapped("nope", &[]).is_none());
}

#[test]
fn test_u_matches_euler_decompositions() {
    let (theta, phi, lambda) = (0.1, 0.2, 0.3);
    let via_u = gates::u(theta, phi, lambda).dot(&ket0());
    let zyz = gates::rz(phi)
        .dot(&gates::ry(theta))
        .dot(&gates::rz(lambda))
        .dot(&ket0());
    let zxzxz = gates::rz(phi + 3.0 * PI)
        .dot(&gates::rx(PI / 2.0))
        .dot(&gates::rz(theta + PI))
        .dot(&gates::rx(PI / 2.0))
        .dot(&gates::rz(lambda))
        .dot(&ket0());
    assert_amps_approx_eq(&via_u, &zyz, EPS);
    assert_same_ray(&via_u, &zxzxz, EPS);
    assert_same_ray(&via_u, &gates::u3(theta, phi, lambda).dot(&ket0()), EPS);
}

#[test]
fn test_controlled_gate_control_is_first_qubit() {
    let cx = gates::cnot();
    let out = cx.dot(&linalg::qubit_ket(&[1, 0]).unwrap());
    assert_amps_approx_eq(&out, &linalg::qubit_ket(&[1, 1]).unwrap(), EPS);
    let out = cx.dot(&linalg::qubit_ket(&[0, 1]).unwrap());
    assert_amps_approx_eq(&out, &linalg::qubit_ket(&[0, 1]).unwrap(), EPS);
    let out = gates::ccx().dot(&linalg::qubit_ket(&[1, 1, 0]).unwrap());
    assert_amps_approx_eq(&out, &linalg::qubit_ket(&[1, 1, 1]).unwrap(), EPS);
}

// --- circuit ir ---

#[test]
fn test_define_gate_rejects_duplicates_and_bad_shapes() {
    let mut c = QCircuit::new(2, 0);
    c.define_gate("h", gates::h()).unwrap();
    assert!(matches!(
        c.define_gate("h", gates::x()),
        Err(QError::Redefined { .. })
    ));
    assert!(matches!(
        c.define_gate("bad", linalg::identity(3)),
        Err(QError::DimensionMismatch(_))
    ));
}

#[test]
fn test_intern_gate_reuses_labels() {
    let mut c = QCircuit::new(1, 0);
    let a = c.intern_gate("rz(0.5)", gates::rz(0.5)).unwrap();
    let b = c.intern_gate("rz(0.5)", gates::rz(0.5)).unwrap();
    assert_eq!(a, b);
    assert_eq!(c.gates().len(), 1);
    assert_eq!(c.find_gate("rz(0.5)"), Some(a));
    assert_eq!(c.gate(a).unwrap().arity, 1);
}

#[test]
fn test_append_validates_targets() {
    let mut c = QCircuit::new(2, 1);
    let x = c.define_gate("x", gates::x()).unwrap();
    let cx = c.define_gate("cx", gates::cnot()).unwrap();

    let err = c.append_gate(x, vec![2]).unwrap_err();
    assert!(matches!(
        err,
        QError::Undeclared {
            kind: SymbolKind::Qubit,
            ..
        }
    ));
    assert!(matches!(
        c.append_gate(cx, vec![1, 1]),
        Err(QError::InvalidTargets(_))
    ));
    assert!(matches!(
        c.append_gate(cx, vec![0]),
        Err(QError::InvalidTargets(_))
    ));
    assert!(matches!(
        c.append_measurement(vec![0, 1], vec![0], false),
        Err(QError::InvalidTargets(_))
    ));
    assert!(matches!(
        c.append_measurement(vec![0], vec![1], false),
        Err(QError::Undeclared {
            kind: SymbolKind::Dit,
            ..
        })
    ));
    assert!(c.append_conditional(x, vec![1], Condition::single(3, 1)).is_err());
    assert!(c.is_empty());

    c.append_gate(cx, vec![1, 0]).unwrap();
    c.append_measurement(vec![0], vec![0], true).unwrap();
    c.append_conditional(x, vec![1], Condition::single(0, 1)).unwrap();
    assert_eq!(c.len(), 3);
    assert_eq!(c.gate_count(), 2);
    assert_eq!(c.measurement_count(), 1);
    assert!(c.validate().is_ok());
}

#[test]
fn test_condition_reads_first_dit_as_least_significant() {
    let cond = Condition {
        dits: vec![0, 1, 2],
        value: 5,
    };
    assert!(cond.holds(&[1, 0, 1]));
    assert!(!cond.holds(&[0, 0, 1]));
    // wider than the register
    assert!(!Condition::single(0, 2).holds(&[0]));
}

#[test]
fn test_condition_on_register_wider_than_usize() {
    let mut cond = Condition {
        dits: (0..70).collect(),
        value: 0,
    };
    let mut store = vec![0; 70];
    assert!(cond.holds(&store));
    store[64] = 1;
    assert!(!cond.holds(&store));
    store[64] = 0;
    store[3] = 1;
    cond.value = 8;
    assert!(cond.holds(&store));
    cond.value = usize::MAX;
    assert!(!cond.holds(&store));
}

#[test]
fn test_conditional_on_65_dit_register() {
    let mut c = QCircuit::new(1, 65);
    let x = c.define_gate("x", gates::x()).unwrap();
    c.append_gate(x, vec![0]).unwrap();
    c.append_measurement(vec![0], vec![64], false).unwrap();
    let zero = Condition {
        dits: (0..65).collect(),
        value: 0,
    };
    c.append_conditional(x, vec![0], zero).unwrap();
    let mut engine = QEngine::with_seed(&c, 1).unwrap();
    engine.execute().unwrap();
    assert_eq!(engine.get_dit(64).unwrap(), 1);
    // c[64] is set, so the register is not zero and q[0] stays flipped
    assert_amps_approx_eq(&engine.get_psi(), &linalg::qubit_ket(&[1]).unwrap(), EPS);

    let parsed = qasm::read_from_str(
        "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\ncreg c[65];\n\
         x q[0];\nmeasure q[0] -> c[64];\nif(c==0) x q[0];\n",
    )
    .unwrap();
    let mut engine = QEngine::with_seed(&parsed, 1).unwrap();
    engine.execute().unwrap();
    assert_amps_approx_eq(&engine.get_psi(), &linalg::qubit_ket(&[1]).unwrap(), EPS);
}

// --- sampling ---

#[test]
fn test_certain_outcome_consumes_no_randomness() {
    let mut a = rng_from_seed(Some(9));
    let mut b = rng_from_seed(Some(9));
    assert_eq!(sample_outcome(&[0.0, 1.0, 0.0], &mut a), 1);
    assert_eq!(a.gen::<u64>(), b.gen::<u64>());
}

#[test]
fn test_zero_probability_outcomes_never_sampled() {
    let mut rng = rng_from_seed(Some(1));
    for _ in 0..2000 {
        let k = sample_outcome(&[0.5, 0.0, 0.5, 0.0], &mut rng);
        assert!(k == 0 || k == 2);
    }
}

#[test]
fn test_shot_streams_are_independent_and_reproducible() {
    let draw = |mut rng: ChaCha8Rng| -> Vec<u64> { (0..4).map(|_| rng.gen()).collect() };
    assert_eq!(draw(shot_rng(3, 0)), draw(shot_rng(3, 0)));
    assert_ne!(draw(shot_rng(3, 0)), draw(shot_rng(3, 1)));
}

// --- state vector and dit store ---

#[test]
fn test_dit_store_bounds_and_bitstring() {
    let mut store = DitStore::new(3);
    store.set(0, 1).unwrap();
    assert_eq!(store.get(0).unwrap(), 1);
    assert_eq!(store.to_bitstring(), "001");
    assert!(matches!(store.set(3, 1), Err(QError::OutOfRange { .. })));
    store.clear();
    assert_eq!(store.as_slice(), &[0, 0, 0]);
}

#[test]
fn test_collapse_keeps_width_and_discard_removes_subsystem() {
    let mut state = QuantumState::new(2);
    state.apply(&gates::h(), &[0]).unwrap();
    state.apply(&gates::cnot(), &[0, 1]).unwrap();
    let probs = state.outcome_probabilities(&[1]).unwrap();
    assert!((probs[0] - 0.5).abs() < EPS && (probs[1] - 0.5).abs() < EPS);

    let mut kept = state.clone();
    kept.collapse(&[1], 1, probs[1]).unwrap();
    assert_eq!(kept.dims(), &[2, 2]);
    assert_amps_approx_eq(&kept.to_ket(), &linalg::qubit_ket(&[1, 1]).unwrap(), EPS);

    state.discard(&[1], 1, probs[1]).unwrap();
    assert_eq!(state.dims(), &[2]);
    assert_amps_approx_eq(&state.to_ket(), &linalg::qubit_ket(&[1]).unwrap(), EPS);
    assert!(state.validate_state(EPS).is_ok());
}

#[test]
fn test_collapse_onto_impossible_outcome_fails() {
    let mut state = QuantumState::new(1);
    assert!(state.collapse(&[0], 1, 0.0).is_err());
}

// --- engine, fixture programs ---

#[test]
fn test_builtin_gates() {
    let (psi1, dits) = run("units/builtingates.qasm", 1);
    let (c0, c1) = (dits[0], dits[1]);
    assert_eq!(c0, 1);
    assert_eq!(c1, 1);

    let m = linalg::kron_ket(
        &linalg::qubit_ket(&[c0]).unwrap(),
        &linalg::qubit_ket(&[c1]).unwrap(),
    );
    let psi2 = gates::rz(0.2)
        .dot(&gates::ry(0.1))
        .dot(&gates::rz(0.3))
        .dot(&ket0());
    let psi3 = gates::rz(0.2 + 3.0 * PI)
        .dot(&gates::rx(PI / 2.0))
        .dot(&gates::rz(0.1 + PI))
        .dot(&gates::rx(PI / 2.0))
        .dot(&gates::rz(0.3))
        .dot(&ket0());
    assert_same_ray(&psi1, &linalg::kron_ket(&psi2, &m), EPS);
    assert_same_ray(&psi1, &linalg::kron_ket(&psi3, &m), EPS);
}

#[test]
fn test_teleportation() {
    for seed in 0..8 {
        let (psi, _) = run("units/teleportation.qasm", seed);
        let rho = linalg::ptrace(&psi, &[0, 1], &[2, 2, 2]).unwrap();
        let psi1 = linalg::rho2pure(&rho).unwrap();
        let psi2 = gates::h().dot(&ket0());
        assert!(linalg::norm(&(&psi1 - &psi2)) < EPS, "seed {}", seed);
    }
}

#[test]
fn test_mapped_gates() {
    let (psi1, _) = run("units/mappedgates.qasm", 0);
    let h0 = gates::h().dot(&ket0());
    let psi2 = linalg::kron_ket(&h0, &h0);
    assert!(linalg::norm(&(&psi1 - &psi2)) < EPS);
}

#[test]
fn test_non_destructive_measurement() {
    for seed in 0..8 {
        let (psi, dits) = run("units/nondestrmeas.qasm", seed);
        let expected = linalg::qubit_ket(&[dits[0]]).unwrap();
        assert!(linalg::norm(&(&psi - &expected)) < EPS);
    }
}

#[test]
fn test_reset() {
    for seed in 0..8 {
        let (psi, _) = run("units/reset.qasm", seed);
        assert!(linalg::norm(&(&psi - &ket0())) < EPS);
    }
}

#[test]
fn test_reset_of_excited_qubit() {
    let circuit = qasm::read_from_str(
        "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\nx q[0];\nh q[1];\nreset q[0];\n",
    )
    .unwrap();
    let plus = gates::h().dot(&ket0());
    for seed in 0..4 {
        let mut engine = QEngine::with_seed(&circuit, seed).unwrap();
        engine.execute().unwrap();
        // q[1] is untouched
        assert_amps_approx_eq(&engine.get_psi(), &linalg::kron_ket(&ket0(), &plus), EPS);
    }
}

#[test]
fn test_reset_of_entangled_qubit() {
    let circuit = qasm::read_from_str(
        "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\nh q[0];\ncx q[0],q[1];\nreset q[0];\n",
    )
    .unwrap();
    let mut seen = [false; 2];
    for seed in 0..16 {
        let mut engine = QEngine::with_seed(&circuit, seed).unwrap();
        engine.execute().unwrap();
        let psi = engine.get_psi();
        assert!((linalg::norm(&psi) - 1.0).abs() < EPS);
        let rho0 = linalg::ptrace(&psi, &[1], &[2, 2]).unwrap();
        assert_complex_approx_eq(rho0[[0, 0]], linalg::ONE, EPS);
        // q[1] collapsed onto a basis state together with q[0]
        let rho1 = linalg::ptrace(&psi, &[0], &[2, 2]).unwrap();
        let k = if rho1[[1, 1]].re > 0.5 { 1 } else { 0 };
        assert_complex_approx_eq(rho1[[k, k]], linalg::ONE, EPS);
        assert_complex_approx_eq(rho1[[0, 1]], linalg::ZERO, EPS);
        seen[k] = true;
    }
    assert!(seen[0] && seen[1]);
}

#[test]
fn test_gate_body_expressions() {
    let (psi, _) = run("units/expressions.qasm", 0);
    let u = gates::u(0.5, 0.0, 0.5);
    let expected = u.dot(&u).dot(&ket0());
    assert_amps_approx_eq(&psi, &expected, EPS);
}

#[test]
fn test_adder_adds() {
    let circuit = load("generic/adder.qasm");
    assert_eq!(circuit.nq(), 10);
    let mut engine = QEngine::with_seed(&circuit, 0).unwrap();
    engine.execute().unwrap();
    // 1 + 15, carry out set
    assert_eq!(engine.dit_store().to_bitstring(), "10000");
}

#[test]
fn test_bigadder_adds() {
    let circuit = load("generic/bigadder.qasm");
    assert_eq!(circuit.nq(), 18);
    let mut engine = QEngine::with_seed(&circuit, 0).unwrap();
    engine.execute().unwrap();
    // carry out, then ans[7..0]
    assert_eq!(engine.dit_store().to_bitstring(), "011000000");
}

#[test]
fn test_deterministic_hardware_programs() {
    for (rel, expected) in [
        ("ibmqx2/Deutsch_Algorithm.qasm", "01000"),
        ("ibmqx2/iswap.qasm", "00010"),
        ("generic/rb.qasm", "00"),
        ("generic/inverseqft2.qasm", "0000"),
    ] {
        for seed in 0..4 {
            let circuit = load(rel);
            let mut engine = QEngine::with_seed(&circuit, seed).unwrap();
            engine.execute().unwrap();
            assert_eq!(engine.dit_store().to_bitstring(), expected, "{}", rel);
        }
    }
}

#[test]
fn test_w3_has_one_excitation() {
    let circuit = load("ibmqx2/W3test.qasm");
    for seed in 0..8 {
        let mut engine = QEngine::with_seed(&circuit, seed).unwrap();
        engine.execute().unwrap();
        assert_eq!(engine.get_dits().iter().sum::<usize>(), 1);
    }
}

#[test]
fn test_repetition_code_corrects_flip() {
    let circuit = load("generic/qec.qasm");
    let mut engine = QEngine::with_seed(&circuit, 0).unwrap();
    engine.execute().unwrap();
    // syn = 01, data back to 000
    assert_eq!(engine.get_dits(), &[0, 0, 0, 1, 0]);
}

#[test]
fn test_semiclassical_inverse_qft() {
    for seed in 0..4 {
        let (_, dits) = run("generic/inverseqft1.qasm", seed);
        assert_eq!(dits, vec![0, 0, 0, 0]);
    }
}

#[test]
fn test_teleport_fixture_runs_and_normalises() {
    let circuit = load("generic/teleport.qasm");
    let mut engine = QEngine::with_seed(&circuit, 5).unwrap();
    engine.execute().unwrap();
    assert!((linalg::norm(&engine.get_psi()) - 1.0).abs() < EPS);
    assert_eq!(engine.get_probs().len(), 3);
    assert!(engine.get_probs().iter().all(|&p| p > 0.0 && p <= 1.0 + EPS));
}

// --- engine, hand-built circuits ---

#[test]
fn test_destructive_measurement_removes_qubit() {
    let mut c = QCircuit::new(2, 1);
    let x = c.define_gate("x", gates::x()).unwrap();
    c.append_gate(x, vec![0]).unwrap();
    c.append_measurement(vec![0], vec![0], true).unwrap();
    c.append_gate(x, vec![1]).unwrap();

    let mut engine = QEngine::with_seed(&c, 0).unwrap();
    engine.execute().unwrap();
    assert_eq!(engine.get_dit(0).unwrap(), 1);
    assert_eq!(engine.get_measured(), vec![0]);
    assert_eq!(engine.get_non_measured(), vec![1]);
    assert_eq!(engine.state().dims(), &[2]);
    assert_amps_approx_eq(&engine.get_psi(), &linalg::qubit_ket(&[1]).unwrap(), EPS);

    c.append_gate(x, vec![0]).unwrap();
    let mut engine = QEngine::with_seed(&c, 0).unwrap();
    assert!(matches!(engine.execute(), Err(QError::QubitMeasured(0))));
}

#[test]
fn test_conditional_gate_follows_dits() {
    let mut c = QCircuit::new(2, 1);
    let x = c.define_gate("x", gates::x()).unwrap();
    c.append_gate(x, vec![0]).unwrap();
    c.append_measurement(vec![0], vec![0], false).unwrap();
    c.append_conditional(x, vec![1], Condition::single(0, 1)).unwrap();
    c.append_conditional(x, vec![0], Condition::single(0, 0)).unwrap();

    let mut engine = QEngine::with_seed(&c, 0).unwrap();
    engine.execute().unwrap();
    assert_amps_approx_eq(&engine.get_psi(), &linalg::qubit_ket(&[1, 1]).unwrap(), EPS);
}

#[test]
fn test_repeated_measurement_agrees() {
    let mut c = QCircuit::new(1, 2);
    let h = c.define_gate("h", gates::h()).unwrap();
    c.append_gate(h, vec![0]).unwrap();
    c.append_measurement(vec![0], vec![0], false).unwrap();
    c.append_measurement(vec![0], vec![1], false).unwrap();
    for seed in 0..16 {
        let mut engine = QEngine::with_seed(&c, seed).unwrap();
        engine.execute().unwrap();
        assert_eq!(engine.get_dit(0).unwrap(), engine.get_dit(1).unwrap());
        assert!((engine.get_probs()[0] - 0.5).abs() < EPS);
        assert!((engine.get_probs()[1] - 1.0).abs() < EPS);
    }
}

#[test]
fn test_step_status_and_reset() {
    let circuit = load("generic/bell.qasm");
    let mut engine = QEngine::with_seed(&circuit, 2).unwrap();
    assert_eq!(engine.status(), EngineStatus::Ready);
    assert!(engine.step().unwrap());
    assert_eq!(engine.pc(), 1);
    engine.execute().unwrap();
    assert_eq!(engine.status(), EngineStatus::Halted);
    assert!(!engine.step().unwrap());
    let dits = engine.get_dits().to_vec();
    assert_eq!(dits[0], dits[1]);

    engine.reset();
    assert_eq!(engine.status(), EngineStatus::Ready);
    assert_eq!(engine.pc(), 0);
    assert_eq!(engine.get_dits(), &[0, 0]);
    assert!(engine.get_probs().is_empty());
    assert_amps_approx_eq(&engine.get_psi(), &linalg::qubit_ket(&[0, 0]).unwrap(), EPS);
}

#[test]
fn test_empty_circuit_starts_ready() {
    let circuit = QCircuit::new(2, 0);
    let mut engine = QEngine::with_seed(&circuit, 0).unwrap();
    assert_eq!(engine.status(), EngineStatus::Ready);
    assert!(!engine.step().unwrap());
    assert_eq!(engine.status(), EngineStatus::Halted);
    engine.reset();
    assert_eq!(engine.status(), EngineStatus::Ready);
}

#[test]
fn test_unaddressable_qubit_count() {
    for nq in [64, 200] {
        let circuit = QCircuit::new(nq, 0);
        assert!(matches!(
            QEngine::with_seed(&circuit, 0),
            Err(QError::DimensionMismatch(_))
        ));
    }
}

#[test]
fn test_same_seed_same_run() {
    let circuit = load("generic/W-state.qasm");
    let outcomes: Vec<Vec<usize>> = (0..2)
        .map(|_| {
            let mut engine = QEngine::with_seed(&circuit, 77).unwrap();
            engine.execute().unwrap();
            engine.get_dits().to_vec()
        })
        .collect();
    assert_eq!(outcomes[0], outcomes[1]);
    // exactly one excitation
    assert_eq!(outcomes[0].iter().sum::<usize>(), 1);
}

#[test]
fn test_run_shots_bell_histogram() {
    let circuit = load("generic/bell.qasm");
    let hist = runtime::run_shots(&circuit, 400, 12).unwrap();
    assert_eq!(hist.values().sum::<usize>(), 400);
    assert!(hist.keys().all(|k| k == "00" || k == "11"));
    assert!(hist.get("00").copied().unwrap_or(0) > 100);
    assert!(hist.get("11").copied().unwrap_or(0) > 100);
    assert_eq!(hist, runtime::run_shots(&circuit, 400, 12).unwrap());
}

#[test]
fn test_single_shot_engine_is_shot_zero() {
    let circuit = load("generic/W-state.qasm");
    for seed in 0..8 {
        let mut engine = runtime::shot_engine(&circuit, seed, 0).unwrap();
        engine.execute().unwrap();
        let hist = runtime::run_shots(&circuit, 1, seed).unwrap();
        assert_eq!(hist.get(&engine.dit_store().to_bitstring()), Some(&1));
        assert_eq!(
            runtime::run_single_shot(&circuit, seed, 0).unwrap(),
            engine.dit_store().to_bitstring()
        );
    }
}

// --- lexer and parser ---

#[test]
fn test_lexer_positions_comments_and_division() {
    let tokens = tokenize("a / b // note\n  1.5e-3 -> ==").unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Slash,
            TokenKind::Ident("b".into()),
            TokenKind::Real(1.5e-3),
            TokenKind::Arrow,
            TokenKind::EqEq,
            TokenKind::Eof,
        ]
    );
    assert_eq!(tokens[3].pos.line, 2);
    assert_eq!(tokens[3].pos.column, 3);
    assert!(tokenize("x = 1").unwrap_err().is_parse_error());
    assert!(tokenize("include \"oops").unwrap_err().is_parse_error());
}

#[test]
fn test_std_compliance_corpus_parses() {
    for name in [
        "generic/adder.qasm",
        "generic/bell.qasm",
        "generic/bigadder.qasm",
        "generic/inverseqft1.qasm",
        "generic/inverseqft2.qasm",
        "generic/ipea_3_pi_8.qasm",
        "generic/pea_3_pi_8.qasm",
        "generic/qec.qasm",
        "generic/qft.qasm",
        "generic/qpt.qasm",
        "generic/rb.qasm",
        "generic/teleport.qasm",
        "generic/teleportv2.qasm",
        "generic/W-state.qasm",
        "ibmqx2/011_3_qubit_grover_50_.qasm",
        "ibmqx2/Deutsch_Algorithm.qasm",
        "ibmqx2/iswap.qasm",
        "ibmqx2/qe_qft_3.qasm",
        "ibmqx2/qe_qft_4.qasm",
        "ibmqx2/qe_qft_5.qasm",
        "ibmqx2/W3test.qasm",
    ] {
        let circuit = qasm::read_from_file(fixture(name));
        assert!(circuit.is_ok(), "{}: {:?}", name, circuit.err());
    }
}

#[test]
fn test_invalid_corpus() {
    let err = qasm::read_from_file(fixture("invalid/gate_no_found.qasm")).unwrap_err();
    assert!(err.is_undeclared(), "{}", err);
    let err = qasm::read_from_file(fixture("invalid/missing_semicolon.qasm")).unwrap_err();
    assert!(err.is_parse_error(), "{}", err);
}

#[test]
fn test_circuit_named_after_file() {
    assert_eq!(load("generic/qft.qasm").name(), Some("qft"));
    assert_eq!(qasm::read_from_str("OPENQASM 2.0;").unwrap().name(), None);
}

#[test]
fn test_register_broadcasting() {
    let c = qasm::read_from_str(
        "OPENQASM 2.0; include \"qelib1.inc\"; qreg a[3]; qreg b[3]; creg m[3];\
         cx a,b; cx a[0],b; h a; measure b -> m;",
    )
    .unwrap();
    assert_eq!(c.nq(), 6);
    assert_eq!(c.gate_count(), 9);
    assert_eq!(c.measurement_count(), 3);
    match &c.operations()[1] {
        Operation::Gate { targets, .. } => assert_eq!(targets, &vec![1, 4]),
        other => panic!("unexpected {:?}", other),
    }
    match &c.operations()[4] {
        Operation::Gate { targets, .. } => assert_eq!(targets, &vec![0, 4]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_if_reads_whole_register() {
    let c = qasm::read_from_str(
        "OPENQASM 2.0; include \"qelib1.inc\"; qreg q[1]; creg lo[1]; creg c[2]; if(c==2) x q[0];",
    )
    .unwrap();
    match &c.operations()[0] {
        Operation::Conditional { condition, .. } => {
            assert_eq!(condition.dits, vec![1, 2]);
            assert_eq!(condition.value, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_parse_errors() {
    let head = "OPENQASM 2.0; include \"qelib1.inc\";";
    let cases = [
        "qreg q[1];".to_string(),
        "OPENQASM 3.0; qreg q[1];".to_string(),
        format!("{} qreg q[2]; qreg q[1];", head),
        format!("{} qreg q[0];", head),
        format!("{} qreg a[2]; qreg b[3]; cx a,b;", head),
        format!("{} qreg q[2]; cx q[0],q[0];", head),
        format!("{} qreg q[1]; creg c[1]; if(c==1) measure q[0] -> c[0];", head),
        format!("{} qreg q[1]; creg c[1]; if(c==1) reset q[0];", head),
        format!("{} opaque magic a; qreg q[1]; magic q[0];", head),
        format!("{} qreg q[1]; rx q[0];", head),
        format!("{} qreg q[1]; h(0.1) q[0];", head),
        format!("{} qreg q[2]; h q[0], q[1];", head),
        format!("{} gate h a {{ U(0,0,0) a; }}", head),
        format!("{} gate g a, a {{ }}", head),
        format!("{} qreg q[1]; U(foo(1),0,0) q[0];", head),
        format!("{} qreg q[2]; creg c[1]; measure q -> c;", head),
        format!("{} qreg q[1]; OPENQASM 2.0;", head),
    ];
    for src in &cases {
        let err = parse_err(src);
        assert!(err.is_parse_error(), "{} -> {}", src, err);
    }
}

#[test]
fn test_undeclared_errors() {
    let head = "OPENQASM 2.0; include \"qelib1.inc\";";
    let cases = [
        (format!("{} qreg q[1]; foo q[0];", head), SymbolKind::Gate),
        (format!("{} h r[0];", head), SymbolKind::QuantumRegister),
        (format!("{} qreg q[2]; h q[2];", head), SymbolKind::Qubit),
        (format!("{} qreg q[1]; measure q[0] -> c[0];", head), SymbolKind::ClassicalRegister),
        (format!("{} qreg q[1]; creg c[1]; measure q[0] -> c[1];", head), SymbolKind::Dit),
        (format!("{} qreg q[1]; creg c[1]; if(d==1) x q[0];", head), SymbolKind::ClassicalRegister),
        (format!("{} gate g(a) q {{ rx(b) q; }}", head), SymbolKind::Parameter),
        (format!("{} gate g q {{ x r; }}", head), SymbolKind::Qubit),
        (format!("{} gate g q {{ nope q; }}", head), SymbolKind::Gate),
        (format!("{} qreg q[1]; U(theta,0,0) q[0];", head), SymbolKind::Parameter),
    ];
    for (src, kind) in &cases {
        match parse_err(src) {
            QError::Undeclared { kind: k, .. } => assert_eq!(k, *kind, "{}", src),
            other => panic!("{} -> {}", src, other),
        }
    }
}

#[test]
fn test_error_positions() {
    match parse_err("OPENQASM 2.0;\nqreg q[1];\n  bogus q[0];") {
        QError::Undeclared {
            position: Some(p), ..
        } => {
            assert_eq!(p.line, 3);
            assert_eq!(p.column, 3);
        }
        other => panic!("unexpected {}", other),
    }
}

#[test]
fn test_opaque_declaration_alone_is_fine() {
    let c = qasm::read_from_str("OPENQASM 2.0; opaque magic(a) q, r; qreg q[2]; barrier q;").unwrap();
    assert!(c.is_empty());
}

#[test]
fn test_user_gates_compose_in_order() {
    // s then h on one qubit, as a single definition
    let c = qasm::read_from_str(
        "OPENQASM 2.0; include \"qelib1.inc\"; gate sh a { s a; h a; } qreg q[1]; sh q[0];",
    )
    .unwrap();
    let m = &c.gates()[0].matrix;
    assert_mat_approx_eq(m, &gates::h().dot(&gates::s()), EPS);
}

#[test]
fn test_local_include_next_to_file() {
    let (psi, _) = run("units/local_include.qasm", 0);
    assert_same_ray(&psi, &linalg::qubit_ket(&[1, 1]).unwrap(), EPS);
}

#[test]
fn test_include_search_paths_and_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib");
    fs::create_dir(&lib).unwrap();
    fs::write(lib.join("extra.inc"), "gate flip a { U(pi,0,pi) a; }").unwrap();
    fs::write(
        dir.path().join("main.qasm"),
        "OPENQASM 2.0; include \"extra.inc\"; qreg q[1]; flip q[0];",
    )
    .unwrap();

    let err = qasm::read_from_file(dir.path().join("main.qasm")).unwrap_err();
    assert!(matches!(err, QError::Io { .. }), "{}", err);
    let c = QasmReader::new()
        .with_include_paths([&lib])
        .read_file(dir.path().join("main.qasm"))
        .unwrap();
    assert_eq!(c.gate_count(), 1);

    fs::write(dir.path().join("a.inc"), "include \"b.inc\";").unwrap();
    fs::write(dir.path().join("b.inc"), "include \"a.inc\";").unwrap();
    fs::write(
        dir.path().join("cycle.qasm"),
        "OPENQASM 2.0; include \"a.inc\";",
    )
    .unwrap();
    let err = qasm::read_from_file(dir.path().join("cycle.qasm")).unwrap_err();
    assert!(err.is_parse_error(), "{}", err);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = qasm::read_from_file(fixture("does/not/exist.qasm")).unwrap_err();
    assert!(matches!(err, QError::Io { .. }));
}

// --- configuration ---

#[test]
fn test_config_file_and_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.json");
    fs::write(&path, r#"{ "seed": 5, "shots": 10, "include_paths": ["inc"] }"#).unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    assert_eq!(config.seed, Some(5));
    assert_eq!(config.shots, 10);
    assert_eq!(config.amplitude_cutoff, 1e-10);

    let merged = config.merge_cli(Some(8), None, &[PathBuf::from("more")]);
    assert_eq!(merged.seed, Some(8));
    assert_eq!(merged.shots, 10);
    assert_eq!(merged.include_paths, vec![PathBuf::from("inc"), PathBuf::from("more")]);

    fs::write(&path, r#"{ "sed": 5 }"#).unwrap();
    assert!(matches!(SimConfig::from_file(&path), Err(QError::Io { .. })));
}
