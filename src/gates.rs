// built-in gate matrices. multi-qubit gates list their first qubit as the
// most significant subsystem, matching the ordering in `tensor`.

use crate::linalg::{CMat, ONE, ZERO};
use ndarray::{array, Array2};
use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

const I: Complex64 = Complex64::new(0.0, 1.0);

fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

// e^{i*theta}
fn phase(theta: f64) -> Complex64 {
    Complex64::new(0.0, theta).exp()
}

pub fn id() -> CMat {
    Array2::eye(2)
}

pub fn x() -> CMat {
    array![[ZERO, ONE], [ONE, ZERO]]
}

pub fn y() -> CMat {
    array![[ZERO, -I], [I, ZERO]]
}

pub fn z() -> CMat {
    array![[ONE, ZERO], [ZERO, -ONE]]
}

pub fn h() -> CMat {
    let s = c(FRAC_1_SQRT_2);
    array![[s, s], [s, -s]]
}

pub fn s() -> CMat {
    phase_shift(FRAC_PI_2)
}

pub fn sdg() -> CMat {
    phase_shift(-FRAC_PI_2)
}

pub fn t() -> CMat {
    phase_shift(FRAC_PI_4)
}

pub fn tdg() -> CMat {
    phase_shift(-FRAC_PI_4)
}

/// diag(1, e^{iθ})
pub fn phase_shift(theta: f64) -> CMat {
    array![[ONE, ZERO], [ZERO, phase(theta)]]
}

pub fn rx(theta: f64) -> CMat {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos), -I * sin], [-I * sin, c(cos)]]
}

pub fn ry(theta: f64) -> CMat {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos), c(-sin)], [c(sin), c(cos)]]
}

/// diag(e^{-iθ/2}, e^{iθ/2})
pub fn rz(theta: f64) -> CMat {
    array![[phase(-theta / 2.0), ZERO], [ZERO, phase(theta / 2.0)]]
}

/// The assembly-level `U(θ,φ,λ)`, defined as `RZ(φ)·RY(θ)·RZ(λ)`.
pub fn u(theta: f64, phi: f64, lambda: f64) -> CMat {
    rz(phi).dot(&ry(theta)).dot(&rz(lambda))
}

// ibm conventions, these differ from `u` by a global phase
pub fn u3(theta: f64, phi: f64, lambda: f64) -> CMat {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![
        [c(cos), -phase(lambda) * sin],
        [phase(phi) * sin, phase(phi + lambda) * cos]
    ]
}

pub fn u2(phi: f64, lambda: f64) -> CMat {
    u3(FRAC_PI_2, phi, lambda)
}

pub fn u1(lambda: f64) -> CMat {
    phase_shift(lambda)
}

/// Controlled version of `target`, the control being the first (most significant) qubit.
pub fn controlled(target: &CMat) -> CMat {
    let n = target.nrows();
    let mut out = Array2::eye(2 * n);
    out.slice_mut(ndarray::s![n.., n..]).assign(target);
    out
}

pub fn cnot() -> CMat {
    controlled(&x())
}

pub fn cz() -> CMat {
    controlled(&z())
}

pub fn cy() -> CMat {
    controlled(&y())
}

pub fn ch() -> CMat {
    controlled(&h())
}

pub fn ccx() -> CMat {
    controlled(&cnot())
}

pub fn swap() -> CMat {
    let mut out = Array2::zeros((4, 4));
    out[[0, 0]] = ONE;
    out[[1, 2]] = ONE;
    out[[2, 1]] = ONE;
    out[[3, 3]] = ONE;
    out
}

pub fn crz(theta: f64) -> CMat {
    controlled(&rz(theta))
}

pub fn cu1(lambda: f64) -> CMat {
    controlled(&u1(lambda))
}

pub fn cu3(theta: f64, phi: f64, lambda: f64) -> CMat {
    controlled(&u3(theta, phi, lambda))
}

/// Matrices substituted for the standard library gates when it is included.
/// Returns `None` for names that have no built-in counterpart or the wrong
/// number of arguments.
pub fn mapped(name: &str, args: &[f64]) -> Option<CMat> {
    let m = match (name, args) {
        ("id", []) => id(),
        ("x", []) => x(),
        ("y", []) => y(),
        ("z", []) => z(),
        ("h", []) => h(),
        ("s", []) => s(),
        ("sdg", []) => sdg(),
        ("t", []) => t(),
        ("tdg", []) => tdg(),
        ("rx", [theta]) => rx(*theta),
        ("ry", [theta]) => ry(*theta),
        ("rz", [theta]) => rz(*theta),
        ("u1", [lambda]) => u1(*lambda),
        ("u2", [phi, lambda]) => u2(*phi, *lambda),
        ("u3", [theta, phi, lambda]) => u3(*theta, *phi, *lambda),
        ("cx", []) => cnot(),
        ("cy", []) => cy(),
        ("cz", []) => cz(),
        ("ch", []) => ch(),
        ("ccx", []) => ccx(),
        ("swap", []) => swap(),
        ("crz", [theta]) => crz(*theta),
        ("cu1", [lambda]) => cu1(*lambda),
        ("cu3", [theta, phi, lambda]) => cu3(*theta, *phi, *lambda),
        _ => return None,
    };
    Some(m)
}

/// Largest deviation of `m† m` from the identity.
pub fn unitarity_error(m: &CMat) -> f64 {
    let prod = crate::linalg::adjoint(m).dot(m);
    prod.indexed_iter()
        .map(|((i, j), z)| {
            let expected = if i == j { ONE } else { ZERO };
            (z - expected).norm()
        })
        .fold(0.0, f64::max)
}
