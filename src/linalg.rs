// dense complex linear algebra used by the engine and by the tests

use crate::error::{QError, QResult};
use crate::tensor::{
    check_dims, check_dims_match_len, check_subsys_match_dims, multiidx2n, n2multiidx_into,
    prod_dims,
};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

pub type Ket = Array1<Complex64>;
pub type CMat = Array2<Complex64>;

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

pub fn identity(n: usize) -> CMat {
    Array2::eye(n)
}

pub fn adjoint(a: &CMat) -> CMat {
    a.t().mapv(|z| z.conj())
}

/// Kronecker product `a ⊗ b`.
pub fn kron(a: &CMat, b: &CMat) -> CMat {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    let mut out = Array2::zeros((ar * br, ac * bc));
    for ((i, j), &x) in a.indexed_iter() {
        if x == ZERO {
            continue;
        }
        let mut block = out.slice_mut(ndarray::s![i * br..(i + 1) * br, j * bc..(j + 1) * bc]);
        block.zip_mut_with(b, |o, &y| *o = x * y);
    }
    out
}

pub fn kron_ket(a: &Ket, b: &Ket) -> Ket {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for &x in a.iter() {
        out.extend(b.iter().map(|&y| x * y));
    }
    Array1::from(out)
}

/// Euclidean norm.
pub fn norm(v: &Ket) -> f64 {
    v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

/// `<a|b>`
pub fn inner(a: &Ket, b: &Ket) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

/// Computational basis ket for a multi-index over `dims`.
pub fn mket(midx: &[usize], dims: &[usize]) -> QResult<Ket> {
    if !check_dims(dims) || midx.len() != dims.len() {
        return Err(QError::DimensionMismatch(format!(
            "multi-index of length {} against dims {:?}",
            midx.len(),
            dims
        )));
    }
    if let Some((i, _)) = midx.iter().zip(dims).enumerate().find(|(_, (m, d))| m >= d) {
        return Err(QError::OutOfRange {
            what: "multi-index entry",
            index: midx[i],
            limit: dims[i],
        });
    }
    let mut ket = Array1::zeros(prod_dims(dims));
    ket[multiidx2n(midx, dims)] = ONE;
    Ok(ket)
}

/// Computational basis ket of qubits, e.g. `qubit_ket(&[1, 0])` is |10>.
pub fn qubit_ket(bits: &[usize]) -> QResult<Ket> {
    mket(bits, &vec![2; bits.len()])
}

fn check_operator(a: &CMat, subsys: &[usize], dims: &[usize]) -> QResult<Vec<usize>> {
    if !check_dims(dims) {
        return Err(QError::DimensionMismatch(format!("invalid dimension vector {:?}", dims)));
    }
    if subsys.is_empty() || !check_subsys_match_dims(subsys, dims) {
        return Err(QError::InvalidTargets(format!(
            "subsystems {:?} do not match dims {:?}",
            subsys, dims
        )));
    }
    let sub_dims: Vec<usize> = subsys.iter().map(|&s| dims[s]).collect();
    let (rows, cols) = a.dim();
    if rows != cols || !check_dims_match_len(&sub_dims, rows) {
        return Err(QError::DimensionMismatch(format!(
            "{}x{} operator on subsystems with dims {:?}",
            rows, cols, sub_dims
        )));
    }
    Ok(sub_dims)
}

/// Joint-space matrix of `a` acting on `subsys`, identity elsewhere.
///
/// Built element by element from the definition: `<i|A|j>` is non-zero only
/// when `i` and `j` agree on every untouched subsystem. Quadratic in the
/// joint dimension, so only meant for small systems.
pub fn expand(a: &CMat, subsys: &[usize], dims: &[usize]) -> QResult<CMat> {
    let sub_dims = check_operator(a, subsys, dims)?;
    let total = prod_dims(dims);
    let mut out = Array2::zeros((total, total));
    let mut mi = vec![0; dims.len()];
    let mut mj = vec![0; dims.len()];
    let mut si = vec![0; subsys.len()];
    let mut sj = vec![0; subsys.len()];
    for i in 0..total {
        n2multiidx_into(i, dims, &mut mi);
        for j in 0..total {
            n2multiidx_into(j, dims, &mut mj);
            let untouched_equal = (0..dims.len())
                .filter(|k| !subsys.contains(k))
                .all(|k| mi[k] == mj[k]);
            if !untouched_equal {
                continue;
            }
            for (p, &s) in subsys.iter().enumerate() {
                si[p] = mi[s];
                sj[p] = mj[s];
            }
            out[[i, j]] = a[[multiidx2n(&si, &sub_dims), multiidx2n(&sj, &sub_dims)]];
        }
    }
    Ok(out)
}

/// Applies `a` to the subsystems `subsys` of the state `psi` with dimensions `dims`.
///
/// Iterates over the multi-indices of the untouched subsystems (in parallel),
/// gathers the amplitudes addressed by the targets, multiplies and scatters back.
pub fn apply(psi: &[Complex64], a: &CMat, subsys: &[usize], dims: &[usize]) -> QResult<Vec<Complex64>> {
    let sub_dims = check_operator(a, subsys, dims)?;
    if !check_dims_match_len(dims, psi.len()) {
        return Err(QError::DimensionMismatch(format!(
            "state of length {} against dims {:?}",
            psi.len(),
            dims
        )));
    }

    let rest: Vec<usize> = (0..dims.len()).filter(|k| !subsys.contains(k)).collect();
    let rest_dims: Vec<usize> = rest.iter().map(|&k| dims[k]).collect();
    let d_sub = prod_dims(&sub_dims);
    let d_rest = prod_dims(&rest_dims);

    let blocks: Vec<(Vec<usize>, Vec<Complex64>)> = (0..d_rest)
        .into_par_iter()
        .map(|r| {
            let mut midx = vec![0; dims.len()];
            let mut rest_midx = vec![0; rest.len()];
            let mut sub_midx = vec![0; subsys.len()];
            n2multiidx_into(r, &rest_dims, &mut rest_midx);
            for (p, &k) in rest.iter().enumerate() {
                midx[k] = rest_midx[p];
            }
            let indices: Vec<usize> = (0..d_sub)
                .map(|t| {
                    n2multiidx_into(t, &sub_dims, &mut sub_midx);
                    for (p, &s) in subsys.iter().enumerate() {
                        midx[s] = sub_midx[p];
                    }
                    multiidx2n(&midx, dims)
                })
                .collect();
            let values = (0..d_sub)
                .map(|row| {
                    indices
                        .iter()
                        .enumerate()
                        .map(|(col, &idx)| a[[row, col]] * psi[idx])
                        .sum()
                })
                .collect();
            (indices, values)
        })
        .collect();

    let mut out = vec![ZERO; psi.len()];
    for (indices, values) in blocks {
        for (idx, v) in indices.into_iter().zip(values) {
            out[idx] = v;
        }
    }
    Ok(out)
}

/// `expand(a, subsys, dims).dot(m)` without materialising the expanded
/// operator. The rows of `m` are addressed by `dims` and its columns are
/// carried along as one extra trailing subsystem.
pub fn apply_left(a: &CMat, subsys: &[usize], dims: &[usize], m: &CMat) -> QResult<CMat> {
    let (rows, cols) = m.dim();
    let mut joint = dims.to_vec();
    joint.push(cols);
    let flat: Vec<Complex64> = m.iter().copied().collect();
    let out = apply(&flat, a, subsys, &joint)?;
    Array2::from_shape_vec((rows, cols), out).map_err(|e| QError::DimensionMismatch(e.to_string()))
}

/// Partial trace of the pure state `psi` over `subsys`, giving the reduced
/// density matrix of the remaining subsystems.
pub fn ptrace(psi: &Ket, subsys: &[usize], dims: &[usize]) -> QResult<CMat> {
    if !check_dims(dims) || !check_dims_match_len(dims, psi.len()) {
        return Err(QError::DimensionMismatch(format!(
            "state of length {} against dims {:?}",
            psi.len(),
            dims
        )));
    }
    if !check_subsys_match_dims(subsys, dims) {
        return Err(QError::InvalidTargets(format!(
            "subsystems {:?} do not match dims {:?}",
            subsys, dims
        )));
    }
    let keep: Vec<usize> = (0..dims.len()).filter(|k| !subsys.contains(k)).collect();
    let keep_dims: Vec<usize> = keep.iter().map(|&k| dims[k]).collect();
    let traced_dims: Vec<usize> = subsys.iter().map(|&k| dims[k]).collect();
    let d_keep = prod_dims(&keep_dims);
    let d_traced = prod_dims(&traced_dims);

    let mut rho = Array2::zeros((d_keep, d_keep));
    let mut midx = vec![0; dims.len()];
    let mut km = vec![0; keep.len()];
    let mut tm = vec![0; subsys.len()];
    let mut column = vec![ZERO; d_keep];
    for t in 0..d_traced {
        n2multiidx_into(t, &traced_dims, &mut tm);
        for (p, &s) in subsys.iter().enumerate() {
            midx[s] = tm[p];
        }
        for (i, c) in column.iter_mut().enumerate() {
            n2multiidx_into(i, &keep_dims, &mut km);
            for (p, &k) in keep.iter().enumerate() {
                midx[k] = km[p];
            }
            *c = psi[multiidx2n(&midx, dims)];
        }
        for i in 0..d_keep {
            for j in 0..d_keep {
                rho[[i, j]] += column[i] * column[j].conj();
            }
        }
    }
    Ok(rho)
}

/// Ket `|ψ>` of a rank-one density matrix `|ψ><ψ|`, with the global phase
/// chosen so the largest component is real and positive.
pub fn rho2pure(rho: &CMat) -> QResult<Ket> {
    let (rows, cols) = rho.dim();
    if rows != cols || rows == 0 {
        return Err(QError::DimensionMismatch(format!(
            "{}x{} is not a density matrix",
            rows, cols
        )));
    }
    let (k, weight) = (0..rows)
        .map(|i| (i, rho[[i, i]].re))
        .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    if weight <= 0.0 {
        return Err(QError::DimensionMismatch("density matrix has zero trace".into()));
    }
    Ok(rho.column(k).mapv(|z| z / weight.sqrt()))
}
