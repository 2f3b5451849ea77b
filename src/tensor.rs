// index translation between flat state indices and per-subsystem multi-indices,
// plus the structural checks run before any tensor-structured numeric work.
//
// ordering is lexicographic with the first subsystem most significant,
// e.g. for dims [2, 2]: 00 -> 0, 01 -> 1, 10 -> 2, 11 -> 3

use itertools::Itertools;

/// Flat index to multi-index. No bounds checks, `n` must be below the product of `dims`.
pub fn n2multiidx(n: usize, dims: &[usize]) -> Vec<usize> {
    let mut result = vec![0; dims.len()];
    n2multiidx_into(n, dims, &mut result);
    result
}

/// Same as [`n2multiidx`] but writes into a caller-provided buffer (hot path).
#[inline]
pub fn n2multiidx_into(n: usize, dims: &[usize], result: &mut [usize]) {
    let mut rest = n;
    for i in (0..dims.len()).rev() {
        result[i] = rest % dims[i];
        rest /= dims[i];
    }
}

/// Multi-index to flat index. No bounds checks.
#[inline]
pub fn multiidx2n(midx: &[usize], dims: &[usize]) -> usize {
    // horner form of sum(midx[i] * prod(dims[j], j > i))
    midx.iter()
        .zip(dims.iter())
        .fold(0, |acc, (&m, &d)| acc * d + m)
}

/// Product of all entries of a dimension vector.
pub fn prod_dims(dims: &[usize]) -> usize {
    dims.iter().product()
}

// ---- structural validation ----
// predicates only, the caller decides what a failure means

/// Non-empty and every entry positive.
pub fn check_dims(dims: &[usize]) -> bool {
    !dims.is_empty() && dims.iter().all(|&d| d > 0)
}

/// A vector (or one side of a square matrix) of length `len` matches `dims`.
pub fn check_dims_match_len(dims: &[usize], len: usize) -> bool {
    prod_dims(dims) == len
}

/// Square matrix given by its row and column counts.
pub fn check_square(rows: usize, cols: usize) -> bool {
    rows == cols && rows > 0
}

/// Every subsystem has dimension `dim`.
pub fn check_eq_dims(dims: &[usize], dim: usize) -> bool {
    dims.iter().all(|&d| d == dim)
}

/// Subsystem list is duplicate-free and indexes into `dims`.
pub fn check_subsys_match_dims(subsys: &[usize], dims: &[usize]) -> bool {
    subsys.len() <= dims.len()
        && subsys.iter().all_unique()
        && subsys.iter().all(|&s| s < dims.len())
}

/// `perm` is a bijection on {0, .., dims.len() - 1}.
pub fn check_perm_match_dims(perm: &[usize], dims: &[usize]) -> bool {
    if perm.len() != dims.len() {
        return false;
    }
    perm.iter().sorted().enumerate().all(|(i, &p)| i == p)
}

/// `n` is a power of `d` (including d^0 = 1), returning the exponent.
pub fn log_dim(n: usize, d: usize) -> Option<usize> {
    if n == 0 || d < 2 {
        return None;
    }
    let mut k = 0;
    let mut acc = 1usize;
    while acc < n {
        acc = acc.checked_mul(d)?;
        k += 1;
    }
    (acc == n).then_some(k)
}
