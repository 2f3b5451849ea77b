use crate::error::{QError, QResult};
use crate::linalg::{self, CMat, Ket, ONE, ZERO};
use crate::tensor::{check_dims, check_dims_match_len, check_subsys_match_dims, multiidx2n, n2multiidx_into, prod_dims};
use ndarray::Array1;
use num_complex::Complex64;
use rayon::prelude::*;

// outcome probability below which a projection annihilates the state
const MIN_OUTCOME_PROB: f64 = 1e-12;

/// Pure state over a tensor product of subsystems with dimensions `dims`.
#[derive(Debug, Clone)]
pub struct QuantumState {
    dims: Vec<usize>,
    amps: Vec<Complex64>,
}

impl QuantumState {
    /// |0...0> over `n` qubits.
    pub fn new(n: usize) -> Self {
        Self::zero(vec![2; n])
    }

    /// |0...0> over arbitrary subsystem dimensions. An empty `dims` gives the
    /// one-dimensional state of zero subsystems.
    pub fn zero(dims: Vec<usize>) -> Self {
        let mut amps = vec![ZERO; prod_dims(&dims)];
        amps[0] = ONE;
        QuantumState { dims, amps }
    }

    pub fn from_amps(amps: Vec<Complex64>, dims: Vec<usize>) -> QResult<Self> {
        if !check_dims(&dims) || !check_dims_match_len(&dims, amps.len()) {
            return Err(QError::DimensionMismatch(format!(
                "{} amplitudes against dims {:?}",
                amps.len(),
                dims
            )));
        }
        Ok(QuantumState { dims, amps })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amps
    }

    pub fn to_ket(&self) -> Ket {
        Array1::from(self.amps.clone())
    }

    pub fn get(&self, index: usize) -> Option<&Complex64> {
        self.amps.get(index)
    }

    pub fn norm(&self) -> f64 {
        self.amps.par_iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt()
    }

    pub fn get_probabilities(&self) -> Vec<f64> {
        self.amps.par_iter().map(|a| a.norm_sqr()).collect()
    }

    // checks for non-finite amplitudes and normalisation within `tolerance`
    pub fn validate_state(&self, tolerance: f64) -> QResult<()> {
        if self.amps.par_iter().any(|a| !a.re.is_finite() || !a.im.is_finite()) {
            return Err(QError::DimensionMismatch("state contains non-finite amplitudes".into()));
        }
        let norm = self.norm();
        if (norm - 1.0).abs() > tolerance {
            return Err(QError::DimensionMismatch(format!(
                "state is not normalized, norm {}",
                norm
            )));
        }
        Ok(())
    }

    fn check_targets(&self, targets: &[usize]) -> QResult<()> {
        if let Some(&t) = targets.iter().find(|&&t| t >= self.dims.len()) {
            return Err(QError::OutOfRange {
                what: "subsystem",
                index: t,
                limit: self.dims.len(),
            });
        }
        if targets.is_empty() || !check_subsys_match_dims(targets, &self.dims) {
            return Err(QError::InvalidTargets(format!("bad subsystem list {:?}", targets)));
        }
        Ok(())
    }

    /// Applies the operator `gate` to the subsystems `targets`.
    pub fn apply(&mut self, gate: &CMat, targets: &[usize]) -> QResult<()> {
        self.check_targets(targets)?;
        self.amps = linalg::apply(&self.amps, gate, targets, &self.dims)?;
        Ok(())
    }

    /// Born-rule distribution of the joint outcome on `targets`, indexed by
    /// the flat index of the outcome multi-index.
    pub fn outcome_probabilities(&self, targets: &[usize]) -> QResult<Vec<f64>> {
        self.check_targets(targets)?;
        let sub_dims: Vec<usize> = targets.iter().map(|&t| self.dims[t]).collect();
        let mut probs = vec![0.0; prod_dims(&sub_dims)];
        let mut midx = vec![0; self.dims.len()];
        let mut sub_midx = vec![0; targets.len()];
        for (n, amp) in self.amps.iter().enumerate() {
            n2multiidx_into(n, &self.dims, &mut midx);
            for (p, &t) in targets.iter().enumerate() {
                sub_midx[p] = midx[t];
            }
            probs[multiidx2n(&sub_midx, &sub_dims)] += amp.norm_sqr();
        }
        Ok(probs)
    }

    /// Projects onto `outcome` (flat index over the target dimensions) and
    /// renormalises by `sqrt(prob)`. The subsystems stay in the state.
    pub fn collapse(&mut self, targets: &[usize], outcome: usize, prob: f64) -> QResult<()> {
        self.check_targets(targets)?;
        if prob <= MIN_OUTCOME_PROB {
            return Err(QError::DimensionMismatch(format!(
                "cannot collapse onto outcome {} of probability {}",
                outcome, prob
            )));
        }
        let sub_dims: Vec<usize> = targets.iter().map(|&t| self.dims[t]).collect();
        let dims = &self.dims;
        let scale = prob.sqrt();
        self.amps.par_iter_mut().enumerate().for_each(|(n, amp)| {
            let mut midx = vec![0; dims.len()];
            n2multiidx_into(n, dims, &mut midx);
            let sub_midx: Vec<usize> = targets.iter().map(|&t| midx[t]).collect();
            if multiidx2n(&sub_midx, &sub_dims) == outcome {
                *amp /= scale;
            } else {
                *amp = ZERO;
            }
        });
        Ok(())
    }

    /// Projects onto `outcome` and removes the measured subsystems, leaving
    /// the renormalised state of the rest.
    pub fn discard(&mut self, targets: &[usize], outcome: usize, prob: f64) -> QResult<()> {
        self.check_targets(targets)?;
        if prob <= MIN_OUTCOME_PROB {
            return Err(QError::DimensionMismatch(format!(
                "cannot collapse onto outcome {} of probability {}",
                outcome, prob
            )));
        }
        let sub_dims: Vec<usize> = targets.iter().map(|&t| self.dims[t]).collect();
        let mut sub_midx = vec![0; targets.len()];
        n2multiidx_into(outcome, &sub_dims, &mut sub_midx);

        let rest: Vec<usize> = (0..self.dims.len()).filter(|k| !targets.contains(k)).collect();
        let rest_dims: Vec<usize> = rest.iter().map(|&k| self.dims[k]).collect();
        let scale = prob.sqrt();
        let mut midx = vec![0; self.dims.len()];
        for (p, &t) in targets.iter().enumerate() {
            midx[t] = sub_midx[p];
        }
        let mut rest_midx = vec![0; rest.len()];
        let amps: Vec<Complex64> = (0..prod_dims(&rest_dims))
            .map(|r| {
                n2multiidx_into(r, &rest_dims, &mut rest_midx);
                for (p, &k) in rest.iter().enumerate() {
                    midx[k] = rest_midx[p];
                }
                self.amps[multiidx2n(&midx, &self.dims)] / scale
            })
            .collect();
        self.dims = rest_dims;
        self.amps = amps;
        Ok(())
    }
}
