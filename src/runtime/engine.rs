use crate::circuit::{Condition, GateId, Operation, QCircuit, QUBIT_DIM};
use crate::error::{QError, QResult};
use crate::gates;
use crate::linalg::Ket;
use crate::random::{rng_from_seed, sample_outcome};
use crate::runtime::quantum_state::QuantumState;
use crate::runtime::registers::DitStore;
use crate::tensor::n2multiidx;
use log::{debug, info, trace};
use num_complex::Complex64;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::mem;

/// Externally observable engine states. While an operation executes the
/// engine is running, which is never visible from outside a `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Ready,
    Halted,
}

/// Replays a [`QCircuit`] against a state vector and a classical dit store.
///
/// The engine borrows the circuit, so several engines can run the same
/// circuit at once, each with its own state and generator.
pub struct QEngine<'c, R: Rng = ChaCha8Rng> {
    circuit: &'c QCircuit,
    state: QuantumState,
    dits: DitStore,
    // position of every circuit qubit inside `state`, None once destructively measured
    subsys: Vec<Option<usize>>,
    probs: Vec<f64>,
    pc: usize,
    halted: bool,
    rng: R,
}

// the joint state of `nq` qubits must fit in memory addressable by usize
fn check_addressable(nq: usize) -> QResult<()> {
    let bytes = u32::try_from(nq)
        .ok()
        .and_then(|n| QUBIT_DIM.checked_pow(n))
        .and_then(|len| len.checked_mul(mem::size_of::<Complex64>()));
    match bytes {
        Some(b) if b <= isize::MAX as usize => Ok(()),
        _ => Err(QError::DimensionMismatch(format!(
            "a state vector over {} qubits is not addressable",
            nq
        ))),
    }
}

impl<'c> QEngine<'c, ChaCha8Rng> {
    /// Engine with an entropy-seeded generator.
    pub fn new(circuit: &'c QCircuit) -> QResult<Self> {
        Self::with_rng(circuit, rng_from_seed(None))
    }

    /// Engine with a reproducible generator.
    pub fn with_seed(circuit: &'c QCircuit, seed: u64) -> QResult<Self> {
        Self::with_rng(circuit, rng_from_seed(Some(seed)))
    }
}

impl<'c, R: Rng> QEngine<'c, R> {
    pub fn with_rng(circuit: &'c QCircuit, rng: R) -> QResult<Self> {
        circuit.validate()?;
        check_addressable(circuit.nq())?;
        Ok(QEngine {
            circuit,
            state: QuantumState::new(circuit.nq()),
            dits: DitStore::new(circuit.nc()),
            subsys: (0..circuit.nq()).map(Some).collect(),
            probs: Vec::new(),
            pc: 0,
            halted: false,
            rng,
        })
    }

    pub fn circuit(&self) -> &'c QCircuit {
        self.circuit
    }

    /// `Ready` after construction or `reset`, `Halted` once the last
    /// operation has run (or, for an empty circuit, once a step was attempted).
    pub fn status(&self) -> EngineStatus {
        if self.halted {
            EngineStatus::Halted
        } else {
            EngineStatus::Ready
        }
    }

    /// Index of the next operation to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn state(&self) -> &QuantumState {
        &self.state
    }

    pub fn get_psi(&self) -> Ket {
        self.state.to_ket()
    }

    pub fn get_dit(&self, index: usize) -> QResult<usize> {
        self.dits.get(index)
    }

    pub fn get_dits(&self) -> &[usize] {
        self.dits.as_slice()
    }

    pub fn dit_store(&self) -> &DitStore {
        &self.dits
    }

    /// Probability of every measurement outcome observed so far, in program order.
    pub fn get_probs(&self) -> &[f64] {
        &self.probs
    }

    /// Qubits removed from the state by destructive measurements.
    pub fn get_measured(&self) -> Vec<usize> {
        self.subsys
            .iter()
            .enumerate()
            .filter(|(_, pos)| pos.is_none())
            .map(|(q, _)| q)
            .collect()
    }

    pub fn get_non_measured(&self) -> Vec<usize> {
        self.subsys
            .iter()
            .enumerate()
            .filter(|(_, pos)| pos.is_some())
            .map(|(q, _)| q)
            .collect()
    }

    /// Back to `Ready`: |0...0>, zeroed dits, program counter at the start.
    /// The generator keeps its current position.
    pub fn reset(&mut self) {
        self.state = QuantumState::new(self.circuit.nq());
        self.dits.clear();
        self.subsys = (0..self.circuit.nq()).map(Some).collect();
        self.probs.clear();
        self.pc = 0;
        self.halted = false;
    }

    /// Runs every remaining operation.
    pub fn execute(&mut self) -> QResult<()> {
        while self.step()? {}
        info!(
            "executed {} operations on {} qubits, dits {}",
            self.circuit.len(),
            self.circuit.nq(),
            self.dits.to_bitstring()
        );
        Ok(())
    }

    /// Executes the next operation. Returns `false` once halted.
    pub fn step(&mut self) -> QResult<bool> {
        let circuit = self.circuit;
        let op = match circuit.operations().get(self.pc) {
            Some(op) => op,
            None => {
                self.halted = true;
                return Ok(false);
            }
        };
        trace!("pc {}: {:?}", self.pc, op);
        match op {
            Operation::Gate { gate, targets } => self.apply_gate(*gate, targets)?,
            Operation::Conditional {
                gate,
                targets,
                condition,
            } => self.apply_conditional(*gate, targets, condition)?,
            Operation::Measure {
                targets,
                dits,
                destructive,
            } => self.measure(targets, dits, *destructive)?,
            Operation::Reset { targets } => self.reset_qubits(targets)?,
        }
        self.pc += 1;
        self.halted = self.pc == circuit.len();
        Ok(true)
    }

    // current positions of circuit qubits inside the joint state
    fn positions(&self, targets: &[usize]) -> QResult<Vec<usize>> {
        targets
            .iter()
            .map(|&q| match self.subsys.get(q) {
                None => Err(QError::OutOfRange {
                    what: "qubit",
                    index: q,
                    limit: self.subsys.len(),
                }),
                Some(None) => Err(QError::QubitMeasured(q)),
                Some(Some(pos)) => Ok(*pos),
            })
            .collect()
    }

    fn apply_gate(&mut self, gate: GateId, targets: &[usize]) -> QResult<()> {
        let desc = self.circuit.gate(gate).ok_or(QError::OutOfRange {
            what: "gate",
            index: gate.0,
            limit: self.circuit.gates().len(),
        })?;
        let positions = self.positions(targets)?;
        debug!("apply {} on {:?}", desc.name, targets);
        self.state.apply(&desc.matrix, &positions)
    }

    fn apply_conditional(&mut self, gate: GateId, targets: &[usize], condition: &Condition) -> QResult<()> {
        if let Some(&d) = condition.dits.iter().find(|&&d| d >= self.dits.len()) {
            return Err(QError::OutOfRange {
                what: "classical dit",
                index: d,
                limit: self.dits.len(),
            });
        }
        if condition.holds(self.dits.as_slice()) {
            self.apply_gate(gate, targets)
        } else {
            trace!("condition {:?} not met, skipping", condition);
            Ok(())
        }
    }

    // samples a joint outcome on `positions`, returns (outcome, probability)
    fn sample(&mut self, positions: &[usize]) -> QResult<(usize, f64)> {
        let probs = self.state.outcome_probabilities(positions)?;
        let outcome = sample_outcome(&probs, &mut self.rng);
        Ok((outcome, probs[outcome]))
    }

    fn measure(&mut self, targets: &[usize], dits: &[usize], destructive: bool) -> QResult<()> {
        let positions = self.positions(targets)?;
        if let Some(&d) = dits.iter().find(|&&d| d >= self.dits.len()) {
            return Err(QError::OutOfRange {
                what: "classical dit",
                index: d,
                limit: self.dits.len(),
            });
        }
        let (outcome, prob) = self.sample(&positions)?;
        let sub_dims: Vec<usize> = positions.iter().map(|&p| self.state.dims()[p]).collect();
        let digits = n2multiidx(outcome, &sub_dims);
        debug!(
            "measured qubits {:?} -> {:?} (p = {:.6}, destructive = {})",
            targets, digits, prob, destructive
        );

        if destructive {
            self.state.discard(&positions, outcome, prob)?;
            for &q in targets {
                self.subsys[q] = None;
            }
            // surviving subsystems shift down past every removed position
            for pos in self.subsys.iter_mut().flatten() {
                *pos -= positions.iter().filter(|&&p| p < *pos).count();
            }
        } else {
            self.state.collapse(&positions, outcome, prob)?;
        }

        for (&d, &v) in dits.iter().zip(digits.iter()) {
            self.dits.set(d, v)?;
        }
        self.probs.push(prob);
        Ok(())
    }

    fn reset_qubits(&mut self, targets: &[usize]) -> QResult<()> {
        let positions = self.positions(targets)?;
        let (outcome, prob) = self.sample(&positions)?;
        self.state.collapse(&positions, outcome, prob)?;
        let sub_dims: Vec<usize> = positions.iter().map(|&p| self.state.dims()[p]).collect();
        let digits = n2multiidx(outcome, &sub_dims);
        let flip = gates::x();
        for (&pos, &digit) in positions.iter().zip(digits.iter()) {
            if digit != 0 {
                self.state.apply(&flip, &[pos])?;
            }
        }
        debug!("reset qubits {:?}", targets);
        Ok(())
    }
}
