//! Circuit intermediate representation.
//!
//! A [`QCircuit`] owns the declared resources (qubits and classical dits), an
//! arena of gate descriptions addressed by [`GateId`], and the ordered list of
//! operations. Every append is validated against the resources declared so
//! far, so the circuit never holds a dangling reference.

use crate::error::{QError, QResult, SymbolKind};
use crate::linalg::CMat;
use crate::tensor::{check_square, check_subsys_match_dims, log_dim};
use std::collections::HashMap;

/// Local dimension of every subsystem.
pub const QUBIT_DIM: usize = 2;

/// Stable handle into the gate arena of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(pub usize);

#[derive(Debug, Clone)]
pub struct GateDescription {
    pub name: String,
    pub matrix: CMat,
    pub arity: usize,
}

/// Classical condition: the dits, read as an unsigned integer with the first
/// dit least significant, must equal `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub dits: Vec<usize>,
    pub value: usize,
}

impl Condition {
    pub fn single(dit: usize, value: usize) -> Self {
        Condition {
            dits: vec![dit],
            value,
        }
    }

    /// Dit `i` of the register must equal bit `i` of `value`. Bits past the
    /// width of `usize` are zero, and a `value` wider than the register never
    /// matches.
    pub fn holds(&self, store: &[usize]) -> bool {
        let fits = u32::try_from(self.dits.len())
            .ok()
            .and_then(|w| self.value.checked_shr(w))
            .map_or(true, |rest| rest == 0);
        fits && self.dits.iter().enumerate().all(|(i, &d)| {
            let bit = if i < usize::BITS as usize {
                (self.value >> i) & 1
            } else {
                0
            };
            store[d] == bit
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Gate {
        gate: GateId,
        targets: Vec<usize>,
    },
    Measure {
        targets: Vec<usize>,
        dits: Vec<usize>,
        destructive: bool,
    },
    Reset {
        targets: Vec<usize>,
    },
    Conditional {
        gate: GateId,
        targets: Vec<usize>,
        condition: Condition,
    },
}

#[derive(Debug, Clone, Default)]
pub struct QCircuit {
    nq: usize,
    nc: usize,
    name: Option<String>,
    gates: Vec<GateDescription>,
    gate_names: HashMap<String, GateId>,
    ops: Vec<Operation>,
}

impl QCircuit {
    pub fn new(nq: usize, nc: usize) -> Self {
        QCircuit {
            nq,
            nc,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn nc(&self) -> usize {
        self.nc
    }

    pub fn add_qubits(&mut self, n: usize) {
        self.nq += n;
    }

    pub fn add_classical_registers(&mut self, n: usize) {
        self.nc += n;
    }

    /// Registers a new named gate. Fails if the name is taken or the matrix is
    /// not a square operator on a whole number of qubits.
    pub fn define_gate(&mut self, name: &str, matrix: CMat) -> QResult<GateId> {
        if self.gate_names.contains_key(name) {
            return Err(QError::Redefined {
                symbol: name.to_string(),
            });
        }
        let (rows, cols) = matrix.dim();
        let arity = match log_dim(rows, QUBIT_DIM) {
            Some(k) if k > 0 && check_square(rows, cols) => k,
            _ => {
                return Err(QError::DimensionMismatch(format!(
                    "gate '{}' has a {}x{} matrix, expected a square power of {}",
                    name, rows, cols, QUBIT_DIM
                )))
            }
        };
        let id = GateId(self.gates.len());
        self.gates.push(GateDescription {
            name: name.to_string(),
            matrix,
            arity,
        });
        self.gate_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Like [`define_gate`](Self::define_gate) but returns the existing handle
    /// when `label` is already in the arena.
    pub fn intern_gate(&mut self, label: &str, matrix: CMat) -> QResult<GateId> {
        match self.gate_names.get(label) {
            Some(&id) => Ok(id),
            None => self.define_gate(label, matrix),
        }
    }

    pub fn gate(&self, id: GateId) -> Option<&GateDescription> {
        self.gates.get(id.0)
    }

    pub fn find_gate(&self, name: &str) -> Option<GateId> {
        self.gate_names.get(name).copied()
    }

    pub fn gates(&self) -> &[GateDescription] {
        &self.gates
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of gate applications, conditional ones included.
    pub fn gate_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Operation::Gate { .. } | Operation::Conditional { .. }))
            .count()
    }

    pub fn measurement_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Operation::Measure { .. }))
            .count()
    }

    pub fn append_gate(&mut self, gate: GateId, targets: Vec<usize>) -> QResult<()> {
        let op = Operation::Gate { gate, targets };
        self.check_operation(&op)?;
        self.ops.push(op);
        Ok(())
    }

    pub fn append_measurement(
        &mut self,
        targets: Vec<usize>,
        dits: Vec<usize>,
        destructive: bool,
    ) -> QResult<()> {
        let op = Operation::Measure {
            targets,
            dits,
            destructive,
        };
        self.check_operation(&op)?;
        self.ops.push(op);
        Ok(())
    }

    pub fn append_reset(&mut self, targets: Vec<usize>) -> QResult<()> {
        let op = Operation::Reset { targets };
        self.check_operation(&op)?;
        self.ops.push(op);
        Ok(())
    }

    pub fn append_conditional(
        &mut self,
        gate: GateId,
        targets: Vec<usize>,
        condition: Condition,
    ) -> QResult<()> {
        let op = Operation::Conditional {
            gate,
            targets,
            condition,
        };
        self.check_operation(&op)?;
        self.ops.push(op);
        Ok(())
    }

    /// Re-checks every operation against the declared resources.
    pub fn validate(&self) -> QResult<()> {
        self.ops.iter().try_for_each(|op| self.check_operation(op))
    }

    fn check_operation(&self, op: &Operation) -> QResult<()> {
        match op {
            Operation::Gate { gate, targets } => self.check_gate(*gate, targets),
            Operation::Conditional {
                gate,
                targets,
                condition,
            } => {
                self.check_gate(*gate, targets)?;
                if condition.dits.is_empty() {
                    return Err(QError::InvalidTargets("condition reads no dits".into()));
                }
                self.check_dits(&condition.dits)
            }
            Operation::Measure { targets, dits, .. } => {
                self.check_qubits(targets)?;
                if dits.len() != targets.len() {
                    return Err(QError::InvalidTargets(format!(
                        "{} measured qubits but {} destination dits",
                        targets.len(),
                        dits.len()
                    )));
                }
                self.check_dits(dits)
            }
            Operation::Reset { targets } => self.check_qubits(targets),
        }
    }

    fn check_gate(&self, gate: GateId, targets: &[usize]) -> QResult<()> {
        let desc = self
            .gate(gate)
            .ok_or_else(|| QError::undeclared(SymbolKind::Gate, format!("#{}", gate.0), None))?;
        if desc.arity != targets.len() {
            return Err(QError::InvalidTargets(format!(
                "gate '{}' acts on {} qubits, got {}",
                desc.name,
                desc.arity,
                targets.len()
            )));
        }
        self.check_qubits(targets)
    }

    fn check_qubits(&self, targets: &[usize]) -> QResult<()> {
        if targets.is_empty() {
            return Err(QError::InvalidTargets("empty target list".into()));
        }
        if let Some(&q) = targets.iter().find(|&&q| q >= self.nq) {
            return Err(QError::undeclared(SymbolKind::Qubit, q.to_string(), None));
        }
        if !check_subsys_match_dims(targets, &vec![QUBIT_DIM; self.nq]) {
            return Err(QError::InvalidTargets(format!("repeated qubit in {:?}", targets)));
        }
        Ok(())
    }

    fn check_dits(&self, dits: &[usize]) -> QResult<()> {
        if let Some(&d) = dits.iter().find(|&&d| d >= self.nc) {
            return Err(QError::undeclared(SymbolKind::Dit, d.to_string(), None));
        }
        Ok(())
    }
}
