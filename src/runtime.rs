/*
	CIRCUIT EXECUTION RUNTIME: STATE VECTOR, DIT STORE, ENGINE AND SHOT SAMPLING
*/

pub mod engine;
pub mod quantum_state;
pub mod registers;

pub use engine::{EngineStatus, QEngine};
pub use quantum_state::QuantumState;
pub use registers::DitStore;

use crate::circuit::QCircuit;
use crate::error::QResult;
use crate::random::shot_rng;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Classical register contents (as `c[n-1]..c[0]` bit strings) and how many
/// shots produced each.
pub type ShotHistogram = BTreeMap<String, usize>;

/// Engine for shot number `shot`, on its own stream of the generator seeded
/// with `seed`. A single-shot run uses shot 0.
pub fn shot_engine(circuit: &QCircuit, seed: u64, shot: u64) -> QResult<QEngine<'_>> {
    QEngine::with_rng(circuit, shot_rng(seed, shot))
}

/// Runs shot number `shot` of `circuit` and returns the final classical
/// register contents.
pub fn run_single_shot(circuit: &QCircuit, seed: u64, shot: u64) -> QResult<String> {
    let mut engine = shot_engine(circuit, seed, shot)?;
    engine.execute()?;
    Ok(engine.dit_store().to_bitstring())
}

/// Runs `shots` independent engines over the same circuit in parallel.
pub fn run_shots(circuit: &QCircuit, shots: usize, seed: u64) -> QResult<ShotHistogram> {
    let outcomes: Vec<String> = (0..shots)
        .into_par_iter()
        .map(|shot| run_single_shot(circuit, seed, shot as u64))
        .collect::<QResult<_>>()?;
    Ok(histogram(outcomes))
}

pub fn histogram<I: IntoIterator<Item = String>>(outcomes: I) -> ShotHistogram {
    let mut hist = ShotHistogram::new();
    for outcome in outcomes {
        *hist.entry(outcome).or_insert(0) += 1;
    }
    hist
}
