use crate::error::{QError, QResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Simulation settings, loadable from a JSON file and overridable from the
/// command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Generator seed. Entropy-seeded when absent.
    pub seed: Option<u64>,
    pub shots: usize,
    /// Extra directories searched for `include` files.
    pub include_paths: Vec<PathBuf>,
    /// Amplitudes with a smaller modulus are left out of reports.
    pub amplitude_cutoff: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            seed: None,
            shots: 1,
            include_paths: Vec::new(),
            amplitude_cutoff: 1e-10,
        }
    }
}

impl SimConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> QResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| QError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| QError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })
    }

    /// Applies command-line values on top of this configuration. Flags that
    /// were not given leave the file values in place.
    pub fn merge_cli(mut self, seed: Option<u64>, shots: Option<usize>, include_paths: &[PathBuf]) -> Self {
        if seed.is_some() {
            self.seed = seed;
        }
        if let Some(shots) = shots {
            self.shots = shots.max(1);
        }
        self.include_paths.extend(include_paths.iter().cloned());
        self
    }
}
