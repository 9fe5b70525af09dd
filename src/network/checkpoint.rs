use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::error::{HeatNnError, Result};
use crate::network::model::Model;
use crate::network::spec::ArchSpec;

/// Saved network: the architecture it was built from plus its weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub arch: ArchSpec,
    /// Last completed training epoch, 0 for an untrained network
    #[serde(default)]
    pub epoch: usize,
    pub state_dict: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Checkpoint {
    pub fn new(arch: ArchSpec, state_dict: Model) -> Checkpoint {
        Checkpoint { arch, epoch: 0, state_dict, description: None }
    }

    /// Serializes the checkpoint to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .map_err(|e| HeatNnError::io(format!("creating {}", path.display()), e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a checkpoint previously written by `save_json`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Checkpoint> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| HeatNnError::io(format!("opening checkpoint {}", path.display()), e))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            HeatNnError::Checkpoint(format!("{}: {e}", path.display()))
        })
    }
}
