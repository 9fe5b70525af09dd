use serde::{Serialize, Deserialize};

use crate::config::ArchKind;
use crate::error::Result;
use crate::math::Grid;
use crate::network::msnet::MsNet;
use crate::network::spec::ArchSpec;

/// A network instance of one of the known architecture families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Model {
    #[serde(rename = "MSNet")]
    MsNet(MsNet),
}

impl Model {
    pub fn new(spec: &ArchSpec) -> Result<Model> {
        match spec.kind {
            ArchKind::MsNet => Ok(Model::MsNet(MsNet::new(&spec.args)?)),
        }
    }

    pub fn kind(&self) -> ArchKind {
        match self {
            Model::MsNet(_) => ArchKind::MsNet,
        }
    }

    /// Maps a normalised rhs to a normalised potential of the same shape.
    pub fn forward(&self, input: &Grid) -> Result<Grid> {
        match self {
            Model::MsNet(net) => net.forward(input),
        }
    }

    /// `(rows, cols)` the network was trained on.
    pub fn input_res(&self) -> (usize, usize) {
        match self {
            Model::MsNet(net) => net.input_res,
        }
    }

    pub fn n_scales(&self) -> usize {
        match self {
            Model::MsNet(net) => net.n_scales(),
        }
    }

    pub fn depths(&self) -> Vec<usize> {
        match self {
            Model::MsNet(net) => net.depths(),
        }
    }

    pub fn kernel_sizes(&self) -> Vec<usize> {
        match self {
            Model::MsNet(net) => net.kernel_sizes.clone(),
        }
    }

    pub fn rf_global_x(&self) -> usize {
        match self {
            Model::MsNet(net) => net.rf_global_x(),
        }
    }

    pub fn rf_global_y(&self) -> usize {
        match self {
            Model::MsNet(net) => net.rf_global_y(),
        }
    }

    /// Replaces the weights with those of `state` after checking the layout.
    pub fn load_state_dict(&mut self, state: Model) -> Result<()> {
        match (self, state) {
            (Model::MsNet(net), Model::MsNet(trained)) => net.load_state(trained),
        }
    }
}
