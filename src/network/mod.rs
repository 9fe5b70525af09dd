pub mod checkpoint;
pub mod model;
pub mod msnet;
pub mod spec;

pub use checkpoint::Checkpoint;
pub use model::Model;
pub use msnet::MsNet;
pub use spec::{ArchArgs, ArchSpec, InputRes, KernelSizes};
