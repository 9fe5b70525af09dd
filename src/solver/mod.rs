pub mod poisson_network;

pub use poisson_network::PoissonNetwork;
