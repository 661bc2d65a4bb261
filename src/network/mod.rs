pub mod architecture;
pub mod model;
pub mod network;

pub use architecture::{Architecture, BlockPlan, NetType};
pub use model::{Model, Param};
pub use network::Network;
