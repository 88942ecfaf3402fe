pub mod gateway;

pub use gateway::RestGateway;
