mod client;
mod endpoint;
mod profiles;
mod scenario;

pub use self::{
    client::ClientConfig,
    endpoint::{EndpointConfig, EndpointKind},
    profiles::ProfileSource,
    scenario::Scenario,
};
