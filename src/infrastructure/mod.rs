pub mod location;
pub mod logging;
pub mod transport;
