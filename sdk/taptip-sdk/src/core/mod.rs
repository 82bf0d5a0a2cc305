pub mod clock;
pub mod connection;
pub mod constants;
pub mod signer;
pub mod store;
