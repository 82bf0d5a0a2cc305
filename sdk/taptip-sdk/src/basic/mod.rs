pub mod account;
pub mod authorizer;
pub mod local;
pub mod redeemer;
pub mod revocation;
pub mod session;
