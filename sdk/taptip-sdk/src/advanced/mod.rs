pub mod calldata;
pub mod caveats;
pub mod codec;
