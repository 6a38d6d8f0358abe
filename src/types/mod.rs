pub mod billing;
pub mod payloads;
