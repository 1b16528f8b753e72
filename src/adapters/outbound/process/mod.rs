/// Process adapters for external commands
mod command_verifier;

pub use command_verifier::CommandVerifier;
