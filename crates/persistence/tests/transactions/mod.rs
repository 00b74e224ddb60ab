//! Atomicity of the versioned-update protocol.
