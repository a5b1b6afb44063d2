//! A stack-based virtual machine for scripting a simulated video player,
//! featuring:
//! - a two-pass assembler for a line-oriented assembly dialect
//! - a fetch-decode-execute interpreter with playback sensors

pub mod assembler;
pub mod logging;
pub mod vm;
