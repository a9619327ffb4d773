//! Bindings of the collaborator traits to real hardware.

pub mod esp32;
