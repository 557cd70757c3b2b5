//! Small filesystem and progress helpers shared by the installer and
//! workspace maintainer. Kept deliberately thin: this is not a general
//! utility grab-bag, just the handful of cross-platform primitives C6/C7
//! need more than once.

pub mod fs;
pub mod progress;
