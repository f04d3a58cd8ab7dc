pub mod core;
#[allow(unused_imports)]
pub use core::{Im, MASK_ON, MaskIm};

pub mod roi;
#[allow(unused_imports)]
pub use roi::Roi;

pub mod label;

// Optional extras
// -----------------------------------------------------------------------------

#[cfg(feature = "im-io")]
pub mod io;
