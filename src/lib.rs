// Library crate root.
//
// This crate is used both as a binary (src/main.rs) and as a library.

pub mod geom;
pub mod im;

pub mod slice_bitmap;
pub mod bitmap_list;
pub mod flood;
pub mod offset;

pub mod poly;
pub mod trace;
pub mod mpoly;
pub mod hatch;
pub mod cache;

pub mod config;
pub mod desc;
pub mod error;

pub mod gcode;
pub mod extruder;
pub mod purge;
pub mod toolpath;
pub mod producer;

#[cfg(test)]
pub mod test_helpers;
