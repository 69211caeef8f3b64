//! Helper items describing the molecular system behind an SCF reference.

pub mod atom;
pub mod molecule;
