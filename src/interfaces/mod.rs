//! Interfaces between `hfprovider` and the outside world.

use anyhow;

pub mod binaries;
pub mod cli;
pub mod custom;
pub mod input;

/// Trait for handling an input specification.
pub trait InputHandle {
    /// Handles the input specification and runs the appropriate drivers.
    fn handle(&self) -> Result<(), anyhow::Error>;
}
