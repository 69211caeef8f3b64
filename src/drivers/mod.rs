//! Drivers to carry out `hfprovider` functionalities.

use anyhow;

pub mod eri_consistency;
pub mod provider_summary;

// =================
// Trait definitions
// =================

/// Trait defining behaviours of `hfprovider` drivers.
pub trait HfpDriver {
    /// The type of the parameter structure controlling the driver.
    type Params;

    /// The type of the successful outcome when executing the driver.
    type Outcome;

    /// Executes the driver and stores the result internally.
    fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Returns the result of the driver execution.
    fn result(&self) -> Result<&Self::Outcome, anyhow::Error>;
}
