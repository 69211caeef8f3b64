//! One-electron property integrals in the atomic-orbital basis.

use anyhow;
use ndarray::Array2;

/// Trait for providers of one-electron operator integrals over atomic-orbital basis functions.
///
/// Integrals follow the electronic sign convention: the electric dipole integrals are
/// $`-\langle \mu | \hat{r}_k | \nu \rangle`$, so that contracting them with a density matrix
/// yields the electronic contribution to the dipole moment directly.
pub trait OperatorIntegralProvider {
    /// Returns the identifier of the quantum-chemistry backend.
    fn backend_name(&self) -> &str;

    /// Returns the $`x`$, $`y`$, and $`z`$ components of the electric dipole integrals. Each
    /// component is a square matrix over the atomic-orbital basis. The integrals are evaluated on
    /// first access and reused afterwards.
    fn electric_dipole(&mut self) -> Result<&[Array2<f64>; 3], anyhow::Error>;
}
