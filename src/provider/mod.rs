//! The backend-agnostic Hartree–Fock data-provider contract.
//!
//! A [`HartreeFockProvider`] is the only object a downstream many-body solver depends on. All
//! orbital quantities are exposed in the stacked spin-orbital layout described in
//! [`crate::orbitals`], and all two-electron integrals are exposed as antisymmetrised
//! physicist-notation tensors $`\langle pq \Vert rs \rangle`$.

use std::error::Error;
use std::fmt;
use std::ops::Range;

use anyhow;
use ndarray::{s, Array1, Array2, ArrayViewMut1, ArrayViewMut2, ArrayViewMut4};

use crate::operator::OperatorIntegralProvider;
use crate::orbitals::{check_out_shape, OrbitalDescriptor};


/// Error raised for deliberately unimplemented requests, such as nuclear multipoles beyond the
/// dipole.
#[derive(Debug, Clone)]
pub struct NotImplementedError(pub String);

impl fmt::Display for NotImplementedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Not implemented: {}", self.0)
    }
}

impl Error for NotImplementedError {}

/// Trait defining the data a Hartree–Fock reference must provide to a many-body solver.
pub trait HartreeFockProvider {
    // ----------------
    // Required methods
    // ----------------

    /// Returns the identifier of the quantum-chemistry backend.
    fn backend_name(&self) -> &str;

    /// Returns the tolerance to which the SCF quantities can be trusted. This is
    /// $`\max(10 \epsilon_E, \epsilon_g)`$ where $`\epsilon_E`$ is the energy convergence and
    /// $`\epsilon_g`$ the orbital-gradient convergence of the SCF.
    fn convergence_threshold(&self) -> f64;

    /// Returns `true` if the reference is spin-restricted.
    fn is_restricted(&self) -> bool;

    /// Returns the converged SCF energy.
    fn scf_energy(&self) -> f64;

    /// Returns the spin multiplicity of the reference.
    fn spin_multiplicity(&self) -> usize;

    /// Returns the orbital counts of the reference.
    fn descriptor(&self) -> &OrbitalDescriptor;

    /// Returns a nuclear multipole.
    ///
    /// # Arguments
    ///
    /// * `order` - `0` for the total nuclear charge (a vector of length one) and `1` for the
    ///   nuclear dipole (a vector of length three).
    ///
    /// # Errors
    ///
    /// [`NotImplementedError`] for any other order.
    fn nuclear_multipole(&self, order: usize) -> Result<Array1<f64>, anyhow::Error>;

    /// Writes the orbital coefficients into `out`, whose rows are spin-orbitals and whose columns
    /// are atomic-orbital basis functions.
    fn fill_orbital_coefficients(&self, out: ArrayViewMut2<f64>) -> Result<(), anyhow::Error>;

    /// Writes the stacked $`\alpha`$-then-$`\beta`$ orbital occupations into `out`.
    fn fill_occupations(&self, out: ArrayViewMut1<f64>) -> Result<(), anyhow::Error>;

    /// Writes the stacked $`\alpha`$-then-$`\beta`$ orbital energies into `out`.
    fn fill_orbital_energies(&self, out: ArrayViewMut1<f64>) -> Result<(), anyhow::Error>;

    /// Writes a slice of the full antisymmetrised ERI tensor into `out`. The full tensor is built
    /// and kept on first use, which requires memory scaling as $`n_\mathrm{orbs}^4`$. This path
    /// only exists to validate [`Self::fill_eri_antisymmetrized_block`].
    fn fill_eri_full_tensor(
        &mut self,
        ranges: &[Range<usize>; 4],
        out: ArrayViewMut4<f64>,
    ) -> Result<(), anyhow::Error>;

    /// Writes the antisymmetrised ERIs $`\langle pq \Vert rs \rangle`$ for the requested
    /// spin-orbital ranges into `out`, computing only the molecular-orbital integral blocks
    /// these ranges touch.
    fn fill_eri_antisymmetrized_block(
        &mut self,
        ranges: &[Range<usize>; 4],
        out: ArrayViewMut4<f64>,
    ) -> Result<(), anyhow::Error>;

    /// Returns `true` if [`Self::fill_eri_antisymmetrized_block`] is available.
    fn supports_antisymmetrized_eri_blocks(&self) -> bool;

    /// Drops all cached integrals. Safe to call at any time, any number of times.
    fn flush_cache(&mut self);

    /// Returns the provider of one-electron property integrals.
    fn operator_integrals(&mut self) -> &mut dyn OperatorIntegralProvider;

    // ----------------
    // Provided methods
    // ----------------

    /// Returns the number of spatial molecular orbitals per spin channel.
    fn n_orbs_alpha(&self) -> usize {
        self.descriptor().n_orbs_alpha()
    }

    /// Returns the number of atomic-orbital basis functions.
    fn n_basis_functions(&self) -> usize {
        self.descriptor().n_bas()
    }

    /// Writes a block of the Fock matrix into `out`.
    ///
    /// The canonical SCF orbitals diagonalise the Fock matrix, so the full matrix is assembled
    /// from the orbital energies and only the requested block is copied out.
    ///
    /// # Arguments
    ///
    /// * `ranges` - The row and column spin-orbital ranges.
    /// * `out` - The output buffer of shape `(ranges[0].len(), ranges[1].len())`.
    fn fill_fock_block(
        &self,
        ranges: &[Range<usize>; 2],
        mut out: ArrayViewMut2<f64>,
    ) -> Result<(), anyhow::Error> {
        let desc = self.descriptor();
        ranges
            .iter()
            .try_for_each(|range| desc.check_range(range))?;
        check_out_shape(ranges, out.shape())?;
        let mut orben = Array1::<f64>::zeros(desc.n_orbs());
        self.fill_orbital_energies(orben.view_mut())?;
        let fock = Array2::from_diag(&orben);
        out.assign(&fock.slice(s![ranges[0].clone(), ranges[1].clone()]));
        Ok(())
    }
}
