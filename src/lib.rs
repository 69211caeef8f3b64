//! # hfprovider: Hartree–Fock reference data for many-body methods
//!
//! `hfprovider` adapts converged self-consistent-field (SCF) results of quantum-chemistry
//! backends into a single data-provider contract consumed by many-body electronic-structure
//! solvers such as those based on the algebraic-diagrammatic construction (ADC). The contract
//! exposes:
//! - orbital energies, coefficients, and occupations in a stacked spin-orbital layout,
//! - blocks of the (diagonal) Fock matrix,
//! - nuclear multipoles,
//! - antisymmetrised two-electron repulsion integrals $`\langle pq \Vert rs \rangle`$ built from
//!   cached molecular-orbital blocks, and
//! - one-electron electric dipole integrals.
//!
//! ## Layout
//!
//! - [`orbitals`]: orbital counts and the spin-orbital index layout.
//! - [`provider`]: the [`provider::HartreeFockProvider`] contract.
//! - [`eri`]: per-block molecular-orbital ERIs and their cache.
//! - [`operator`]: one-electron property integrals.
//! - [`importer`]: validation of SCF references and construction of providers.
//! - [`interfaces`]: the `custom` backend, raw binary loaders, YAML input, and the command line.
//! - [`drivers`]: provider summaries and ERI consistency checks.
//!
//! ## Examples and usage
//!
//! For most items (structs, enums, functions, and traits), their usages are illustrated in test
//! functions.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod auxiliary;
pub mod drivers;
pub mod eri;
pub mod importer;
pub mod interfaces;
pub mod io;
pub mod operator;
pub mod orbitals;
pub mod provider;
