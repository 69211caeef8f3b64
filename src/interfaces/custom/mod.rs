//! The `custom` backend: Hartree–Fock providers over SCF results held entirely in memory.
//!
//! An SCF result of this backend carries everything a provider needs up front: the orbital
//! coefficients and energies, the atomic-orbital two-electron integrals in chemist notation, and
//! the atomic-orbital electric dipole integrals. Such results are produced by the loaders in
//! [`crate::interfaces::binaries`] or deserialised from archives of type
//! [`crate::io::HfpFileType::Scf`].

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use anyhow::{self, ensure};
use derive_builder::Builder;
use ndarray::{arr1, s, Array1, Array2, Array3, Array4, ArrayView2, ArrayViewMut1, ArrayViewMut2, ArrayViewMut4, Axis};
use serde::{Deserialize, Serialize};

use crate::auxiliary::molecule::Molecule;
use crate::eri::{transform_ao_eri, EriBackend, EriBuilder};
use crate::importer::{validate_reference, ScfReference, ScfType, WavefunctionKind};
use crate::io::format::write_subtitle;
use crate::operator::OperatorIntegralProvider;
use crate::orbitals::{check_out_shape, OrbitalDescriptor, OrbitalSpace, Spin};
use crate::provider::{HartreeFockProvider, NotImplementedError};


#[cfg(test)]
#[path = "custom_fixtures.rs"]
pub(crate) mod custom_fixtures;

const BACKEND_NAME: &str = "custom";

// ==================
// Struct definitions
// ==================

// -----------
// SCF options
// -----------

fn default_convergence() -> f64 {
    1e-6
}

/// Structure containing the SCF settings a provider needs to know about.
#[derive(Clone, Builder, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScfOptions {
    /// The treatment of two-electron integrals during the SCF.
    #[builder(default = "ScfType::Pk")]
    #[serde(default)]
    pub scf_type: ScfType,

    /// The energy convergence criterion of the SCF.
    #[builder(default = "1e-6")]
    #[serde(default = "default_convergence")]
    pub energy_convergence: f64,

    /// The orbital-gradient (density) convergence criterion of the SCF.
    #[builder(default = "1e-6")]
    #[serde(default = "default_convergence")]
    pub orbital_gradient_convergence: f64,
}

impl ScfOptions {
    /// Returns a builder to construct a [`ScfOptions`] structure.
    pub fn builder() -> ScfOptionsBuilder {
        ScfOptionsBuilder::default()
    }

    /// Returns $`\max(10 \epsilon_E, \epsilon_g)`$, the tolerance to which the SCF quantities
    /// can be trusted.
    pub fn convergence_threshold(&self) -> f64 {
        (10.0 * self.energy_convergence).max(self.orbital_gradient_convergence)
    }
}

impl Default for ScfOptions {
    fn default() -> Self {
        ScfOptions {
            scf_type: ScfType::default(),
            energy_convergence: default_convergence(),
            orbital_gradient_convergence: default_convergence(),
        }
    }
}

impl fmt::Display for ScfOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_subtitle(f, "SCF options")?;
        writeln!(f, "SCF type: {}", self.scf_type)?;
        writeln!(f, "Energy convergence: {:.3e}", self.energy_convergence)?;
        writeln!(
            f,
            "Orbital-gradient convergence: {:.3e}",
            self.orbital_gradient_convergence
        )?;
        Ok(())
    }
}

// ----------
// SCF result
// ----------

/// Structure containing a converged SCF result with spatial orbitals shared by both spin
/// channels.
#[derive(Clone, Builder, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CustomScfResult {
    /// The kind of the SCF wavefunction.
    #[builder(default = "WavefunctionKind::Rhf")]
    pub wavefunction_kind: WavefunctionKind,

    /// The number of irreducible representations the orbitals were classified by.
    #[builder(default = "1")]
    pub n_irreps: usize,

    /// The SCF settings.
    #[builder(default)]
    pub options: ScfOptions,

    /// The molecule, with coordinates in bohr, its charge, and its spin multiplicity.
    pub molecule: Molecule,

    /// The converged SCF energy.
    pub energy: f64,

    /// The number of occupied $`\alpha`$ orbitals.
    pub n_alpha: usize,

    /// The number of occupied $`\beta`$ orbitals.
    pub n_beta: usize,

    /// The molecular-orbital coefficients with basis functions along the rows, of shape
    /// `(n_bas, n_mo)`.
    pub coefficients: Array2<f64>,

    /// The orbital energies, of length `n_mo`.
    pub orbital_energies: Array1<f64>,

    /// Optional occupation numbers of the spatial orbitals in one spin channel, shared by both
    /// channels. If `None`, the lowest `n_alpha` orbitals are singly occupied.
    #[builder(default = "None")]
    pub occupations: Option<Array1<f64>>,

    /// The atomic-orbital two-electron integrals $`(\mu\nu|\lambda\sigma)`$ in chemist
    /// notation, of shape `(n_bas, n_bas, n_bas, n_bas)`.
    pub ao_eri: Array4<f64>,

    /// The atomic-orbital position integrals $`\langle \mu | \hat{r}_k | \nu \rangle`$ stacked
    /// along the first axis, of shape `(3, n_bas, n_bas)`.
    pub ao_dipole: Array3<f64>,
}

impl CustomScfResultBuilder {
    fn validate(&self) -> Result<(), String> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or("No coefficients found.".to_string())?;
        let (n_bas, n_mo) = coefficients.dim();
        let orbital_energies = self
            .orbital_energies
            .as_ref()
            .ok_or("No orbital energies found.".to_string())?;
        if orbital_energies.len() != n_mo {
            return Err(format!(
                "{} orbital energies found for {n_mo} molecular orbitals.",
                orbital_energies.len()
            ));
        }
        let n_alpha = self.n_alpha.ok_or("No alpha electron count found.".to_string())?;
        let n_beta = self.n_beta.ok_or("No beta electron count found.".to_string())?;
        if n_beta > n_alpha || n_alpha > n_mo {
            return Err(format!(
                "Electron counts (n_alpha = {n_alpha}, n_beta = {n_beta}) are inconsistent with {n_mo} molecular orbitals."
            ));
        }
        if let Some(Some(occupations)) = self.occupations.as_ref() {
            if occupations.len() != n_mo {
                return Err(format!(
                    "{} occupation numbers found for {n_mo} molecular orbitals.",
                    occupations.len()
                ));
            }
        }
        let ao_eri = self
            .ao_eri
            .as_ref()
            .ok_or("No atomic-orbital ERIs found.".to_string())?;
        if ao_eri.shape() != [n_bas; 4] {
            return Err(format!(
                "Atomic-orbital ERIs of shape {:?} are inconsistent with {n_bas} basis functions.",
                ao_eri.shape()
            ));
        }
        let ao_dipole = self
            .ao_dipole
            .as_ref()
            .ok_or("No atomic-orbital dipole integrals found.".to_string())?;
        if ao_dipole.shape() != [3, n_bas, n_bas] {
            return Err(format!(
                "Atomic-orbital dipole integrals of shape {:?} are inconsistent with {n_bas} basis functions.",
                ao_dipole.shape()
            ));
        }
        Ok(())
    }
}

impl CustomScfResult {
    /// Returns a builder to construct a [`CustomScfResult`] structure.
    pub fn builder() -> CustomScfResultBuilder {
        CustomScfResultBuilder::default()
    }

    /// Returns the number of atomic-orbital basis functions.
    pub fn n_bas(&self) -> usize {
        self.coefficients.nrows()
    }

    /// Returns the number of spatial molecular orbitals.
    pub fn n_mo(&self) -> usize {
        self.coefficients.ncols()
    }

    /// Returns the occupation numbers of the spatial orbitals, which both spin channels share.
    fn spatial_occupations(&self) -> Array1<f64> {
        self.occupations.clone().unwrap_or_else(|| {
            Array1::from_shape_fn(self.n_mo(), |i| if i < self.n_alpha { 1.0 } else { 0.0 })
        })
    }
}

impl ScfReference for CustomScfResult {
    fn wavefunction_kind(&self) -> &WavefunctionKind {
        &self.wavefunction_kind
    }

    fn scf_type(&self) -> ScfType {
        self.options.scf_type
    }

    fn n_irreps(&self) -> usize {
        self.n_irreps
    }

    fn n_alpha(&self) -> usize {
        self.n_alpha
    }

    fn n_beta(&self) -> usize {
        self.n_beta
    }
}

// -----------
// ERI backend
// -----------

/// The ERI backend over an in-memory SCF result.
pub struct CustomEriBackend {
    scf: Rc<CustomScfResult>,
    descriptor: OrbitalDescriptor,
}

impl EriBackend for CustomEriBackend {
    fn descriptor(&self) -> &OrbitalDescriptor {
        &self.descriptor
    }

    fn is_restricted(&self) -> bool {
        true
    }

    fn coefficients(
        &self,
        spin: Spin,
        space: OrbitalSpace,
    ) -> Result<ArrayView2<f64>, anyhow::Error> {
        let range = self.descriptor.spatial_range(spin, space);
        Ok(self.scf.coefficients.slice(s![.., range]))
    }

    fn mo_eri(&self, coefficients: [ArrayView2<f64>; 4]) -> Result<Array4<f64>, anyhow::Error> {
        transform_ao_eri(&self.scf.ao_eri.view(), coefficients)
    }
}

// -------------------------
// Operator integral provider
// -------------------------

/// The one-electron operator integral provider over an in-memory SCF result.
pub struct CustomOperatorIntegralProvider {
    scf: Rc<CustomScfResult>,
    electric_dipole: Option<[Array2<f64>; 3]>,
}

impl CustomOperatorIntegralProvider {
    fn new(scf: Rc<CustomScfResult>) -> Self {
        Self {
            scf,
            electric_dipole: None,
        }
    }
}

impl OperatorIntegralProvider for CustomOperatorIntegralProvider {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn electric_dipole(&mut self) -> Result<&[Array2<f64>; 3], anyhow::Error> {
        let scf = &self.scf;
        Ok(self.electric_dipole.get_or_insert_with(|| {
            log::debug!("Computing electric dipole integrals.");
            [0, 1, 2].map(|k| -&scf.ao_dipole.index_axis(Axis(0), k))
        }))
    }
}

// --------
// Provider
// --------

/// The Hartree–Fock provider over an in-memory restricted SCF result.
pub struct CustomHfProvider {
    /// The SCF result, shared with the ERI backend and the operator integral provider.
    scf: Rc<CustomScfResult>,

    /// The SCF settings at the time of construction.
    options: ScfOptions,

    eri_builder: EriBuilder<CustomEriBackend>,

    operator_integral_provider: CustomOperatorIntegralProvider,

    /// The full antisymmetrised ERI tensor, built on first request.
    eri_full: Option<Array4<f64>>,
}

impl CustomHfProvider {
    /// Constructs a provider from an SCF result.
    ///
    /// # Errors
    ///
    /// [`crate::importer::UnsupportedReferenceError`] if the SCF result is not a restricted
    /// Hartree–Fock result without density fitting and point-group symmetry.
    pub fn new(scf: CustomScfResult) -> Result<Self, anyhow::Error> {
        validate_reference(&scf)?;
        let descriptor = OrbitalDescriptor::new(scf.n_mo(), scf.n_alpha, scf.n_beta, scf.n_bas())?;
        let options = scf.options.clone();
        let scf = Rc::new(scf);
        Ok(Self {
            eri_builder: EriBuilder::new(CustomEriBackend {
                scf: Rc::clone(&scf),
                descriptor,
            }),
            operator_integral_provider: CustomOperatorIntegralProvider::new(Rc::clone(&scf)),
            scf,
            options,
            eri_full: None,
        })
    }

    /// Returns the ERI builder.
    pub fn eri_builder(&self) -> &EriBuilder<CustomEriBackend> {
        &self.eri_builder
    }

    /// Returns `true` if the full antisymmetrised ERI tensor is currently held.
    pub fn holds_full_eri_tensor(&self) -> bool {
        self.eri_full.is_some()
    }

    /// Returns the molecule.
    pub fn molecule(&self) -> &Molecule {
        &self.scf.molecule
    }
}

impl HartreeFockProvider for CustomHfProvider {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn convergence_threshold(&self) -> f64 {
        self.options.convergence_threshold()
    }

    fn is_restricted(&self) -> bool {
        true
    }

    fn scf_energy(&self) -> f64 {
        self.scf.energy
    }

    fn spin_multiplicity(&self) -> usize {
        self.scf.molecule.multiplicity
    }

    fn descriptor(&self) -> &OrbitalDescriptor {
        self.eri_builder.descriptor()
    }

    fn nuclear_multipole(&self, order: usize) -> Result<Array1<f64>, anyhow::Error> {
        match order {
            0 => Ok(arr1(&[self.scf.molecule.nuclear_charge()])),
            1 => Ok(Array1::from_iter(
                self.scf.molecule.nuclear_dipole().iter().copied(),
            )),
            _ => Err(NotImplementedError(format!(
                "nuclear multipoles of order {order} are not available; only orders 0 and 1 are"
            ))
            .into()),
        }
    }

    fn fill_orbital_coefficients(&self, mut out: ArrayViewMut2<f64>) -> Result<(), anyhow::Error> {
        let desc = self.descriptor();
        let n_orbs_alpha = desc.n_orbs_alpha();
        check_out_shape(&[0..desc.n_orbs(), 0..desc.n_bas()], out.shape())?;
        let c_t = self.scf.coefficients.t();
        out.slice_mut(s![..n_orbs_alpha, ..]).assign(&c_t);
        out.slice_mut(s![n_orbs_alpha.., ..]).assign(&c_t);
        Ok(())
    }

    fn fill_occupations(&self, mut out: ArrayViewMut1<f64>) -> Result<(), anyhow::Error> {
        let desc = self.descriptor();
        let n_orbs_alpha = desc.n_orbs_alpha();
        check_out_shape(&[0..desc.n_orbs()], out.shape())?;
        let occupations = self.scf.spatial_occupations();
        out.slice_mut(s![..n_orbs_alpha]).assign(&occupations);
        out.slice_mut(s![n_orbs_alpha..]).assign(&occupations);
        Ok(())
    }

    fn fill_orbital_energies(&self, mut out: ArrayViewMut1<f64>) -> Result<(), anyhow::Error> {
        let desc = self.descriptor();
        let n_orbs_alpha = desc.n_orbs_alpha();
        check_out_shape(&[0..desc.n_orbs()], out.shape())?;
        out.slice_mut(s![..n_orbs_alpha])
            .assign(&self.scf.orbital_energies);
        out.slice_mut(s![n_orbs_alpha..])
            .assign(&self.scf.orbital_energies);
        Ok(())
    }

    fn fill_eri_full_tensor(
        &mut self,
        ranges: &[Range<usize>; 4],
        mut out: ArrayViewMut4<f64>,
    ) -> Result<(), anyhow::Error> {
        let desc = *self.descriptor();
        ranges
            .iter()
            .try_for_each(|range| desc.check_range(range))?;
        check_out_shape(ranges, out.shape())?;
        if self.eri_full.is_none() {
            self.eri_full = Some(self.eri_builder.build_full_eri_tensor()?);
        }
        let eri_full = self
            .eri_full
            .as_ref()
            .ok_or_else(|| anyhow::format_err!("The full ERI tensor is unavailable."))?;
        out.assign(&eri_full.slice(s![
            ranges[0].clone(),
            ranges[1].clone(),
            ranges[2].clone(),
            ranges[3].clone()
        ]));
        Ok(())
    }

    fn fill_eri_antisymmetrized_block(
        &mut self,
        ranges: &[Range<usize>; 4],
        out: ArrayViewMut4<f64>,
    ) -> Result<(), anyhow::Error> {
        self.eri_builder.fill_slice(ranges, out)
    }

    fn supports_antisymmetrized_eri_blocks(&self) -> bool {
        true
    }

    fn flush_cache(&mut self) {
        self.eri_full = None;
        self.eri_builder.flush();
    }

    fn operator_integrals(&mut self) -> &mut dyn OperatorIntegralProvider {
        &mut self.operator_integral_provider
    }
}

impl fmt::Display for CustomScfResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_subtitle(f, "Custom SCF result")?;
        writeln!(f, "Wavefunction: {}", self.wavefunction_kind)?;
        writeln!(f, "Energy: {:.10}", self.energy)?;
        writeln!(f, "Basis functions: {}", self.n_bas())?;
        writeln!(f, "Molecular orbitals: {}", self.n_mo())?;
        writeln!(f, "Occupied orbitals: {} alpha, {} beta", self.n_alpha, self.n_beta)?;
        writeln!(f)?;
        write!(f, "{}", self.options)?;
        Ok(())
    }
}

impl fmt::Debug for CustomScfResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Checks that an SCF result can back a provider and returns the electron count it implies.
pub(crate) fn check_electron_count(scf: &CustomScfResult) -> Result<usize, anyhow::Error> {
    let n_electrons = scf.molecule.n_electrons()?;
    ensure!(
        scf.n_alpha + scf.n_beta == n_electrons,
        "The occupied orbital counts (n_alpha = {}, n_beta = {}) do not account for the {n_electrons} electron(s) of the molecule.",
        scf.n_alpha,
        scf.n_beta
    );
    Ok(n_electrons)
}
