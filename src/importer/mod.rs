//! Validation of SCF references and construction of Hartree–Fock providers from them.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use anyhow::{self, Context};
use log;
use serde::{Deserialize, Serialize};

use crate::interfaces::binaries::BinariesScfSource;
use crate::interfaces::custom::{CustomHfProvider, CustomScfResult};
use crate::io::{read_hfp_binary, HfpFileType};
use crate::provider::HartreeFockProvider;


// ==================
// Error definitions
// ==================

/// Error raised when an SCF reference violates the assumptions of the providers.
#[derive(Debug, Clone)]
pub struct UnsupportedReferenceError(pub String);

impl fmt::Display for UnsupportedReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unsupported SCF reference: {}", self.0)
    }
}

impl Error for UnsupportedReferenceError {}

// ================
// Enum definitions
// ================

/// An enumerated type for the kinds of SCF wavefunctions a backend may report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavefunctionKind {
    /// Restricted Hartree–Fock.
    Rhf,

    /// Unrestricted Hartree–Fock.
    Uhf,

    /// Restricted open-shell Hartree–Fock.
    Rohf,

    /// Constrained unrestricted Hartree–Fock.
    Cuhf,

    /// Any other wavefunction, such as a Kohn–Sham one, identified by its backend label.
    Other(String),
}

impl WavefunctionKind {
    /// Returns `true` if this is a Hartree–Fock-class wavefunction.
    pub fn is_hartree_fock(&self) -> bool {
        !matches!(self, WavefunctionKind::Other(_))
    }
}

impl fmt::Display for WavefunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WavefunctionKind::Rhf => write!(f, "RHF"),
            WavefunctionKind::Uhf => write!(f, "UHF"),
            WavefunctionKind::Rohf => write!(f, "ROHF"),
            WavefunctionKind::Cuhf => write!(f, "CUHF"),
            WavefunctionKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// An enumerated type for the way an SCF treats its two-electron integrals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScfType {
    /// Conventional integrals built into supermatrices.
    #[default]
    Pk,

    /// Integrals recomputed on the fly.
    Direct,

    /// Conventional integrals stored on disk.
    OutOfCore,

    /// Density fitting, with the storage resolved by the backend at run time.
    Df,

    /// Density fitting with in-memory storage.
    MemDf,

    /// Density fitting with disk storage.
    DiskDf,

    /// Cholesky decomposition.
    Cd,
}

impl ScfType {
    /// Returns `true` if the SCF was converged with exact four-index integrals, so that its
    /// orbitals are consistent with exact molecular-orbital ERIs.
    pub fn is_exact(&self) -> bool {
        matches!(self, ScfType::Pk | ScfType::Direct | ScfType::OutOfCore)
    }
}

impl fmt::Display for ScfType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScfType::Pk => write!(f, "PK"),
            ScfType::Direct => write!(f, "DIRECT"),
            ScfType::OutOfCore => write!(f, "OUT_OF_CORE"),
            ScfType::Df => write!(f, "DF"),
            ScfType::MemDf => write!(f, "MEM_DF"),
            ScfType::DiskDf => write!(f, "DISK_DF"),
            ScfType::Cd => write!(f, "CD"),
        }
    }
}

/// An enumerated type for the places an SCF result can be imported from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ScfSource {
    /// A binary archive of type [`HfpFileType::Scf`]. The path is given without its `.hfp.scf`
    /// extension.
    Archive(PathBuf),

    /// A set of raw numeric binary files.
    Binaries(BinariesScfSource),
}

impl Default for ScfSource {
    fn default() -> Self {
        ScfSource::Binaries(BinariesScfSource::default())
    }
}

// =================
// Trait definitions
// =================

/// Trait for SCF results whose metadata can be checked by [`validate_reference`].
pub trait ScfReference {
    /// Returns the kind of the SCF wavefunction.
    fn wavefunction_kind(&self) -> &WavefunctionKind;

    /// Returns the integral treatment of the SCF.
    fn scf_type(&self) -> ScfType;

    /// Returns the number of irreducible representations the SCF orbitals were classified by.
    fn n_irreps(&self) -> usize;

    /// Returns the number of occupied $`\alpha`$ orbitals.
    fn n_alpha(&self) -> usize;

    /// Returns the number of occupied $`\beta`$ orbitals.
    fn n_beta(&self) -> usize;
}

/// Trait for validated SCF results that can be turned into a provider.
pub trait ImportScf: ScfReference + Sized {
    /// The provider constructed by the import.
    type Provider: HartreeFockProvider;

    /// Validates `self` and constructs a provider from it.
    ///
    /// # Errors
    ///
    /// [`UnsupportedReferenceError`] if any of the checks of [`validate_reference`] fails.
    fn import_scf(self) -> Result<Self::Provider, anyhow::Error>;
}

impl ImportScf for CustomScfResult {
    type Provider = CustomHfProvider;

    fn import_scf(self) -> Result<Self::Provider, anyhow::Error> {
        let provider = CustomHfProvider::new(self)?;
        log::info!(
            "Imported a {} reference from the `{}` backend: E(SCF) = {:.10}, {}.",
            WavefunctionKind::Rhf,
            provider.backend_name(),
            provider.scf_energy(),
            provider.descriptor()
        );
        Ok(provider)
    }
}

// ==============
// Free functions
// ==============

/// Checks that an SCF reference satisfies the assumptions of the providers. The checks run in a
/// fixed order and the first failure is reported.
///
/// 1. The wavefunction must be of Hartree–Fock class.
/// 2. The wavefunction must be restricted and closed-shell.
/// 3. The SCF must not have used density fitting or Cholesky decomposition.
/// 4. The SCF must not have used point-group symmetry.
///
/// # Errors
///
/// [`UnsupportedReferenceError`] describing the first failed check.
pub fn validate_reference<R: ScfReference + ?Sized>(reference: &R) -> Result<(), anyhow::Error> {
    let kind = reference.wavefunction_kind();
    if !kind.is_hartree_fock() {
        return Err(UnsupportedReferenceError(format!(
            "unsupported reference kind `{kind}`; only Hartree-Fock references can be imported"
        ))
        .into());
    }
    if *kind != WavefunctionKind::Rhf {
        return Err(UnsupportedReferenceError(format!(
            "only restricted references are supported, got `{kind}`"
        ))
        .into());
    }
    let (n_alpha, n_beta) = (reference.n_alpha(), reference.n_beta());
    if n_alpha != n_beta {
        return Err(UnsupportedReferenceError(format!(
            "only restricted references are supported, but the `{kind}` reference is open-shell (n_alpha = {n_alpha}, n_beta = {n_beta})"
        ))
        .into());
    }
    let scf_type = reference.scf_type();
    if !scf_type.is_exact() {
        return Err(UnsupportedReferenceError(format!(
            "unsupported SCF integral mode `{scf_type}`; density-fitted and Cholesky-decomposed SCF results cannot be imported"
        ))
        .into());
    }
    let n_irreps = reference.n_irreps();
    if n_irreps != 1 {
        return Err(UnsupportedReferenceError(format!(
            "symmetry not supported; the SCF orbitals span {n_irreps} irreducible representations instead of one"
        ))
        .into());
    }
    Ok(())
}

/// Loads an SCF result from a source, validates it, and constructs a provider.
///
/// # Arguments
///
/// * `source` - The place to load the SCF result from.
///
/// # Returns
///
/// The provider, behind the backend-agnostic [`HartreeFockProvider`] interface.
pub fn import_scf(source: &ScfSource) -> Result<Box<dyn HartreeFockProvider>, anyhow::Error> {
    let scf = match source {
        ScfSource::Archive(name) => read_hfp_binary::<CustomScfResult, _>(name, HfpFileType::Scf)
            .with_context(|| {
                format!(
                    "Unable to read the SCF archive `{}.{}`",
                    name.display(),
                    HfpFileType::Scf.ext()
                )
            })?,
        ScfSource::Binaries(binaries) => binaries
            .load()
            .with_context(|| "Unable to load the SCF result from binary files")?,
    };
    Ok(Box::new(scf.import_scf()?))
}
