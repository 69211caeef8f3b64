//! `hfprovider` interface with raw numeric binary files.

use std::path::{Path, PathBuf};

use anyhow::{self, Context};
use byteorder::{BigEndian, LittleEndian};
use derive_builder::Builder;
use ndarray::{stack, Array, Array1, Axis, Dim, Dimension, ShapeBuilder};
use serde::{Deserialize, Serialize};

use crate::auxiliary::molecule::{LengthUnit, Molecule};
use crate::importer::WavefunctionKind;
use crate::interfaces::custom::{check_electron_count, CustomScfResult, ScfOptions};
use crate::io::format::hfp_warn;
use crate::io::numeric::NumericReader;


// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Input target: SCF result; source: binaries
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

fn default_multiplicity() -> usize {
    1
}

fn default_n_irreps() -> usize {
    1
}

fn default_wavefunction_kind() -> WavefunctionKind {
    WavefunctionKind::Rhf
}

/// Serialisable/deserialisable structure containing control parameters for acquiring an SCF
/// result from raw numeric binary files.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
pub struct BinariesScfSource {
    /// Path to an XYZ file containing the molecular geometry.
    pub xyz: PathBuf,

    /// The length unit of the coordinates in the XYZ file.
    #[builder(default)]
    #[serde(default)]
    pub length_unit: LengthUnit,

    /// The total molecular charge.
    #[builder(default = "0")]
    #[serde(default)]
    pub charge: i32,

    /// The spin multiplicity.
    #[builder(default = "1")]
    #[serde(default = "default_multiplicity")]
    pub multiplicity: usize,

    /// The kind of the SCF wavefunction.
    #[builder(default = "WavefunctionKind::Rhf")]
    #[serde(default = "default_wavefunction_kind")]
    pub wavefunction_kind: WavefunctionKind,

    /// The number of irreducible representations the orbitals were classified by.
    #[builder(default = "1")]
    #[serde(default = "default_n_irreps")]
    pub n_irreps: usize,

    /// The SCF settings.
    #[builder(default)]
    #[serde(default)]
    pub options: ScfOptions,

    /// The converged SCF energy.
    pub energy: f64,

    /// The number of occupied $`\alpha`$ orbitals.
    pub n_alpha: usize,

    /// The number of occupied $`\beta`$ orbitals.
    pub n_beta: usize,

    /// The number of atomic-orbital basis functions.
    pub n_bas: usize,

    /// The number of molecular orbitals.
    pub n_mo: usize,

    /// Path to a binary file containing the `n_bas × n_mo` molecular-orbital coefficient matrix.
    pub coefficients: PathBuf,

    /// Path to a binary file containing the `n_mo` orbital energies.
    pub orbital_energies: PathBuf,

    /// Optional path to a binary file containing the `n_mo` occupation numbers of the spatial
    /// orbitals in one spin channel.
    #[builder(default = "None")]
    #[serde(default)]
    pub occupations: Option<PathBuf>,

    /// Path to a binary file containing the chemist-notation atomic-orbital two-electron
    /// integrals.
    pub ao_eri: PathBuf,

    /// Paths to binary files containing the $`x`$, $`y`$, and $`z`$ atomic-orbital position
    /// integral matrices.
    pub ao_dipole: [PathBuf; 3],

    /// Specification of the order matrix elements are packed in binary files.
    #[builder(default)]
    #[serde(default)]
    pub matrix_order: MatrixOrder,

    /// Specification of the byte order numerical values are stored in binary files.
    #[builder(default)]
    #[serde(default)]
    pub byte_order: ByteOrder,
}

impl BinariesScfSource {
    /// Returns a builder to construct a structure for handling binaries SCF sources.
    pub fn builder() -> BinariesScfSourceBuilder {
        BinariesScfSourceBuilder::default()
    }

    /// Reads all values from a binary file and checks their number.
    fn read_values(&self, path: &Path, expected: usize) -> Result<Vec<f64>, anyhow::Error> {
        match self.byte_order {
            ByteOrder::LittleEndian => {
                NumericReader::<_, LittleEndian, f64>::from_file(path)?.collect_exact(expected)
            }
            ByteOrder::BigEndian => {
                NumericReader::<_, BigEndian, f64>::from_file(path)?.collect_exact(expected)
            }
        }
        .with_context(|| format!("Unable to read `{}`", path.display()))
    }

    /// Reads an array of a given shape from a binary file, honouring [`Self::matrix_order`].
    fn read_array<D: Dimension>(
        &self,
        path: &Path,
        dim: D,
    ) -> Result<Array<f64, D>, anyhow::Error> {
        let values = self.read_values(path, dim.size())?;
        let array = match self.matrix_order {
            MatrixOrder::RowMajor => Array::from_shape_vec(dim, values),
            MatrixOrder::ColMajor => Array::from_shape_vec(dim.f(), values),
        }
        .with_context(|| format!("Unable to shape the values read from `{}`", path.display()))?;
        Ok(array)
    }

    /// Reads all files of this source and assembles an SCF result.
    pub fn load(&self) -> Result<CustomScfResult, anyhow::Error> {
        let (n_bas, n_mo) = (self.n_bas, self.n_mo);
        let xyz_molecule = Molecule::from_xyz(&self.xyz, self.length_unit)?;
        let molecule = Molecule::from_atoms(&xyz_molecule.atoms, self.charge, self.multiplicity)?;

        let coefficients = self
            .read_array(&self.coefficients, Dim([n_bas, n_mo]))
            .with_context(|| "Unable to read the coefficient matrix when handling binaries SCF source")?;
        let orbital_energies = Array1::from_vec(
            self.read_values(&self.orbital_energies, n_mo)
                .with_context(|| "Unable to read the orbital energies when handling binaries SCF source")?,
        );
        let occupations = self
            .occupations
            .as_ref()
            .map(|path| self.read_values(path, n_mo).map(Array1::from_vec))
            .transpose()
            .with_context(|| "Unable to read the occupations when handling binaries SCF source")?;
        let ao_eri = self
            .read_array(&self.ao_eri, Dim([n_bas, n_bas, n_bas, n_bas]))
            .with_context(|| "Unable to read the atomic-orbital ERIs when handling binaries SCF source")?;
        let ao_dipole_components = self
            .ao_dipole
            .iter()
            .map(|path| self.read_array(path, Dim([n_bas, n_bas])))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| "Unable to read the atomic-orbital dipole integrals when handling binaries SCF source")?;
        let ao_dipole = stack(
            Axis(0),
            &ao_dipole_components
                .iter()
                .map(|component| component.view())
                .collect::<Vec<_>>(),
        )?;

        let scf = CustomScfResult::builder()
            .wavefunction_kind(self.wavefunction_kind.clone())
            .n_irreps(self.n_irreps)
            .options(self.options.clone())
            .molecule(molecule)
            .energy(self.energy)
            .n_alpha(self.n_alpha)
            .n_beta(self.n_beta)
            .coefficients(coefficients)
            .orbital_energies(orbital_energies)
            .occupations(occupations)
            .ao_eri(ao_eri)
            .ao_dipole(ao_dipole)
            .build()
            .with_context(|| "Failed to construct an SCF result when handling binaries SCF source")?;
        if let Err(err) = check_electron_count(&scf) {
            hfp_warn!("{err}");
        }
        Ok(scf)
    }
}

impl Default for BinariesScfSource {
    fn default() -> Self {
        BinariesScfSource {
            xyz: PathBuf::from("path/to/xyz"),
            length_unit: LengthUnit::default(),
            charge: 0,
            multiplicity: 1,
            wavefunction_kind: WavefunctionKind::Rhf,
            n_irreps: 1,
            options: ScfOptions::default(),
            energy: 0.0,
            n_alpha: 0,
            n_beta: 0,
            n_bas: 0,
            n_mo: 0,
            coefficients: PathBuf::from("path/to/coefficients"),
            orbital_energies: PathBuf::from("path/to/orbital/energies"),
            occupations: None,
            ao_eri: PathBuf::from("path/to/ao/eri"),
            ao_dipole: [
                PathBuf::from("path/to/ao/dipole/x"),
                PathBuf::from("path/to/ao/dipole/y"),
                PathBuf::from("path/to/ao/dipole/z"),
            ],
            matrix_order: MatrixOrder::default(),
            byte_order: ByteOrder::default(),
        }
    }
}

/// Enumerated type indicating the order the matrix elements are traversed when stored into or
/// read in from a binary file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MatrixOrder {
    #[default]
    RowMajor,
    ColMajor,
}

/// Enumerated type indicating the byte order of numerical values in binary files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}
