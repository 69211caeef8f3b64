//! Molecules and their nuclear multipoles.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{self, ensure, format_err, Context};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::auxiliary::atom::{Atom, ElementMap, ANGSTROM_TO_BOHR};

#[cfg(test)]
#[path = "molecule_tests.rs"]
mod molecule_tests;

/// An enumerated type for the length units of coordinates in an `xyz` file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LengthUnit {
    /// Coordinates are given in Ångström.
    #[default]
    Angstrom,

    /// Coordinates are given in bohr.
    Bohr,
}

impl LengthUnit {
    /// Returns the factor that converts a length in this unit to bohr.
    pub fn to_bohr(&self) -> f64 {
        match self {
            LengthUnit::Angstrom => ANGSTROM_TO_BOHR,
            LengthUnit::Bohr => 1.0,
        }
    }
}

/// A struct containing the atoms constituting a molecule, together with its charge and spin
/// multiplicity.
#[derive(Clone, Serialize, Deserialize)]
pub struct Molecule {
    /// The atoms constituting this molecule. Coordinates are stored in bohr.
    pub atoms: Vec<Atom>,

    /// The total molecular charge.
    pub molecular_charge: i32,

    /// The spin multiplicity $`2S + 1`$.
    pub multiplicity: usize,
}

impl Molecule {
    /// Constructs a molecule from atoms.
    ///
    /// # Arguments
    ///
    /// * `atoms` - The atoms constituting the molecule.
    /// * `molecular_charge` - The total molecular charge.
    /// * `multiplicity` - The spin multiplicity.
    pub fn from_atoms(
        atoms: &[Atom],
        molecular_charge: i32,
        multiplicity: usize,
    ) -> Result<Self, anyhow::Error> {
        ensure!(multiplicity >= 1, "Spin multiplicity must be at least one.");
        Ok(Molecule {
            atoms: atoms.to_vec(),
            molecular_charge,
            multiplicity,
        })
    }

    /// Parses an `xyz` file to construct a neutral singlet molecule.
    ///
    /// # Arguments
    ///
    /// * `filename` - The `xyz` file to be parsed.
    /// * `unit` - The length unit of the coordinates in the file.
    ///
    /// # Returns
    ///
    /// The parsed [`Molecule`] struct.
    pub fn from_xyz<P: AsRef<Path>>(filename: P, unit: LengthUnit) -> Result<Self, anyhow::Error> {
        let contents = fs::read_to_string(&filename).with_context(|| {
            format!(
                "Unable to read the xyz file `{}`",
                filename.as_ref().display()
            )
        })?;
        Self::from_xyz_str(&contents, unit)
    }

    /// Parses the contents of an `xyz` file to construct a neutral singlet molecule.
    ///
    /// # Arguments
    ///
    /// * `contents` - The contents of an `xyz` file: the number of atoms, a comment line, then one
    ///   line per atom.
    /// * `unit` - The length unit of the coordinates.
    pub fn from_xyz_str(contents: &str, unit: LengthUnit) -> Result<Self, anyhow::Error> {
        let emap = ElementMap::new();
        let mut lines = contents.lines();
        let n_atoms = lines
            .next()
            .ok_or_else(|| format_err!("Empty xyz contents."))?
            .trim()
            .parse::<usize>()
            .map_err(|err| format_err!("Unable to parse the number of atoms: {err}"))?;
        let atoms = lines
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| Atom::from_xyz(line, &emap, unit.to_bohr()))
            .collect::<Result<Vec<_>, _>>()?;
        ensure!(
            atoms.len() == n_atoms,
            "Expected {n_atoms} atoms, got {} instead.",
            atoms.len()
        );
        Self::from_atoms(&atoms, 0, 1)
    }

    /// Returns the number of atoms.
    pub fn natom(&self) -> usize {
        self.atoms.len()
    }

    /// Returns the total nuclear charge $`\sum_A Z_A`$.
    pub fn nuclear_charge(&self) -> f64 {
        self.atoms.iter().map(|atom| atom.charge).sum()
    }

    /// Returns the nuclear dipole moment $`\sum_A Z_A \mathbf{R}_A`$ in atomic units.
    pub fn nuclear_dipole(&self) -> Vector3<f64> {
        self.atoms.iter().fold(Vector3::zeros(), |acc, atom| {
            acc + atom.coordinates.coords * atom.charge
        })
    }

    /// Returns the number of electrons implied by the nuclear charges and the molecular charge.
    pub fn n_electrons(&self) -> Result<usize, anyhow::Error> {
        let n = self.nuclear_charge().round() - f64::from(self.molecular_charge);
        ensure!(n >= 0.0, "Negative electron count {n} implied by the molecule.");
        Ok(n as usize)
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Molecule with {} atom(s), charge {}, multiplicity {}",
            self.natom(),
            self.molecular_charge,
            self.multiplicity
        )?;
        for atom in self.atoms.iter() {
            writeln!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
