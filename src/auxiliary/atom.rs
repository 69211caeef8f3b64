//! Atoms carrying nuclear charges and positions.

use std::collections::HashMap;
use std::fmt;

use anyhow::{self, format_err};
use nalgebra::Point3;
use num_traits::ToPrimitive;
use periodic_table;
use serde::{Deserialize, Serialize};

/// Conversion factor from Ångström to bohr.
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / 0.529_177_210_903;

/// A struct storing a look-up of element symbols to give atomic numbers and atomic masses.
pub struct ElementMap<'a> {
    /// A [`HashMap`] from a symbol string to a tuple of atomic number and atomic mass.
    pub map: HashMap<&'a str, (u32, f64)>,
}

impl Default for ElementMap<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementMap<'static> {
    /// Creates a new [`ElementMap`] for all elements in the periodic table.
    #[must_use]
    pub fn new() -> ElementMap<'static> {
        let mut map = HashMap::new();
        let elements = periodic_table::periodic_table();
        for element in elements {
            let mass = parse_atomic_mass(element.atomic_mass).unwrap_or(0.0);
            map.insert(element.symbol, (element.atomic_number, mass));
        }
        ElementMap { map }
    }
}

/// Parses the atomic mass string in the format of [`periodic_table`] to a single float value.
///
/// # Arguments
///
/// * `mass_str` - A string of mass value that is either `x.y(z)` where the uncertain digit `z` is
///   enclosed in parentheses, or `[x]` where `x` is the mass number in place of precise
///   experimental values.
///
/// # Returns
///
/// The numeric mass value, or `None` if the string cannot be parsed.
fn parse_atomic_mass(mass_str: &str) -> Option<f64> {
    let mass = mass_str.replace(&['(', ')', '[', ']'][..], "");
    mass.parse::<f64>().ok()
}

/// A struct representing an atom as seen by the electronic-structure backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct Atom {
    /// The atomic number of the atom.
    pub atomic_number: u32,

    /// The atomic symbol of the atom.
    pub atomic_symbol: String,

    /// The nuclear charge seen by the electrons. This equals the atomic number unless the backend
    /// replaces core electrons or marks the atom as a ghost.
    pub charge: f64,

    /// The position of the atom in bohr.
    pub coordinates: Point3<f64>,
}

impl Atom {
    /// Parses an atom line in an `xyz` file to construct an [`Atom`].
    ///
    /// # Arguments
    ///
    /// * `line` - A line in an `xyz` file containing an atomic symbol and three Cartesian
    ///   coordinates.
    /// * `emap` - A hash map between atomic symbols and atomic numbers and masses.
    /// * `to_bohr` - The factor converting the coordinates in the line to bohr.
    ///
    /// # Returns
    ///
    /// The parsed [`Atom`] struct if the line has the correct format.
    pub fn from_xyz(line: &str, emap: &ElementMap, to_bohr: f64) -> Result<Atom, anyhow::Error> {
        let split: Vec<&str> = line.split_whitespace().collect();
        if split.len() != 4 {
            return Err(format_err!(
                "Expected an element symbol and three coordinates, but found `{line}`."
            ));
        };
        let atomic_symbol = split[0];
        let (atomic_number, _) = emap
            .map
            .get(atomic_symbol)
            .ok_or_else(|| format_err!("Invalid atomic symbol `{atomic_symbol}` encountered."))?;
        let coords = split[1..]
            .iter()
            .map(|x| {
                x.parse::<f64>()
                    .map(|v| v * to_bohr)
                    .map_err(|err| format_err!("Unable to parse coordinate `{x}`: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Atom::new(
            atomic_symbol,
            *atomic_number,
            Point3::new(coords[0], coords[1], coords[2]),
        ))
    }

    /// Creates an atom whose nuclear charge equals its atomic number.
    ///
    /// # Arguments
    ///
    /// * `atomic_symbol` - The element symbol.
    /// * `atomic_number` - The atomic number.
    /// * `coordinates` - The position of the atom in bohr.
    #[must_use]
    pub fn new(atomic_symbol: &str, atomic_number: u32, coordinates: Point3<f64>) -> Atom {
        Atom {
            atomic_number,
            atomic_symbol: atomic_symbol.to_string(),
            charge: f64::from(atomic_number),
            coordinates,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = 7_usize;
        let length = (precision + precision.div_euclid(2)).max(6);
        let charge = match self.charge.to_i64() {
            Some(z) if (self.charge - z as f64).abs() < f64::EPSILON => z.to_string(),
            _ => format!("{:.3}", self.charge),
        };
        write!(
            f,
            "{:>3} (Z = {charge:>3}) {:+length$.precision$} {:+length$.precision$} {:+length$.precision$}",
            self.atomic_symbol, self.coordinates[0], self.coordinates[1], self.coordinates[2],
        )
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
