//! Orbital counts and the stacked spin-orbital index layout shared by all providers.
//!
//! Spin-orbitals are indexed by a single integer $`f \in [0, n_\mathrm{orbs})`$ where
//! $`n_\mathrm{orbs} = 2 n_\mathrm{orbs}^\alpha`$. All $`\alpha`$ orbitals precede all $`\beta`$
//! orbitals, and within each spin channel the occupied orbitals precede the virtual ones. A
//! contiguous run of indices sharing the same spin and occupation is called a *segment*.

use std::error::Error;
use std::fmt;
use std::ops::Range;

use anyhow::{self, format_err};
use serde::{Deserialize, Serialize};


// ==================
// Error definitions
// ==================

/// Error raised when requested orbital index ranges, output shapes, or orbital counts are
/// inconsistent with the orbital descriptor.
#[derive(Debug, Clone)]
pub struct InvalidBlockRequest(pub String);

impl fmt::Display for InvalidBlockRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid block request: {}", self.0)
    }
}

impl Error for InvalidBlockRequest {}

/// Returns an [`InvalidBlockRequest`] error wrapped in [`anyhow::Error`] if `cond` is false.
macro_rules! ensure_block {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(anyhow::Error::new(
                $crate::orbitals::InvalidBlockRequest(format!($($arg)+))
            ));
        }
    };
}

// ================
// Enum definitions
// ================

/// An enumerated type for the two spin channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spin {
    /// Spin-up channel.
    Alpha,

    /// Spin-down channel.
    Beta,
}

impl Spin {
    /// Both spin channels in stacking order.
    pub const ALL: [Spin; 2] = [Spin::Alpha, Spin::Beta];
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Spin::Alpha => write!(f, "a"),
            Spin::Beta => write!(f, "b"),
        }
    }
}

/// An enumerated type for the occupied and virtual orbital subspaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitalSpace {
    /// Orbitals occupied in the reference determinant.
    Occupied,

    /// Orbitals unoccupied in the reference determinant.
    Virtual,
}

impl OrbitalSpace {
    /// Both subspaces in stacking order.
    pub const ALL: [OrbitalSpace; 2] = [OrbitalSpace::Occupied, OrbitalSpace::Virtual];

    /// Parses a single-character label: `o` for occupied and `v` for virtual.
    pub fn from_label(label: char) -> Result<Self, anyhow::Error> {
        match label {
            'o' | 'O' => Ok(OrbitalSpace::Occupied),
            'v' | 'V' => Ok(OrbitalSpace::Virtual),
            _ => Err(format_err!("Unknown orbital subspace label `{label}`.")),
        }
    }
}

impl fmt::Display for OrbitalSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrbitalSpace::Occupied => write!(f, "o"),
            OrbitalSpace::Virtual => write!(f, "v"),
        }
    }
}

// ==================
// Struct definitions
// ==================

/// A run of spin-orbital indices of one spin and one occupation inside a requested index range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// The spin channel of this run.
    pub spin: Spin,

    /// The orbital subspace of this run.
    pub space: OrbitalSpace,

    /// The indices of this run relative to the start of its orbital subspace.
    pub local: Range<usize>,

    /// The indices of this run relative to the start of the requested range.
    pub out: Range<usize>,
}

/// The orbital counts of one calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitalDescriptor {
    /// The number of spatial molecular orbitals per spin channel.
    n_orbs_alpha: usize,

    /// The number of occupied $`\alpha`$ orbitals.
    n_alpha: usize,

    /// The number of occupied $`\beta`$ orbitals.
    n_beta: usize,

    /// The number of atomic-orbital basis functions.
    n_bas: usize,
}

impl OrbitalDescriptor {
    /// Constructs and validates an orbital descriptor.
    ///
    /// # Arguments
    ///
    /// * `n_orbs_alpha` - The number of spatial molecular orbitals per spin channel.
    /// * `n_alpha` - The number of occupied $`\alpha`$ orbitals.
    /// * `n_beta` - The number of occupied $`\beta`$ orbitals.
    /// * `n_bas` - The number of atomic-orbital basis functions.
    ///
    /// # Errors
    ///
    /// [`InvalidBlockRequest`] if `n_alpha < n_beta`, `n_alpha > n_orbs_alpha`, or
    /// `n_orbs_alpha > n_bas`.
    pub fn new(
        n_orbs_alpha: usize,
        n_alpha: usize,
        n_beta: usize,
        n_bas: usize,
    ) -> Result<Self, anyhow::Error> {
        ensure_block!(
            n_alpha >= n_beta,
            "the number of alpha electrons ({n_alpha}) is smaller than the number of beta electrons ({n_beta})"
        );
        ensure_block!(
            n_alpha <= n_orbs_alpha,
            "{n_alpha} occupied alpha orbital(s) requested but only {n_orbs_alpha} orbital(s) exist"
        );
        ensure_block!(
            n_orbs_alpha <= n_bas,
            "{n_orbs_alpha} molecular orbital(s) cannot be spanned by {n_bas} basis function(s)"
        );
        Ok(Self {
            n_orbs_alpha,
            n_alpha,
            n_beta,
            n_bas,
        })
    }

    /// Returns the total number of spin-orbitals.
    pub fn n_orbs(&self) -> usize {
        2 * self.n_orbs_alpha
    }

    /// Returns the number of spatial molecular orbitals per spin channel.
    pub fn n_orbs_alpha(&self) -> usize {
        self.n_orbs_alpha
    }

    /// Returns the number of occupied $`\alpha`$ orbitals.
    pub fn n_alpha(&self) -> usize {
        self.n_alpha
    }

    /// Returns the number of occupied $`\beta`$ orbitals.
    pub fn n_beta(&self) -> usize {
        self.n_beta
    }

    /// Returns the number of atomic-orbital basis functions.
    pub fn n_bas(&self) -> usize {
        self.n_bas
    }

    /// Returns the number of occupied orbitals in a spin channel.
    pub fn n_occ(&self, spin: Spin) -> usize {
        match spin {
            Spin::Alpha => self.n_alpha,
            Spin::Beta => self.n_beta,
        }
    }

    /// Returns the number of orbitals in a subspace of a spin channel.
    pub fn space_size(&self, spin: Spin, space: OrbitalSpace) -> usize {
        match space {
            OrbitalSpace::Occupied => self.n_occ(spin),
            OrbitalSpace::Virtual => self.n_orbs_alpha - self.n_occ(spin),
        }
    }

    /// Returns the range of spatial orbital indices (within one spin channel) spanned by a
    /// subspace.
    pub fn spatial_range(&self, spin: Spin, space: OrbitalSpace) -> Range<usize> {
        match space {
            OrbitalSpace::Occupied => 0..self.n_occ(spin),
            OrbitalSpace::Virtual => self.n_occ(spin)..self.n_orbs_alpha,
        }
    }

    /// Returns the range of spin-orbital indices spanned by a subspace of a spin channel.
    pub fn spin_orbital_range(&self, spin: Spin, space: OrbitalSpace) -> Range<usize> {
        let offset = match spin {
            Spin::Alpha => 0,
            Spin::Beta => self.n_orbs_alpha,
        };
        let spatial = self.spatial_range(spin, space);
        (spatial.start + offset)..(spatial.end + offset)
    }

    /// Checks that a spin-orbital index range is well-formed and within bounds.
    pub fn check_range(&self, range: &Range<usize>) -> Result<(), anyhow::Error> {
        ensure_block!(
            range.start <= range.end,
            "reversed index range {}..{}",
            range.start,
            range.end
        );
        ensure_block!(
            range.end <= self.n_orbs(),
            "index range {}..{} exceeds the {} available spin-orbital(s)",
            range.start,
            range.end,
            self.n_orbs()
        );
        Ok(())
    }

    /// Decomposes a spin-orbital index range into its segments, in increasing index order.
    ///
    /// # Arguments
    ///
    /// * `range` - A range of spin-orbital indices.
    ///
    /// # Returns
    ///
    /// The segments covering `range`. Their [`Segment::out`] ranges tile `0..range.len()`.
    pub fn segments(&self, range: &Range<usize>) -> Result<Vec<Segment>, anyhow::Error> {
        self.check_range(range)?;
        let segments = Spin::ALL
            .iter()
            .flat_map(|spin| OrbitalSpace::ALL.iter().map(move |space| (*spin, *space)))
            .filter_map(|(spin, space)| {
                let block = self.spin_orbital_range(spin, space);
                let lo = block.start.max(range.start);
                let hi = block.end.min(range.end);
                if lo < hi {
                    Some(Segment {
                        spin,
                        space,
                        local: (lo - block.start)..(hi - block.start),
                        out: (lo - range.start)..(hi - range.start),
                    })
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        Ok(segments)
    }
}

impl fmt::Display for OrbitalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "n_orbs = {}, n_orbs_alpha = {}, n_alpha = {}, n_beta = {}, n_bas = {}",
            self.n_orbs(),
            self.n_orbs_alpha,
            self.n_alpha,
            self.n_beta,
            self.n_bas
        )
    }
}

// =================
// Free functions
// =================

/// Checks that an output buffer has the shape implied by a set of index ranges.
///
/// # Arguments
///
/// * `ranges` - The requested index ranges, one per axis.
/// * `shape` - The shape of the output buffer.
pub fn check_out_shape(ranges: &[Range<usize>], shape: &[usize]) -> Result<(), anyhow::Error> {
    let expected = ranges.iter().map(|r| r.len()).collect::<Vec<_>>();
    ensure_block!(
        expected.as_slice() == shape,
        "output buffer has shape {shape:?} but the requested ranges imply {expected:?}"
    );
    Ok(())
}
