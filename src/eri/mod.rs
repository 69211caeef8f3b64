//! Molecular-orbital electron-repulsion integrals: per-block construction, caching, and
//! antisymmetrised slicing.
//!
//! Chemist-notation blocks $`(pq|rs)`$ are computed on demand from the atomic-orbital integrals
//! of a backend and kept for the lifetime of the builder. Antisymmetrised physicist-notation
//! slices are assembled from these blocks as
//! ```math
//!     \langle pq \Vert rs \rangle
//!     = (pr|qs)\, \delta_{\sigma_p \sigma_r} \delta_{\sigma_q \sigma_s}
//!     - (ps|qr)\, \delta_{\sigma_p \sigma_s} \delta_{\sigma_q \sigma_r}.
//! ```

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use anyhow::{self, ensure, format_err};
use indexmap::IndexMap;
use itertools::Itertools;
use log;
use ndarray::{s, Array4, ArrayView2, ArrayView4, ArrayViewMut4, Ix4};
use ndarray_einsum_beta::einsum;

use crate::orbitals::{check_out_shape, OrbitalDescriptor, OrbitalSpace, Spin};

#[cfg(test)]
#[path = "eri_tests.rs"]
mod eri_tests;

// ==================
// Trait definitions
// ==================

/// Trait defining the capabilities a quantum-chemistry backend must offer to build
/// molecular-orbital ERIs. Each supported backend provides one implementation.
pub trait EriBackend {
    // ----------------
    // Required methods
    // ----------------

    /// Returns the orbital counts of the reference.
    fn descriptor(&self) -> &OrbitalDescriptor;

    /// Returns `true` if both spin channels share the same spatial orbitals.
    fn is_restricted(&self) -> bool;

    /// Returns the atomic-orbital-to-molecular-orbital coefficients of one subspace of one spin
    /// channel, with basis functions along the rows.
    fn coefficients(&self, spin: Spin, space: OrbitalSpace) -> Result<ArrayView2<f64>, anyhow::Error>;

    /// Contracts four coefficient matrices with the atomic-orbital ERIs to give the chemist-notation
    /// tensor $`(pq|rs)`$.
    fn mo_eri(&self, coefficients: [ArrayView2<f64>; 4]) -> Result<Array4<f64>, anyhow::Error>;

    // ----------------
    // Provided methods
    // ----------------

    /// Returns the occupied $`\alpha`$ coefficients.
    fn coefficients_occupied_alpha(&self) -> Result<ArrayView2<f64>, anyhow::Error> {
        self.coefficients(Spin::Alpha, OrbitalSpace::Occupied)
    }

    /// Returns the virtual $`\alpha`$ coefficients.
    fn coefficients_virtual_alpha(&self) -> Result<ArrayView2<f64>, anyhow::Error> {
        self.coefficients(Spin::Alpha, OrbitalSpace::Virtual)
    }

    /// Returns the occupied $`\beta`$ coefficients.
    fn coefficients_occupied_beta(&self) -> Result<ArrayView2<f64>, anyhow::Error> {
        self.coefficients(Spin::Beta, OrbitalSpace::Occupied)
    }

    /// Returns the virtual $`\beta`$ coefficients.
    fn coefficients_virtual_beta(&self) -> Result<ArrayView2<f64>, anyhow::Error> {
        self.coefficients(Spin::Beta, OrbitalSpace::Virtual)
    }
}

// ==================
// Struct definitions
// ==================

/// The identity of one chemist-notation block $`(pq|rs)`$: the spin channel and subspace of each
/// of the four indices, in chemist order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockKey {
    labels: [(Spin, OrbitalSpace); 4],
}

impl BlockKey {
    /// Constructs a block key from four (spin, subspace) labels in chemist order.
    pub fn new(labels: [(Spin, OrbitalSpace); 4]) -> Self {
        Self { labels }
    }

    /// Constructs an all-$`\alpha`$ block key from a four-character subspace pattern such as
    /// `"oovv"`.
    pub fn from_pattern(pattern: &str) -> Result<Self, anyhow::Error> {
        let spaces = pattern
            .chars()
            .map(OrbitalSpace::from_label)
            .collect::<Result<Vec<_>, _>>()?;
        ensure!(
            spaces.len() == 4,
            "A block pattern needs exactly four subspace labels, but `{pattern}` has {}.",
            spaces.len()
        );
        Ok(Self::new([
            (Spin::Alpha, spaces[0]),
            (Spin::Alpha, spaces[1]),
            (Spin::Alpha, spaces[2]),
            (Spin::Alpha, spaces[3]),
        ]))
    }

    /// Returns the (spin, subspace) labels in chemist order.
    pub fn labels(&self) -> &[(Spin, OrbitalSpace); 4] {
        &self.labels
    }

    /// Returns the key under which this block is stored. Closed-shell restricted references have
    /// identical subspaces in both spin channels, so all spin labels collapse onto $`\alpha`$.
    fn canonicalised(&self, spin_symmetric: bool) -> Self {
        if spin_symmetric {
            Self::new(self.labels.map(|(_, space)| (Spin::Alpha, space)))
        } else {
            *self
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [(s0, o0), (s1, o1), (s2, o2), (s3, o3)] = self.labels;
        write!(f, "({o0}{o1}|{o2}{o3}) [{s0}{s1}{s2}{s3}]")
    }
}

/// Builder and cache of molecular-orbital ERI blocks for one backend.
///
/// Each block is computed at most once while cached and is shared by reference counting, so
/// repeated requests during an iterative solve return the very same tensor. The cache can only
/// be emptied as a whole via [`Self::flush`].
pub struct EriBuilder<B: EriBackend> {
    /// The backend supplying coefficients and atomic-orbital integrals.
    backend: B,

    /// Computed chemist-notation blocks, in order of first computation.
    eri_cache: IndexMap<BlockKey, Rc<Array4<f64>>>,
}

impl<B: EriBackend> EriBuilder<B> {
    /// Creates a builder with an empty cache.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            eri_cache: IndexMap::new(),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the orbital counts of the backend.
    pub fn descriptor(&self) -> &OrbitalDescriptor {
        self.backend.descriptor()
    }

    /// Returns the four coefficient matrices required for a block, in chemist order.
    pub fn coefficient_quadruple(
        &self,
        key: &BlockKey,
    ) -> Result<[ArrayView2<f64>; 4], anyhow::Error> {
        coefficient_quadruple(&self.backend, key)
    }

    /// Returns the chemist-notation block $`(pq|rs)`$ identified by `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - The block to compute. The coefficients are composed from the backend accessors
    ///   according to the labels of the key.
    /// * `use_cache` - If `true` and the block has been computed before, the cached tensor is
    ///   returned without recomputation. If `false`, the block is always recomputed.
    ///
    /// # Returns
    ///
    /// The block of shape `(n_p, n_q, n_r, n_s)`. A freshly computed block is stored if the cache
    /// does not hold one yet; an existing cache entry is never replaced.
    pub fn compute_mo_eri(
        &mut self,
        key: &BlockKey,
        use_cache: bool,
    ) -> Result<Rc<Array4<f64>>, anyhow::Error> {
        let key = key.canonicalised(self.spin_symmetric());
        if use_cache {
            if let Some(eri) = self.eri_cache.get(&key) {
                log::debug!("ERI block {key} served from cache.");
                return Ok(Rc::clone(eri));
            }
        }
        log::debug!("Computing ERI block {key}.");
        let coefficients = coefficient_quadruple(&self.backend, &key)?;
        let eri = Rc::new(self.backend.mo_eri(coefficients)?);
        self.eri_cache
            .entry(key)
            .or_insert_with(|| Rc::clone(&eri));
        Ok(eri)
    }

    /// Writes the antisymmetrised physicist-notation ERIs $`\langle pq \Vert rs \rangle`$ for the
    /// requested spin-orbital ranges into `out`.
    ///
    /// Only the chemist blocks overlapping the requested ranges are computed (or taken from the
    /// cache); the full tensor is never assembled.
    ///
    /// # Arguments
    ///
    /// * `ranges` - The spin-orbital ranges of $`p`$, $`q`$, $`r`$, and $`s`$.
    /// * `out` - The output buffer, whose shape must match the lengths of `ranges`.
    ///
    /// # Errors
    ///
    /// [`crate::orbitals::InvalidBlockRequest`] if a range is reversed, out of bounds, or does not
    /// match the output shape.
    pub fn fill_slice(
        &mut self,
        ranges: &[Range<usize>; 4],
        mut out: ArrayViewMut4<f64>,
    ) -> Result<(), anyhow::Error> {
        let desc = *self.descriptor();
        let segmentss = ranges
            .iter()
            .map(|range| desc.segments(range))
            .collect::<Result<Vec<_>, _>>()?;
        check_out_shape(ranges, out.shape())?;
        out.fill(0.0);

        for segs in segmentss
            .iter()
            .map(|segments| segments.iter())
            .multi_cartesian_product()
        {
            let (sp, sq, sr, ss) = (segs[0], segs[1], segs[2], segs[3]);
            let mut out_block = out.slice_mut(s![
                sp.out.clone(),
                sq.out.clone(),
                sr.out.clone(),
                ss.out.clone()
            ]);

            // Coulomb-like part (pr|qs)
            if sp.spin == sr.spin && sq.spin == ss.spin {
                let key = BlockKey::new([
                    (sp.spin, sp.space),
                    (sr.spin, sr.space),
                    (sq.spin, sq.space),
                    (ss.spin, ss.space),
                ]);
                let eri = self.compute_mo_eri(&key, true)?;
                let block = eri
                    .slice(s![
                        sp.local.clone(),
                        sr.local.clone(),
                        sq.local.clone(),
                        ss.local.clone()
                    ])
                    .permuted_axes([0, 2, 1, 3]);
                out_block += &block;
            }

            // Exchange-like part (ps|qr)
            if sp.spin == ss.spin && sq.spin == sr.spin {
                let key = BlockKey::new([
                    (sp.spin, sp.space),
                    (ss.spin, ss.space),
                    (sq.spin, sq.space),
                    (sr.spin, sr.space),
                ]);
                let eri = self.compute_mo_eri(&key, true)?;
                let block = eri
                    .slice(s![
                        sp.local.clone(),
                        ss.local.clone(),
                        sq.local.clone(),
                        sr.local.clone()
                    ])
                    .permuted_axes([0, 2, 3, 1]);
                out_block -= &block;
            }
        }
        Ok(())
    }

    /// Assembles the complete antisymmetrised ERI tensor over all spin-orbitals by visiting every
    /// block combination.
    ///
    /// This requires memory scaling as $`n_\mathrm{orbs}^4`$ and should only be used for
    /// validation.
    pub fn build_full_eri_tensor(&mut self) -> Result<Array4<f64>, anyhow::Error> {
        let n = self.descriptor().n_orbs();
        log::debug!("Building the full antisymmetrised ERI tensor over {n} spin-orbitals.");
        let mut full = Array4::<f64>::zeros((n, n, n, n));
        self.fill_slice(&[0..n, 0..n, 0..n, 0..n], full.view_mut())?;
        Ok(full)
    }

    /// Returns `true` if the block identified by `key` is currently cached.
    pub fn is_cached(&self, key: &BlockKey) -> bool {
        self.eri_cache
            .contains_key(&key.canonicalised(self.spin_symmetric()))
    }

    /// Returns `true` if both spin channels share their occupied and virtual subspaces.
    fn spin_symmetric(&self) -> bool {
        let desc = self.backend.descriptor();
        self.backend.is_restricted() && desc.n_alpha() == desc.n_beta()
    }

    /// Returns the number of cached blocks.
    pub fn n_cached_blocks(&self) -> usize {
        self.eri_cache.len()
    }

    /// Returns the keys of the cached blocks in order of first computation.
    pub fn cached_keys(&self) -> Vec<BlockKey> {
        self.eri_cache.keys().copied().collect()
    }

    /// Empties the block cache.
    pub fn flush(&mut self) {
        if !self.eri_cache.is_empty() {
            log::debug!("Flushing {} cached ERI block(s).", self.eri_cache.len());
        }
        self.eri_cache.clear();
    }
}

// ==============
// Free functions
// ==============

/// Composes the four coefficient matrices of a block from the accessors of a backend.
fn coefficient_quadruple<'a, B: EriBackend>(
    backend: &'a B,
    key: &BlockKey,
) -> Result<[ArrayView2<'a, f64>; 4], anyhow::Error> {
    let [l0, l1, l2, l3] = key.labels;
    Ok([
        backend.coefficients(l0.0, l0.1)?,
        backend.coefficients(l1.0, l1.1)?,
        backend.coefficients(l2.0, l2.1)?,
        backend.coefficients(l3.0, l3.1)?,
    ])
}

/// Transforms chemist-notation atomic-orbital ERIs $`(\mu\nu|\lambda\sigma)`$ into the
/// molecular-orbital basis one index at a time.
///
/// # Arguments
///
/// * `ao_eri` - The atomic-orbital ERIs, of shape `(n_bas, n_bas, n_bas, n_bas)`.
/// * `coefficients` - The coefficient matrices for the four indices, each with `n_bas` rows.
///
/// # Returns
///
/// The tensor $`(pq|rs) = \sum C_{\mu p} C_{\nu q} C_{\lambda r} C_{\sigma s}
/// (\mu\nu|\lambda\sigma)`$.
pub fn transform_ao_eri(
    ao_eri: &ArrayView4<f64>,
    coefficients: [ArrayView2<f64>; 4],
) -> Result<Array4<f64>, anyhow::Error> {
    let n_bas = ao_eri.shape()[0];
    ensure!(
        ao_eri.shape() == [n_bas; 4],
        "Atomic-orbital ERIs must have four equal dimensions, but have shape {:?}.",
        ao_eri.shape()
    );
    ensure!(
        coefficients.iter().all(|c| c.nrows() == n_bas),
        "Coefficient matrices must have {n_bas} rows."
    );
    let [c0, c1, c2, c3] = coefficients;
    let shape = (c0.ncols(), c1.ncols(), c2.ncols(), c3.ncols());
    if n_bas == 0 || [shape.0, shape.1, shape.2, shape.3].contains(&0) {
        return Ok(Array4::zeros(shape));
    }

    let eri_pbcd = einsum("abcd,ap->pbcd", &[ao_eri, &c0]).map_err(|err| format_err!(err))?;
    let eri_pqcd = einsum("pbcd,bq->pqcd", &[&eri_pbcd, &c1]).map_err(|err| format_err!(err))?;
    let eri_pqrd = einsum("pqcd,cr->pqrd", &[&eri_pqcd, &c2]).map_err(|err| format_err!(err))?;
    let eri_pqrs = einsum("pqrd,ds->pqrs", &[&eri_pqrd, &c3]).map_err(|err| format_err!(err))?;
    Ok(eri_pqrs.into_dimensionality::<Ix4>()?)
}
