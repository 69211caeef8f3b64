use std::cell::Cell;
use std::rc::Rc;

use anyhow;
use approx::assert_abs_diff_eq;
use ndarray::{s, Array2, Array4, ArrayView2, Zip};
use proptest::prelude::*;

use crate::eri::{transform_ao_eri, BlockKey, EriBackend, EriBuilder};
use crate::orbitals::{InvalidBlockRequest, OrbitalDescriptor, OrbitalSpace, Spin};

// ----------------
// Synthetic backend
// ----------------

/// Two-electron integrals with the full eight-fold permutational symmetry of real orbitals.
fn synthetic_ao_eri(n_bas: usize) -> Array4<f64> {
    Array4::from_shape_fn((n_bas, n_bas, n_bas, n_bas), |(m, n, l, s)| {
        let (a, b) = ((m + n) as f64, (l + s) as f64);
        let (ab, cd) = ((m * n) as f64, (l * s) as f64);
        1.0 / (1.0 + a + b) + 0.01 * (ab + cd) + 0.001 * a * b
    })
}

fn synthetic_coefficients(n_bas: usize, n_mo: usize, shift: f64) -> Array2<f64> {
    Array2::from_shape_fn((n_bas, n_mo), |(m, p)| {
        ((m + 1) as f64 * 0.37 + (p + 1) as f64 * 0.91 + shift).sin()
    })
}

struct CountingBackend {
    descriptor: OrbitalDescriptor,
    restricted: bool,
    coefficients_alpha: Array2<f64>,
    coefficients_beta: Array2<f64>,
    ao_eri: Array4<f64>,
    n_transforms: Cell<usize>,
}

impl CountingBackend {
    fn restricted(n_bas: usize, n_orbs_alpha: usize, n_occ: usize) -> Self {
        let c = synthetic_coefficients(n_bas, n_orbs_alpha, 0.0);
        Self {
            descriptor: OrbitalDescriptor::new(n_orbs_alpha, n_occ, n_occ, n_bas).unwrap(),
            restricted: true,
            coefficients_alpha: c.clone(),
            coefficients_beta: c,
            ao_eri: synthetic_ao_eri(n_bas),
            n_transforms: Cell::new(0),
        }
    }

    fn unrestricted(n_bas: usize, n_orbs_alpha: usize, n_alpha: usize, n_beta: usize) -> Self {
        Self {
            descriptor: OrbitalDescriptor::new(n_orbs_alpha, n_alpha, n_beta, n_bas).unwrap(),
            restricted: false,
            coefficients_alpha: synthetic_coefficients(n_bas, n_orbs_alpha, 0.0),
            coefficients_beta: synthetic_coefficients(n_bas, n_orbs_alpha, 0.5),
            ao_eri: synthetic_ao_eri(n_bas),
            n_transforms: Cell::new(0),
        }
    }

    fn spin_coefficients(&self, spin: Spin) -> &Array2<f64> {
        match spin {
            Spin::Alpha => &self.coefficients_alpha,
            Spin::Beta => &self.coefficients_beta,
        }
    }
}

impl EriBackend for CountingBackend {
    fn descriptor(&self) -> &OrbitalDescriptor {
        &self.descriptor
    }

    fn is_restricted(&self) -> bool {
        self.restricted
    }

    fn coefficients(
        &self,
        spin: Spin,
        space: OrbitalSpace,
    ) -> Result<ArrayView2<f64>, anyhow::Error> {
        let range = self.descriptor.spatial_range(spin, space);
        Ok(self.spin_coefficients(spin).slice(s![.., range]))
    }

    fn mo_eri(&self, coefficients: [ArrayView2<f64>; 4]) -> Result<Array4<f64>, anyhow::Error> {
        self.n_transforms.set(self.n_transforms.get() + 1);
        transform_ao_eri(&self.ao_eri.view(), coefficients)
    }
}

/// Antisymmetrised integrals over all spin-orbitals evaluated index by index.
fn brute_force_antisymmetrised(backend: &CountingBackend) -> Array4<f64> {
    let desc = backend.descriptor;
    let n_orbs_alpha = desc.n_orbs_alpha();
    let n = desc.n_orbs();
    let split = |f: usize| {
        if f < n_orbs_alpha {
            (Spin::Alpha, f)
        } else {
            (Spin::Beta, f - n_orbs_alpha)
        }
    };
    let n_bas = desc.n_bas();
    let chemist = |p: usize, q: usize, r: usize, s: usize| -> f64 {
        let (sp, ip) = split(p);
        let (sq, iq) = split(q);
        let (sr, ir) = split(r);
        let (ss, is) = split(s);
        let (cp, cq) = (backend.spin_coefficients(sp), backend.spin_coefficients(sq));
        let (cr, cs) = (backend.spin_coefficients(sr), backend.spin_coefficients(ss));
        let mut value = 0.0;
        for m in 0..n_bas {
            for nu in 0..n_bas {
                for l in 0..n_bas {
                    for sg in 0..n_bas {
                        value += cp[(m, ip)]
                            * cq[(nu, iq)]
                            * cr[(l, ir)]
                            * cs[(sg, is)]
                            * backend.ao_eri[(m, nu, l, sg)];
                    }
                }
            }
        }
        value
    };
    Array4::from_shape_fn((n, n, n, n), |(p, q, r, s)| {
        let (sp, sq, sr, ss) = (split(p).0, split(q).0, split(r).0, split(s).0);
        let coulomb = if sp == sr && sq == ss {
            chemist(p, r, q, s)
        } else {
            0.0
        };
        let exchange = if sp == ss && sq == sr {
            chemist(p, s, q, r)
        } else {
            0.0
        };
        coulomb - exchange
    })
}

fn assert_arrays_close(a: &Array4<f64>, b: &Array4<f64>, epsilon: f64) {
    assert_eq!(a.shape(), b.shape());
    Zip::from(a).and(b).for_each(|x, y| {
        assert_abs_diff_eq!(*x, *y, epsilon = epsilon);
    });
}

fn oovv_alpha() -> BlockKey {
    BlockKey::from_pattern("oovv").unwrap()
}

// -----
// Tests
// -----

#[test]
fn test_transform_ao_eri_matches_direct_sum() {
    let n_bas = 3;
    let ao_eri = synthetic_ao_eri(n_bas);
    let c = synthetic_coefficients(n_bas, 2, 0.2);
    let d = synthetic_coefficients(n_bas, 3, 0.7);
    let mo = transform_ao_eri(&ao_eri.view(), [c.view(), d.view(), c.view(), d.view()]).unwrap();
    assert_eq!(mo.shape(), &[2, 3, 2, 3]);
    for ((p, q, r, s), value) in mo.indexed_iter() {
        let mut reference = 0.0;
        for m in 0..n_bas {
            for n in 0..n_bas {
                for l in 0..n_bas {
                    for sg in 0..n_bas {
                        reference += c[(m, p)]
                            * d[(n, q)]
                            * c[(l, r)]
                            * d[(sg, s)]
                            * ao_eri[(m, n, l, sg)];
                    }
                }
            }
        }
        assert_abs_diff_eq!(*value, reference, epsilon = 1e-12);
    }
}

#[test]
fn test_transform_ao_eri_empty_subspace() {
    let ao_eri = synthetic_ao_eri(3);
    let c = synthetic_coefficients(3, 2, 0.0);
    let empty = Array2::<f64>::zeros((3, 0));
    let mo =
        transform_ao_eri(&ao_eri.view(), [c.view(), empty.view(), c.view(), c.view()]).unwrap();
    assert_eq!(mo.shape(), &[2, 0, 2, 2]);
}

#[test]
fn test_transform_ao_eri_bad_shapes() {
    let ao_eri = synthetic_ao_eri(3);
    let c = synthetic_coefficients(4, 2, 0.0);
    assert!(transform_ao_eri(&ao_eri.view(), [c.view(), c.view(), c.view(), c.view()]).is_err());
}

#[test]
fn test_block_key_pattern() {
    let key = oovv_alpha();
    assert_eq!(key.labels()[0], (Spin::Alpha, OrbitalSpace::Occupied));
    assert_eq!(key.labels()[3], (Spin::Alpha, OrbitalSpace::Virtual));
    assert_eq!(key.to_string(), "(oo|vv) [aaaa]");
    assert!(BlockKey::from_pattern("ovv").is_err());
    assert!(BlockKey::from_pattern("oxvv").is_err());
}

#[test]
fn test_compute_mo_eri_is_cached() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let first = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    let second = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(builder.backend().n_transforms.get(), 1);
    assert_eq!(builder.n_cached_blocks(), 1);
    assert_eq!(first.shape(), &[2, 2, 2, 2]);
}

#[test]
fn test_compute_mo_eri_bypassing_cache() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let cached = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    let fresh = builder.compute_mo_eri(&oovv_alpha(), false).unwrap();
    assert!(!Rc::ptr_eq(&cached, &fresh));
    assert_eq!(builder.backend().n_transforms.get(), 2);
    assert_arrays_close(&cached, &fresh, 1e-14);

    // The existing entry is kept.
    let again = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    assert!(Rc::ptr_eq(&cached, &again));
    assert_eq!(builder.n_cached_blocks(), 1);
}

#[test]
fn test_compute_mo_eri_uncached_request_populates_cache() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let fresh = builder.compute_mo_eri(&oovv_alpha(), false).unwrap();
    assert!(builder.is_cached(&oovv_alpha()));
    let cached = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    assert!(Rc::ptr_eq(&fresh, &cached));
}

#[test]
fn test_flush_forces_recomputation() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let before = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    builder.flush();
    builder.flush();
    assert_eq!(builder.n_cached_blocks(), 0);
    let after = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    assert_eq!(builder.backend().n_transforms.get(), 2);
    assert_arrays_close(&before, &after, 1e-14);
}

#[test]
fn test_restricted_spin_labels_share_blocks() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 3, 1));
    let alpha = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    let mixed = BlockKey::new([
        (Spin::Beta, OrbitalSpace::Occupied),
        (Spin::Beta, OrbitalSpace::Occupied),
        (Spin::Alpha, OrbitalSpace::Virtual),
        (Spin::Alpha, OrbitalSpace::Virtual),
    ]);
    let beta = builder.compute_mo_eri(&mixed, true).unwrap();
    assert!(Rc::ptr_eq(&alpha, &beta));
    assert_eq!(builder.cached_keys(), vec![oovv_alpha()]);
}

#[test]
fn test_unrestricted_spin_labels_are_distinct() {
    let mut builder = EriBuilder::new(CountingBackend::unrestricted(4, 3, 2, 1));
    let alpha = builder.compute_mo_eri(&oovv_alpha(), true).unwrap();
    let beta_key = BlockKey::new([
        (Spin::Beta, OrbitalSpace::Occupied),
        (Spin::Beta, OrbitalSpace::Occupied),
        (Spin::Beta, OrbitalSpace::Virtual),
        (Spin::Beta, OrbitalSpace::Virtual),
    ]);
    let beta = builder.compute_mo_eri(&beta_key, true).unwrap();
    assert_eq!(alpha.shape(), &[2, 2, 1, 1]);
    assert_eq!(beta.shape(), &[1, 1, 2, 2]);
    assert_eq!(builder.n_cached_blocks(), 2);
}

#[test]
fn test_coefficient_quadruple_shapes() {
    let builder = EriBuilder::new(CountingBackend::unrestricted(5, 4, 3, 1));
    let key = BlockKey::new([
        (Spin::Alpha, OrbitalSpace::Occupied),
        (Spin::Alpha, OrbitalSpace::Virtual),
        (Spin::Beta, OrbitalSpace::Occupied),
        (Spin::Beta, OrbitalSpace::Virtual),
    ]);
    let quadruple = builder.coefficient_quadruple(&key).unwrap();
    let shapes = quadruple.iter().map(|c| c.dim()).collect::<Vec<_>>();
    assert_eq!(shapes, vec![(5, 3), (5, 1), (5, 1), (5, 3)]);
    assert_eq!(
        builder.backend().coefficients_virtual_beta().unwrap().dim(),
        (5, 3)
    );
}

#[test]
fn test_full_tensor_matches_brute_force_restricted() {
    let backend = CountingBackend::restricted(3, 3, 1);
    let reference = brute_force_antisymmetrised(&backend);
    let mut builder = EriBuilder::new(backend);
    let full = builder.build_full_eri_tensor().unwrap();
    assert_arrays_close(&full, &reference, 1e-11);
}

#[test]
fn test_full_tensor_matches_brute_force_unrestricted() {
    let backend = CountingBackend::unrestricted(4, 3, 2, 1);
    let reference = brute_force_antisymmetrised(&backend);
    let mut builder = EriBuilder::new(backend);
    let full = builder.build_full_eri_tensor().unwrap();
    assert_arrays_close(&full, &reference, 1e-11);
}

#[test]
fn test_full_tensor_antisymmetry() {
    let mut builder = EriBuilder::new(CountingBackend::unrestricted(4, 4, 2, 1));
    let full = builder.build_full_eri_tensor().unwrap();
    let swapped_bra = full.view().permuted_axes([1, 0, 2, 3]).to_owned();
    let swapped_ket = full.view().permuted_axes([0, 1, 3, 2]).to_owned();
    assert_arrays_close(&full, &(-&swapped_bra), 1e-12);
    assert_arrays_close(&full, &(-&swapped_ket), 1e-12);
}

#[test]
fn test_fill_slice_reuses_blocks() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let mut out = Array4::<f64>::zeros((2, 2, 2, 2));
    builder
        .fill_slice(&[0..2, 0..2, 2..4, 2..4], out.view_mut())
        .unwrap();
    let n_after_first = builder.backend().n_transforms.get();
    let mut again = Array4::<f64>::from_elem((2, 2, 2, 2), 7.0);
    builder
        .fill_slice(&[0..2, 0..2, 2..4, 2..4], again.view_mut())
        .unwrap();
    assert_eq!(builder.backend().n_transforms.get(), n_after_first);
    assert_arrays_close(&out, &again, 0.0);
}

#[test]
fn test_fill_slice_rejects_bad_requests() {
    let mut builder = EriBuilder::new(CountingBackend::restricted(4, 4, 2));
    let mut out = Array4::<f64>::zeros((2, 2, 2, 2));
    let err = builder
        .fill_slice(&[0..2, 0..2, 2..4, 7..9], out.view_mut())
        .unwrap_err();
    assert!(err.downcast_ref::<InvalidBlockRequest>().is_some());

    let err = builder
        .fill_slice(&[0..2, 0..2, 2..4, 2..5], out.view_mut())
        .unwrap_err();
    assert!(err.downcast_ref::<InvalidBlockRequest>().is_some());

    let mut empty = Array4::<f64>::zeros((0, 2, 2, 2));
    builder
        .fill_slice(&[3..3, 0..2, 2..4, 2..4], empty.view_mut())
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn test_fill_slice_agrees_with_full_tensor(
        bounds in proptest::collection::vec((0usize..=6, 0usize..=6), 4),
    ) {
        let mut builder = EriBuilder::new(CountingBackend::unrestricted(3, 3, 2, 1));
        let full = builder.build_full_eri_tensor().unwrap();
        let ranges = bounds
            .iter()
            .map(|&(a, b)| a.min(b)..a.max(b))
            .collect::<Vec<_>>();
        let ranges = [
            ranges[0].clone(),
            ranges[1].clone(),
            ranges[2].clone(),
            ranges[3].clone(),
        ];
        let mut out = Array4::<f64>::zeros((
            ranges[0].len(),
            ranges[1].len(),
            ranges[2].len(),
            ranges[3].len(),
        ));
        builder.fill_slice(&ranges, out.view_mut()).unwrap();
        let expected = full.slice(s![
            ranges[0].clone(),
            ranges[1].clone(),
            ranges[2].clone(),
            ranges[3].clone()
        ]);
        let max_diff = Zip::from(&out)
            .and(&expected)
            .fold(0.0f64, |acc, x, y| acc.max((x - y).abs()));
        prop_assert!(max_diff < 1e-12);
    }
}
