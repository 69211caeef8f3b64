use nalgebra::Point3;
use ndarray::{array, Array2, Array3, Array4};

use crate::auxiliary::atom::Atom;
use crate::auxiliary::molecule::Molecule;
use crate::importer::{ScfType, WavefunctionKind};
use crate::interfaces::custom::{CustomScfResult, ScfOptions};

pub(crate) const N_BAS: usize = 4;

/// Lithium hydride along the z axis, in bohr.
pub(crate) fn lih() -> Molecule {
    let atoms = [
        Atom::new("Li", 3, Point3::new(0.0, 0.0, 0.0)),
        Atom::new("H", 1, Point3::new(0.0, 0.0, 3.0)),
    ];
    Molecule::from_atoms(&atoms, 0, 1).unwrap()
}

/// Integrals with the eight-fold permutational symmetry of real orbitals.
pub(crate) fn model_ao_eri(n_bas: usize) -> Array4<f64> {
    Array4::from_shape_fn((n_bas, n_bas, n_bas, n_bas), |(m, n, l, s)| {
        let (a, b) = ((m + n) as f64, (l + s) as f64);
        let (ab, cd) = ((m * n) as f64, (l * s) as f64);
        1.0 / (1.0 + a + b) + 0.01 * (ab + cd) + 0.001 * a * b
    })
}

pub(crate) fn model_ao_dipole(n_bas: usize) -> Array3<f64> {
    Array3::from_shape_fn((3, n_bas, n_bas), |(k, m, n)| {
        0.1 * (k + 1) as f64 * ((m + n) as f64 + 0.5) + if m == n { k as f64 } else { 0.0 }
    })
}

pub(crate) fn model_coefficients(n_bas: usize, n_mo: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_bas, n_mo), |(m, p)| {
        ((m + 1) as f64 * 0.37 + (p + 1) as f64 * 0.91).sin()
    })
}

pub(crate) fn model_options(scf_type: ScfType) -> ScfOptions {
    ScfOptions::builder()
        .scf_type(scf_type)
        .energy_convergence(1e-12)
        .orbital_gradient_convergence(1e-8)
        .build()
        .unwrap()
}

/// A closed-shell model of lithium hydride in a basis of four functions.
pub(crate) fn lih_scf(kind: WavefunctionKind, scf_type: ScfType, n_irreps: usize) -> CustomScfResult {
    CustomScfResult::builder()
        .wavefunction_kind(kind)
        .n_irreps(n_irreps)
        .options(model_options(scf_type))
        .molecule(lih())
        .energy(-7.8633576215)
        .n_alpha(2)
        .n_beta(2)
        .coefficients(model_coefficients(N_BAS, N_BAS))
        .orbital_energies(array![-2.4452, -0.3018, 0.0078, 0.1639])
        .ao_eri(model_ao_eri(N_BAS))
        .ao_dipole(model_ao_dipole(N_BAS))
        .build()
        .unwrap()
}

pub(crate) fn lih_rhf() -> CustomScfResult {
    lih_scf(WavefunctionKind::Rhf, ScfType::Pk, 1)
}
