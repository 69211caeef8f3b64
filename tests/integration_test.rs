use approx::assert_abs_diff_eq;
use nalgebra::Point3;
use ndarray::{array, Array1, Array2, Array3, Array4, Zip};

use hfprovider::auxiliary::atom::Atom;
use hfprovider::auxiliary::molecule::Molecule;
use hfprovider::importer::{
    import_scf, ImportScf, ScfSource, ScfType, UnsupportedReferenceError, WavefunctionKind,
};
use hfprovider::interfaces::custom::{CustomScfResult, ScfOptions};
use hfprovider::io::{write_hfp_binary, HfpFileType};
use hfprovider::provider::HartreeFockProvider;

/// A closed-shell model of H₂ in a basis of three functions.
fn h2_scf(kind: WavefunctionKind, scf_type: ScfType, n_irreps: usize) -> CustomScfResult {
    let n_bas = 3;
    let atoms = [
        Atom::new("H", 1, Point3::new(0.0, 0.0, -0.7)),
        Atom::new("H", 1, Point3::new(0.0, 0.0, 0.7)),
    ];
    CustomScfResult::builder()
        .wavefunction_kind(kind)
        .n_irreps(n_irreps)
        .options(
            ScfOptions::builder()
                .scf_type(scf_type)
                .energy_convergence(1e-11)
                .orbital_gradient_convergence(1e-8)
                .build()
                .unwrap(),
        )
        .molecule(Molecule::from_atoms(&atoms, 0, 1).unwrap())
        .energy(-1.1167143)
        .n_alpha(1)
        .n_beta(1)
        .coefficients(Array2::from_shape_fn((n_bas, n_bas), |(m, p)| {
            ((m + 2) as f64 * 0.53 - (p + 1) as f64 * 0.29).cos()
        }))
        .orbital_energies(array![-0.5782, 0.6703, 1.1512])
        .ao_eri(Array4::from_shape_fn((n_bas, n_bas, n_bas, n_bas), |(m, n, l, s)| {
            let (a, b) = ((m + n) as f64, (l + s) as f64);
            0.8 / (1.0 + a + b) + 0.02 * ((m * n) as f64 + (l * s) as f64)
        }))
        .ao_dipole(Array3::from_shape_fn((3, n_bas, n_bas), |(k, m, n)| {
            0.05 * (k + m + n) as f64
        }))
        .build()
        .unwrap()
}

#[test]
fn test_archive_import_gives_restricted_provider() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = std::env::temp_dir().join(format!("hfprovider_integration_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let name = dir.join("h2");
    write_hfp_binary(&name, HfpFileType::Scf, &h2_scf(WavefunctionKind::Rhf, ScfType::Pk, 1))
        .unwrap();

    let mut provider = import_scf(&ScfSource::Archive(name)).unwrap();
    assert!(provider.is_restricted());
    assert_eq!(provider.backend_name(), "custom");
    assert_eq!(provider.n_orbs_alpha(), 3);
    assert_eq!(provider.n_basis_functions(), 3);
    assert_abs_diff_eq!(provider.convergence_threshold(), 1e-8);
    assert_abs_diff_eq!(provider.nuclear_multipole(0).unwrap()[0], 2.0);
    assert_abs_diff_eq!(provider.nuclear_multipole(1).unwrap()[2], 0.0, epsilon = 1e-14);

    let mut energies = Array1::<f64>::zeros(6);
    provider.fill_orbital_energies(energies.view_mut()).unwrap();
    assert_eq!(energies[0], energies[3]);

    let mut sliced = Array4::<f64>::zeros((1, 1, 2, 2));
    provider
        .fill_eri_antisymmetrized_block(&[0..1, 3..4, 1..3, 4..6], sliced.view_mut())
        .unwrap();
    let mut full = Array4::<f64>::zeros((1, 1, 2, 2));
    provider
        .fill_eri_full_tensor(&[0..1, 3..4, 1..3, 4..6], full.view_mut())
        .unwrap();
    Zip::from(&sliced)
        .and(&full)
        .for_each(|x, y| assert_abs_diff_eq!(*x, *y, epsilon = 1e-10));

    let dipole = provider
        .operator_integrals()
        .electric_dipole()
        .unwrap()
        .clone();
    assert_abs_diff_eq!(dipole[2][(1, 2)], -0.25, epsilon = 1e-14);
    provider.flush_cache();
}

#[test]
fn test_import_rejects_unsupported_references() {
    let rejected = [
        h2_scf(WavefunctionKind::Other("RKS".to_string()), ScfType::Pk, 1),
        h2_scf(WavefunctionKind::Uhf, ScfType::Pk, 1),
        h2_scf(WavefunctionKind::Rhf, ScfType::Df, 1),
        h2_scf(WavefunctionKind::Rhf, ScfType::DiskDf, 1),
        h2_scf(WavefunctionKind::Rhf, ScfType::MemDf, 1),
        h2_scf(WavefunctionKind::Rhf, ScfType::Cd, 1),
        h2_scf(WavefunctionKind::Rhf, ScfType::Pk, 4),
    ];
    for scf in rejected {
        let err = scf.import_scf().err().unwrap();
        assert!(err.downcast_ref::<UnsupportedReferenceError>().is_some());
    }
    for scf_type in [ScfType::Pk, ScfType::Direct, ScfType::OutOfCore] {
        assert!(h2_scf(WavefunctionKind::Rhf, scf_type, 1).import_scf().is_ok());
    }
}
