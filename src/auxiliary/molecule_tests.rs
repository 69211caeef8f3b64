use approx::assert_abs_diff_eq;
use nalgebra::Point3;

use crate::auxiliary::atom::{Atom, ElementMap, ANGSTROM_TO_BOHR};
use crate::auxiliary::molecule::{LengthUnit, Molecule};

const WATER_BOHR: &str = "3
water, psi4 test geometry
O 0 0 0
H 0 0 1.795239827225189
H 1.693194615993441 0 -0.599043184453037
";

#[test]
fn test_atom_from_xyz() {
    let emap = ElementMap::new();
    let atom = Atom::from_xyz("B 0.0 0.0 1.0", &emap, 1.0).unwrap();
    assert_eq!(atom.atomic_number, 5);
    assert_eq!(atom.atomic_symbol, "B");
    assert_abs_diff_eq!(atom.charge, 5.0);
    assert_abs_diff_eq!(atom.coordinates[2], 1.0);

    let atom_ang = Atom::from_xyz("B 0.0 0.0 1.0", &emap, ANGSTROM_TO_BOHR).unwrap();
    assert_abs_diff_eq!(atom_ang.coordinates[2], 1.889_726_124_6, epsilon = 1e-9);

    assert!(Atom::from_xyz("B 0.0 1.0", &emap, 1.0).is_err());
    assert!(Atom::from_xyz("Qq 0.0 0.0 1.0", &emap, 1.0).is_err());
    assert!(Atom::from_xyz("B 0.0 zero 1.0", &emap, 1.0).is_err());
}

#[test]
fn test_molecule_water_multipoles() {
    let mol = Molecule::from_xyz_str(WATER_BOHR, LengthUnit::Bohr).unwrap();
    assert_eq!(mol.natom(), 3);
    assert_eq!(mol.multiplicity, 1);
    assert_abs_diff_eq!(mol.nuclear_charge(), 10.0);
    assert_eq!(mol.n_electrons().unwrap(), 10);

    let dip = mol.nuclear_dipole();
    assert_abs_diff_eq!(dip[0], 1.693194615993441, epsilon = 1e-12);
    assert_abs_diff_eq!(dip[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        dip[2],
        1.795239827225189 - 0.599043184453037,
        epsilon = 1e-12
    );
}

#[test]
fn test_molecule_atom_count_mismatch() {
    let contents = "2\ncomment\nH 0 0 0\n";
    assert!(Molecule::from_xyz_str(contents, LengthUnit::Bohr).is_err());
    assert!(Molecule::from_xyz_str("", LengthUnit::Bohr).is_err());
}

#[test]
fn test_molecule_ghost_atom_charge() {
    let mut ghost = Atom::new("He", 2, Point3::new(0.0, 0.0, 3.0));
    ghost.charge = 0.0;
    let hydrogen = Atom::new("H", 1, Point3::new(0.0, 0.0, -1.0));
    let mol = Molecule::from_atoms(&[ghost, hydrogen], 0, 2).unwrap();
    assert_abs_diff_eq!(mol.nuclear_charge(), 1.0);
    assert_abs_diff_eq!(mol.nuclear_dipole()[2], -1.0);
    assert!(Molecule::from_atoms(&[], 0, 0).is_err());
}
