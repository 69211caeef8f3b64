//! Driver for summarising the reference data exposed by a Hartree–Fock provider.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::drivers::HfpDriver;
use crate::io::format::{hfp_output, log_subtitle, log_title, nice_bool, HfpOutput};
use crate::orbitals::{OrbitalDescriptor, OrbitalSpace, Spin};
use crate::provider::HartreeFockProvider;


// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

fn default_true() -> bool {
    true
}

/// Structure containing control parameters for the provider summary.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct ProviderSummaryParams {
    /// Boolean indicating if the orbital energies and occupations are tabulated.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub write_orbital_table: bool,
}

impl ProviderSummaryParams {
    /// Returns a builder to construct a [`ProviderSummaryParams`] structure.
    pub fn builder() -> ProviderSummaryParamsBuilder {
        ProviderSummaryParamsBuilder::default()
    }
}

impl Default for ProviderSummaryParams {
    fn default() -> Self {
        Self {
            write_orbital_table: true,
        }
    }
}

impl fmt::Display for ProviderSummaryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Write orbital table: {}",
            nice_bool(self.write_orbital_table)
        )?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// Structure to contain the provider summary.
#[derive(Clone, Builder, Debug)]
pub struct ProviderSummaryResult<'a> {
    /// The control parameters used to obtain this summary.
    parameters: &'a ProviderSummaryParams,

    /// The identifier of the backend.
    pub backend_name: String,

    /// The converged SCF energy.
    pub scf_energy: f64,

    /// The spin multiplicity of the reference.
    pub spin_multiplicity: usize,

    /// The tolerance to which the SCF quantities can be trusted.
    pub convergence_threshold: f64,

    /// The orbital counts of the reference.
    pub descriptor: OrbitalDescriptor,

    /// The total nuclear charge.
    pub nuclear_charge: f64,

    /// The nuclear dipole moment.
    pub nuclear_dipole: Array1<f64>,

    /// The stacked orbital energies.
    pub orbital_energies: Array1<f64>,

    /// The stacked orbital occupations.
    pub occupations: Array1<f64>,
}

impl<'a> ProviderSummaryResult<'a> {
    fn builder() -> ProviderSummaryResultBuilder<'a> {
        ProviderSummaryResultBuilder::default()
    }

    /// Returns the control parameters used to obtain this summary.
    pub fn parameters(&self) -> &ProviderSummaryParams {
        self.parameters
    }

    /// Returns the total occupation, which equals the number of electrons.
    pub fn total_occupation(&self) -> f64 {
        self.occupations.sum()
    }
}

// ------
// Driver
// ------

/// Driver for summarising a Hartree–Fock provider.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct ProviderSummaryDriver<'a, P: HartreeFockProvider + ?Sized> {
    /// The control parameters for the summary.
    parameters: &'a ProviderSummaryParams,

    /// The provider to be summarised.
    provider: &'a P,

    /// The summary.
    #[builder(setter(skip), default = "None")]
    result: Option<ProviderSummaryResult<'a>>,
}

impl<'a, P: HartreeFockProvider + ?Sized> ProviderSummaryDriver<'a, P> {
    /// Returns a builder to construct a [`ProviderSummaryDriver`] structure.
    pub fn builder() -> ProviderSummaryDriverBuilder<'a, P> {
        ProviderSummaryDriverBuilder::default()
    }

    /// Gathers and logs the reference data.
    fn summarise(&mut self) -> Result<(), anyhow::Error> {
        log_title("Hartree-Fock Provider Summary");
        hfp_output!("");
        let params = self.parameters;
        params.log_output_display();

        let provider = self.provider;
        let desc = *provider.descriptor();
        let n_orbs = desc.n_orbs();
        let mut orbital_energies = Array1::<f64>::zeros(n_orbs);
        provider.fill_orbital_energies(orbital_energies.view_mut())?;
        let mut occupations = Array1::<f64>::zeros(n_orbs);
        provider.fill_occupations(occupations.view_mut())?;
        let nuclear_charge = provider
            .nuclear_multipole(0)?
            .first()
            .copied()
            .ok_or_else(|| format_err!("Empty nuclear charge multipole."))?;
        let nuclear_dipole = provider.nuclear_multipole(1)?;

        log_subtitle("Reference");
        hfp_output!("");
        hfp_output!("Backend: {}", provider.backend_name());
        hfp_output!("Restricted: {}", nice_bool(provider.is_restricted()));
        hfp_output!("SCF energy: {:.10}", provider.scf_energy());
        hfp_output!("Spin multiplicity: {}", provider.spin_multiplicity());
        hfp_output!(
            "Convergence threshold: {:.3e}",
            provider.convergence_threshold()
        );
        hfp_output!("Orbitals: {desc}");
        hfp_output!("Nuclear charge: {nuclear_charge:.6}");
        hfp_output!(
            "Nuclear dipole: [{:+.6}, {:+.6}, {:+.6}]",
            nuclear_dipole[0],
            nuclear_dipole[1],
            nuclear_dipole[2]
        );
        hfp_output!("");

        if params.write_orbital_table {
            log_subtitle("Orbitals");
            hfp_output!("");
            hfp_output!("{}", "┈".repeat(42));
            hfp_output!(
                " {:>5}  {:>4}  {:>5}  {:>14}  {:>7}",
                "Index",
                "Spin",
                "Space",
                "Energy",
                "Occ."
            );
            hfp_output!("{}", "┈".repeat(42));
            for spin in Spin::ALL {
                for space in OrbitalSpace::ALL {
                    for f in desc.spin_orbital_range(spin, space) {
                        hfp_output!(
                            " {f:>5}  {:>4}  {:>5}  {:>+14.8}  {:>7.4}",
                            spin.to_string(),
                            space.to_string(),
                            orbital_energies[f],
                            occupations[f]
                        );
                    }
                }
            }
            hfp_output!("{}", "┈".repeat(42));
            hfp_output!("");
        }

        let result = ProviderSummaryResult::builder()
            .parameters(params)
            .backend_name(provider.backend_name().to_string())
            .scf_energy(provider.scf_energy())
            .spin_multiplicity(provider.spin_multiplicity())
            .convergence_threshold(provider.convergence_threshold())
            .descriptor(desc)
            .nuclear_charge(nuclear_charge)
            .nuclear_dipole(nuclear_dipole)
            .orbital_energies(orbital_energies)
            .occupations(occupations)
            .build()?;
        self.result = Some(result);
        Ok(())
    }
}

impl<'a, P: HartreeFockProvider + ?Sized> HfpDriver for ProviderSummaryDriver<'a, P> {
    type Params = ProviderSummaryParams;

    type Outcome = ProviderSummaryResult<'a>;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No provider summary found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.summarise()
    }
}
