//! Driver for validating sliced antisymmetrised ERIs against the full-tensor path.

use std::fmt;
use std::ops::Range;

use anyhow::{self, ensure, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use ndarray::{Array4, Zip};
use serde::{Deserialize, Serialize};

use crate::drivers::HfpDriver;
use crate::io::format::{hfp_error, hfp_output, log_subtitle, log_title, nice_bool, HfpOutput};
use crate::orbitals::{OrbitalSpace, Spin};
use crate::provider::HartreeFockProvider;

#[cfg(test)]
#[path = "eri_consistency_tests.rs"]
mod eri_consistency_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    1e-10
}

fn default_block_patterns() -> Vec<String> {
    ["oooo", "ooov", "oovv", "ovov", "ovvv", "vvvv"]
        .iter()
        .map(|pattern| pattern.to_string())
        .collect()
}

/// Structure containing control parameters for the ERI consistency check.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct EriConsistencyParams {
    /// The largest absolute deviation tolerated between the two ERI paths.
    #[builder(default = "1e-10")]
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// The blocks to be compared, each given as four subspace labels in physicist order, such as
    /// `oovv` for $`\langle ij \Vert ab \rangle`$.
    #[builder(default = "default_block_patterns()")]
    #[serde(default = "default_block_patterns")]
    pub block_patterns: Vec<String>,

    /// Boolean indicating if every spin combination of each block is compared. If `false`, only
    /// the all-$`\alpha`$ combination is.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub all_spin_blocks: bool,
}

impl EriConsistencyParams {
    /// Returns a builder to construct a [`EriConsistencyParams`] structure.
    pub fn builder() -> EriConsistencyParamsBuilder {
        EriConsistencyParamsBuilder::default()
    }
}

impl Default for EriConsistencyParams {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            block_patterns: default_block_patterns(),
            all_spin_blocks: true,
        }
    }
}

impl fmt::Display for EriConsistencyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deviation threshold: {:.3e}", self.threshold)?;
        writeln!(f, "Blocks: {}", self.block_patterns.join(", "))?;
        writeln!(f, "All spin blocks: {}", nice_bool(self.all_spin_blocks))?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// The comparison outcome for one block.
#[derive(Clone, Debug)]
pub struct BlockDeviation {
    /// The block label, such as `oovv [abab]`.
    pub label: String,

    /// The spin-orbital ranges of the block.
    pub ranges: [Range<usize>; 4],

    /// The largest absolute deviation between the two ERI paths over the block.
    pub max_deviation: f64,
}

/// Structure to contain the ERI consistency check results.
#[derive(Clone, Builder, Debug)]
pub struct EriConsistencyResult<'a> {
    /// The control parameters used to obtain this set of results.
    parameters: &'a EriConsistencyParams,

    /// The comparison outcome for each block, in the order compared.
    pub deviations: Vec<BlockDeviation>,
}

impl<'a> EriConsistencyResult<'a> {
    fn builder() -> EriConsistencyResultBuilder<'a> {
        EriConsistencyResultBuilder::default()
    }

    /// Returns the largest deviation over all compared blocks.
    pub fn max_deviation(&self) -> f64 {
        self.deviations
            .iter()
            .map(|deviation| deviation.max_deviation)
            .fold(0.0, f64::max)
    }

    /// Returns `true` if no block deviates by more than the threshold.
    pub fn passed(&self) -> bool {
        self.deviations
            .iter()
            .all(|deviation| deviation.max_deviation <= self.parameters.threshold)
    }
}

// ------
// Driver
// ------

/// Driver comparing [`HartreeFockProvider::fill_eri_antisymmetrized_block`] with
/// [`HartreeFockProvider::fill_eri_full_tensor`] block by block.
///
/// All provider caches are flushed once the comparison is over.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct EriConsistencyDriver<'a, P: HartreeFockProvider + ?Sized> {
    /// The control parameters for the check.
    parameters: &'a EriConsistencyParams,

    /// The provider whose ERI paths are compared.
    provider: &'a mut P,

    /// The check results.
    #[builder(setter(skip), default = "None")]
    result: Option<EriConsistencyResult<'a>>,
}

impl<'a, P: HartreeFockProvider + ?Sized> EriConsistencyDriver<'a, P> {
    /// Returns a builder to construct a [`EriConsistencyDriver`] structure.
    pub fn builder() -> EriConsistencyDriverBuilder<'a, P> {
        EriConsistencyDriverBuilder::default()
    }

    /// Enumerates the labelled blocks requested by the parameters.
    fn blocks(&self) -> Result<Vec<(String, [Range<usize>; 4])>, anyhow::Error> {
        let desc = *self.provider.descriptor();
        let spin_combinations = if self.parameters.all_spin_blocks {
            (0..4)
                .map(|_| Spin::ALL.iter().copied())
                .multi_cartesian_product()
                .collect_vec()
        } else {
            vec![vec![Spin::Alpha; 4]]
        };
        self.parameters
            .block_patterns
            .iter()
            .map(|pattern| {
                let spaces = pattern
                    .chars()
                    .map(OrbitalSpace::from_label)
                    .collect::<Result<Vec<_>, _>>()?;
                ensure!(
                    spaces.len() == 4,
                    "A block pattern needs exactly four subspace labels, but `{pattern}` has {}.",
                    spaces.len()
                );
                Ok(spin_combinations
                    .iter()
                    .map(|spins| {
                        let label = format!("{pattern} [{}]", spins.iter().join(""));
                        let ranges = [0, 1, 2, 3]
                            .map(|i| desc.spin_orbital_range(spins[i], spaces[i]));
                        (label, ranges)
                    })
                    .collect_vec())
            })
            .flatten_ok()
            .collect()
    }

    /// Compares the two ERI paths over all requested blocks.
    fn compare_eris(&mut self) -> Result<(), anyhow::Error> {
        log_title("ERI Consistency Check");
        hfp_output!("");
        let params = self.parameters;
        params.log_output_display();

        let blocks = self.blocks()?;
        log_subtitle("Block deviations");
        hfp_output!("");
        hfp_output!("{}", "┈".repeat(44));
        hfp_output!(" {:<12}  {:>17}  {:>9}", "Block", "Shape", "Max dev.");
        hfp_output!("{}", "┈".repeat(44));
        let comparison = blocks
            .into_iter()
            .map(|(label, ranges)| {
                let shape = (
                    ranges[0].len(),
                    ranges[1].len(),
                    ranges[2].len(),
                    ranges[3].len(),
                );
                let mut sliced = Array4::<f64>::zeros(shape);
                self.provider
                    .fill_eri_antisymmetrized_block(&ranges, sliced.view_mut())?;
                let mut full = Array4::<f64>::zeros(shape);
                self.provider.fill_eri_full_tensor(&ranges, full.view_mut())?;
                let max_deviation = Zip::from(&sliced)
                    .and(&full)
                    .fold(0.0f64, |acc, x, y| acc.max((x - y).abs()));
                hfp_output!(
                    " {label:<12}  {:>17}  {max_deviation:>9.2e}",
                    format!("{}x{}x{}x{}", shape.0, shape.1, shape.2, shape.3)
                );
                Ok(BlockDeviation {
                    label,
                    ranges,
                    max_deviation,
                })
            })
            .collect::<Result<Vec<_>, anyhow::Error>>();
        self.provider.flush_cache();
        let deviations = comparison?;
        hfp_output!("{}", "┈".repeat(44));
        hfp_output!("");

        let result = EriConsistencyResult::builder()
            .parameters(params)
            .deviations(deviations)
            .build()?;
        let passed = result.passed();
        let max_deviation = result.max_deviation();
        self.result = Some(result);
        if passed {
            hfp_output!(
                "Sliced and full-tensor ERIs agree to {max_deviation:.3e} (threshold {:.3e}).",
                params.threshold
            );
            hfp_output!("");
            Ok(())
        } else {
            hfp_error!(
                "Sliced and full-tensor ERIs deviate by up to {max_deviation:.3e} (threshold {:.3e}).",
                params.threshold
            );
            Err(format_err!(
                "ERI consistency check failed with a maximum deviation of {max_deviation:.3e}."
            ))
        }
    }
}

impl<'a, P: HartreeFockProvider + ?Sized> HfpDriver for EriConsistencyDriver<'a, P> {
    type Params = EriConsistencyParams;

    type Outcome = EriConsistencyResult<'a>;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No ERI consistency check results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.compare_eris()
    }
}
