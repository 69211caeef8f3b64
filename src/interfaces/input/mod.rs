//! `hfprovider` YAML input files.

use anyhow::{self, Context};
use serde::{Deserialize, Serialize};

use crate::drivers::eri_consistency::{EriConsistencyDriver, EriConsistencyParams};
use crate::drivers::provider_summary::{ProviderSummaryDriver, ProviderSummaryParams};
use crate::drivers::HfpDriver;
use crate::importer::{import_scf, ScfSource};
use crate::interfaces::InputHandle;
use crate::io::format::{log_macsec_begin, log_macsec_end, hfp_output};


/// A structure containing `hfprovider` input parameters which can be serialised into and
/// deserialised from a YAML input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    /// Specification of where the SCF result is imported from.
    pub source: ScfSource,

    /// Parameters for the provider summary. If `None`, no summary is written.
    ///
    /// # Default
    ///
    /// If not specified, this will be taken to be `None`.
    #[serde(default)]
    pub summary: Option<ProviderSummaryParams>,

    /// Parameters for the ERI consistency check. If `None`, no check is performed.
    ///
    /// # Default
    ///
    /// If not specified, this will be taken to be `None`.
    #[serde(default)]
    pub eri_consistency: Option<EriConsistencyParams>,
}

impl Default for Input {
    fn default() -> Self {
        Input {
            source: ScfSource::default(),
            summary: Some(ProviderSummaryParams::default()),
            eri_consistency: Some(EriConsistencyParams::default()),
        }
    }
}

impl InputHandle for Input {
    fn handle(&self) -> Result<(), anyhow::Error> {
        log_macsec_begin("Reference import");
        hfp_output!("");
        let mut provider = import_scf(&self.source)
            .with_context(|| "Unable to import the SCF reference specified in the input")?;
        hfp_output!(
            "Imported a reference from the `{}` backend.",
            provider.backend_name()
        );
        hfp_output!("");
        log_macsec_end("Reference import");
        hfp_output!("");

        if let Some(summary_params) = self.summary.as_ref() {
            log_macsec_begin("Provider summary");
            hfp_output!("");
            let mut summary_driver = ProviderSummaryDriver::builder()
                .parameters(summary_params)
                .provider(provider.as_ref())
                .build()
                .with_context(|| "Unable to construct a provider summary driver")?;
            summary_driver
                .run()
                .with_context(|| "Unable to run the provider summary driver successfully")?;
            log_macsec_end("Provider summary");
            hfp_output!("");
        }

        if let Some(eri_params) = self.eri_consistency.as_ref() {
            log_macsec_begin("ERI consistency check");
            hfp_output!("");
            let mut eri_driver = EriConsistencyDriver::builder()
                .parameters(eri_params)
                .provider(provider.as_mut())
                .build()
                .with_context(|| "Unable to construct an ERI consistency driver")?;
            eri_driver
                .run()
                .with_context(|| "Unable to run the ERI consistency driver successfully")?;
            log_macsec_end("ERI consistency check");
            hfp_output!("");
        }
        Ok(())
    }
}
