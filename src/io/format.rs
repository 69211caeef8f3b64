//! Nice `hfprovider` output formatting.

use std::fmt;

use log;

const HFP_BANNER_LENGTH: usize = 103;

/// Logs an error to the `hfprovider-output` logger.
macro_rules! hfp_error {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::error!($fmt, $($($arg)*)?);
        log::error!(target: "hfprovider-output", $fmt, $($($arg)*)?);
    }
}

/// Logs a warning to the `hfprovider-output` logger.
macro_rules! hfp_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "hfprovider-output", $fmt, $($($arg)*)?); }
}

/// Logs a main output line to the `hfprovider-output` logger.
macro_rules! hfp_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "hfprovider-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {hfp_error, hfp_output, hfp_warn};

/// Logs a nicely formatted section title to the `hfprovider-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(HFP_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    hfp_output!("┌──{bar}──┐");
    hfp_output!("│§ {title:^length$} §│");
    hfp_output!("└──{bar}──┘");
}

/// Writes a nicely formatted subtitle.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    let length = subtitle.chars().count();
    let bar = "═".repeat(length);
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{bar}")?;
    Ok(())
}

/// Logs a nicely formatted subtitle to the `hfprovider-output` logger.
pub(crate) fn log_subtitle(subtitle: &str) {
    let length = subtitle.chars().count();
    let bar = "═".repeat(length);
    hfp_output!("{}", subtitle);
    hfp_output!("{}", bar);
}

/// Logs a nicely formatted macro-section beginning to the `hfprovider-output` logger.
pub(crate) fn log_macsec_begin(sectitle: &str) {
    let width = HFP_BANNER_LENGTH - 14;
    let sectitle_space = sectitle.to_string() + " ";
    hfp_output!("❬❬❬❬❬ [Begin] {sectitle_space:❬<width$}");
}

/// Logs a nicely formatted macro-section ending to the `hfprovider-output` logger.
pub(crate) fn log_macsec_end(sectitle: &str) {
    let width = HFP_BANNER_LENGTH - 14;
    let sectitle_space = sectitle.to_string() + " ";
    hfp_output!("❭❭❭❭❭ [ End ] {sectitle_space:❭<width$}");
}

/// Turns a boolean into a string of `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// A trait for logging `hfprovider` outputs nicely.
pub(crate) trait HfpOutput: fmt::Debug + fmt::Display {
    /// Logs display output nicely.
    fn log_output_display(&self) {
        let lines = self.to_string();
        lines.lines().for_each(|line| {
            hfp_output!("{line}");
        })
    }
}

// Blanket implementation
impl<T> HfpOutput for T where T: fmt::Debug + fmt::Display {}
