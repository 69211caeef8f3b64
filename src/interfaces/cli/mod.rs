//! Command-line interface of the `hfprovider` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::io::format::hfp_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted `hfprovider` heading to the `hfprovider-output` logger.
pub fn log_heading() {
    let version = if let Some(ver) = VERSION {
        format!("v{ver}")
    } else {
        "v unknown".to_string()
    };
    hfp_output!("╭─────────────────────────────────────────────────────────────────────────────────────────────────────╮");
    hfp_output!("│                                                                                                     │");
    hfp_output!("│   hh         ff    ppppp                               ii      dd                                   │");
    hfp_output!("│   hh        ff     pp  pp                                      dd                                   │");
    hfp_output!("│   hhhhh   ffffff   ppppp   rr rr   oooo   vv   vv     ii    dddd   eeee   rr rr                     │");
    hfp_output!("│   hh  hh    ff     pp      rrr    oo  oo   vv vv      ii   dd dd  eeeeee  rrr                       │");
    hfp_output!("│   hh  hh    ff     pp      rr      oooo     vvv       ii    dddd   eeee   rr                        │");
    hfp_output!("│                                                                                                     │");
    hfp_output!("│   Hartree-Fock reference data for many-body methods                                   {version:>13} │");
    hfp_output!("╰─────────────────────────────────────────────────────────────────────────────────────────────────────╯");
    hfp_output!("");
}

/// Command-line arguments of the `hfprovider` binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML input file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the output file. If not given, output is written to the console.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
