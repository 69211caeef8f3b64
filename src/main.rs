use std::path::PathBuf;
use std::process;

use anyhow::{self, format_err, Context};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use hfprovider::interfaces::cli::{log_heading, Cli};
use hfprovider::interfaces::input::Input;
use hfprovider::interfaces::InputHandle;
use hfprovider::io::read_hfp_yaml;

const OUTPUT_TARGET: &str = "hfprovider-output";

/// Configures `log4rs` so that main output goes to the console or to `output`, and everything
/// else at `warn` or above goes to the console.
fn init_logging(output: Option<&PathBuf>) -> Result<(), anyhow::Error> {
    let encoder = || Box::new(PatternEncoder::new("{m}{n}"));
    let output_appender = if let Some(path) = output {
        Appender::builder().build(
            "output",
            Box::new(
                FileAppender::builder()
                    .encoder(encoder())
                    .append(false)
                    .build(path)
                    .with_context(|| format!("Unable to create the output file `{}`", path.display()))?,
            ),
        )
    } else {
        Appender::builder().build(
            "output",
            Box::new(ConsoleAppender::builder().encoder(encoder()).build()),
        )
    };
    let stderr_appender = Appender::builder().build(
        "stderr",
        Box::new(
            ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new("[{l}] {t}: {m}{n}")))
                .target(log4rs::append::console::Target::Stderr)
                .build(),
        ),
    );
    let config = Config::builder()
        .appender(output_appender)
        .appender(stderr_appender)
        .logger(
            Logger::builder()
                .appender("output")
                .additive(false)
                .build(OUTPUT_TARGET, LevelFilter::Info),
        )
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
        .map_err(|err| format_err!(err))?;
    log4rs::init_config(config).map_err(|err| format_err!(err))?;
    Ok(())
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    init_logging(cli.output.as_ref())?;
    log_heading();
    let config = cli
        .config
        .as_ref()
        .ok_or_else(|| format_err!("No YAML input file given; use `--config <FILE>`."))?;
    let input = read_hfp_yaml::<Input, _>(config)
        .with_context(|| format!("Unable to parse the YAML input file `{}`", config.display()))?;
    input.handle()
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:?}");
        process::exit(1);
    }
}
