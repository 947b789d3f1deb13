mod ui;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use splat_merge::{Device, MergeArgs, MergeReport};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Merge multiple 3D Gaussian Splatting .ply models into one output."
)]
pub struct Cli {
    #[clap(flatten)]
    pub merge: MergeArgs,

    /// Print the merge report as JSON after the summary.
    #[arg(long, default_value = "false")]
    pub report_json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    args: &'a MergeArgs,
    device: String,
    report: &'a MergeReport,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Stdout)
            .build();
    let progress = ui::MergeProgress::new(cli.merge.input.len(), logger)?;

    let device = Device::resolve(&cli.merge.device);
    let config = cli.merge.clone().into_config();

    let result = splat_merge::merge_with(&config, |msg| progress.update(&msg));
    progress.finish();
    let report = result.context("Failed to merge splats")?;

    println!(
        "Merged {} files ({} skipped), {} points total -> {}",
        report.files_loaded(),
        report.files_skipped(),
        report.total_points,
        report.output.display()
    );

    if cli.report_json {
        let json = JsonReport {
            args: &cli.merge,
            device: device.to_string(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    Ok(())
}
