use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use punctadf::batch;
use punctadf::data::image::Channel;
use punctadf::data::run::RunConfig;

/// Batch punctum analysis over a cropped neurite image set.
#[derive(Parser, Debug)]
#[command(name = "punctadf", version)]
struct Args {
    /// Directory holding the prep's Metadata/ and Images/ trees
    #[arg(long)]
    prep_dir: PathBuf,

    /// Cell-culture prep identifier, e.g. CCP_127
    #[arg(long)]
    prep_id: String,

    /// Neurite set identifier, e.g. NS_02.01
    #[arg(long)]
    ns_id: String,

    /// Color channel to analyze
    #[arg(long, value_enum, default_value_t = Channel::Green)]
    channel: Channel,

    /// Output root for timestamped run directories, defaults to <prep_dir>/Analysis
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Note stored with the analysis run
    #[arg(long, default_value = "")]
    note: String,

    /// Worker threads for the analysis pool
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let output_root = args
        .output_root
        .unwrap_or_else(|| args.prep_dir.join("Analysis"));
    let config = RunConfig {
        prep_dir: args.prep_dir,
        prep_id: args.prep_id,
        ns_id: args.ns_id,
        channel: args.channel,
        output_root,
        note: args.note,
        num_threads: args.threads,
    };

    let summary = batch::run(&config)?;
    println!(
        "analyzed {} images ({} skipped), results in {}",
        summary.analyzed,
        summary.skipped,
        summary.run_dir.display()
    );
    Ok(())
}
