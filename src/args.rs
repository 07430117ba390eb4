use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path to scenario settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Directory for the simulation results.
    #[clap(long, short, default_value = "./")]
    pub outdir: String,

    /// Path to log file.
    #[clap(long, default_value = "compartmental.log")]
    pub log_file: String,

    /// Increase log verbosity (-v debug, -vv trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Number of ensemble runs, overrides the settings.
    #[clap(long)]
    pub runs: Option<usize>,

    /// Seed of the first ensemble run, overrides the settings.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Disable progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,

    /// Number of threads.
    #[cfg(feature = "parallel")]
    #[clap(long)]
    pub threads: Option<usize>,
}
