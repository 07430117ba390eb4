use anyhow::Result;
use clap::Parser;

use compartmental::args::Args;
use compartmental::runner::Runner;

fn main() -> Result<()> {
    let args = Args::parse();
    let runner = Runner::new(args)?;
    runner.start()
}
