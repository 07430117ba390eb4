use anyhow::{Result, anyhow};

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{
    ensemble_params_percentile, ensemble_percentile, interpolate_simulation_result,
};
use crate::args::Args;
use crate::config::{MAX_AGE_GROUPS, ModelSettings, Settings};
use crate::core::TimeSeries;
use crate::models::{ParameterSampling, SecirModel, SirModel, SisModel};
use crate::readwrite::{TimeSeriesIO, write_parameter_table_to_file};
use crate::simulation::{CompartmentalModel, FlowModel, simulate, simulate_flows};

/// Percentiles of the ensemble written after all runs, with their file name.
const PERCENTILES: [(&str, f64); 5] = [
    ("p05", 0.05),
    ("p25", 0.25),
    ("p50", 0.5),
    ("p75", 0.75),
    ("p95", 0.95),
];

/// A model the runner can sample and simulate.
pub trait EnsembleModel: CompartmentalModel + ParameterSampling + Clone + Send + Sync {
    /// Simulate the configured time frame, with the accumulated flows if requested.
    fn simulate_run(
        &self,
        settings: &Settings,
    ) -> crate::errors::Result<(TimeSeries, Option<TimeSeries>)>;

    /// Column names of the flow output, `None` for models without flows.
    fn flow_output_names(&self) -> Option<Vec<String>>;
}

fn simulate_flow_model<M: FlowModel + Clone>(
    model: &M,
    settings: &Settings,
) -> crate::errors::Result<(TimeSeries, Option<TimeSeries>)> {
    let integrator = Some(settings.integrator.clone());
    if settings.ensemble.flows {
        let (result, flows) =
            simulate_flows(settings.t0, settings.tmax, settings.dt, model, integrator)?;
        Ok((result, Some(flows)))
    } else {
        let result = simulate(settings.t0, settings.tmax, settings.dt, model, integrator)?;
        Ok((result, None))
    }
}

impl EnsembleModel for SirModel {
    fn simulate_run(
        &self,
        settings: &Settings,
    ) -> crate::errors::Result<(TimeSeries, Option<TimeSeries>)> {
        simulate_flow_model(self, settings)
    }

    fn flow_output_names(&self) -> Option<Vec<String>> {
        Some(self.flow_names())
    }
}

impl<const N: usize> EnsembleModel for SecirModel<N> {
    fn simulate_run(
        &self,
        settings: &Settings,
    ) -> crate::errors::Result<(TimeSeries, Option<TimeSeries>)> {
        simulate_flow_model(self, settings)
    }

    fn flow_output_names(&self) -> Option<Vec<String>> {
        Some(self.flow_names())
    }
}

impl EnsembleModel for SisModel {
    fn simulate_run(
        &self,
        settings: &Settings,
    ) -> crate::errors::Result<(TimeSeries, Option<TimeSeries>)> {
        let integrator = Some(settings.integrator.clone());
        let result = simulate(settings.t0, settings.tmax, settings.dt, self, integrator)?;
        Ok((result, None))
    }

    fn flow_output_names(&self) -> Option<Vec<String>> {
        None
    }
}

pub struct Runner {
    args: Args,
    settings: Settings,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args);
        #[cfg(feature = "parallel")]
        Self::setup_rayon(&args);

        let mut settings = Self::load_settings(&args.settings)?;
        if let Some(runs) = args.runs {
            settings.ensemble.runs = runs;
        }
        if let Some(seed) = args.seed {
            settings.ensemble.seed = Some(seed);
        }
        settings.validate()?;

        fs::create_dir_all(&args.outdir)?;

        Ok(Self { args, settings })
    }

    /// Build the configured model and run the ensemble.
    pub fn start(&self) -> Result<()> {
        match &self.settings.model {
            ModelSettings::Sir(sir) => self.run(sir.build()?),
            ModelSettings::Sis(sis) => self.run(sis.build()?),
            ModelSettings::Secir(secir) => match secir.groups.len() {
                1 => self.run(secir.build::<1>()?),
                2 => self.run(secir.build::<2>()?),
                3 => self.run(secir.build::<3>()?),
                4 => self.run(secir.build::<4>()?),
                5 => self.run(secir.build::<5>()?),
                6 => self.run(secir.build::<6>()?),
                n => Err(anyhow!(
                    "SECIR scenarios support 1 to {MAX_AGE_GROUPS} age groups, got {n}"
                )),
            },
        }
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Setup rayon thread pool
    #[cfg(feature = "parallel")]
    fn setup_rayon(args: &Args) {
        if let Some(n_threads) = args.threads {
            println!("Setting number of threads to {}.", n_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build_global()
                .unwrap_or_else(|_| {
                    eprintln!("Unable to set number of threads.");
                    std::process::exit(1);
                });
        }
    }

    /// Load settings from file
    fn load_settings(path: &str) -> Result<Settings> {
        let settings: Settings = Settings::read_from_file(path)?;
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    fn progress_bar(&self, runs: usize) -> Option<ProgressBar> {
        match self.args.disable_progress_bar {
            true => None,
            false => {
                let bar = ProgressBar::new(runs as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}",
                        )
                        .expect("Unable to create template.")
                        .progress_chars("=> "),
                );
                Some(bar)
            }
        }
    }

    fn output_path(&self, name: &str) -> PathBuf {
        Path::new(self.args.outdir.as_str()).join(format!("{name}.csv"))
    }

    /// Sample, simulate and store a single run, returning its daily interpolation and the
    /// sampled model.
    fn run_single<M: EnsembleModel>(
        &self,
        model: &M,
        run: usize,
        seed: u64,
    ) -> crate::errors::Result<(TimeSeries, M)> {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(run as u64));
        let mut sample = model.clone();
        sample.draw_sample(&mut rng);

        log::debug!("Simulating run {run}...");
        let (result, flows) = sample.simulate_run(&self.settings)?;
        log::info!(
            "run={run} time_points={} final={:?}",
            result.get_num_time_points(),
            result.get_last_value().to_vec()
        );

        result.write_to_file(
            self.output_path(&format!("run_{run}")),
            &sample.compartment_names(),
        )?;
        if let (Some(flows), Some(names)) = (flows, sample.flow_output_names()) {
            flows.write_to_file(self.output_path(&format!("flows_{run}")), &names)?;
        }

        Ok((interpolate_simulation_result(&result), sample))
    }

    fn run<M: EnsembleModel>(&self, mut model: M) -> Result<()> {
        let ensemble = &self.settings.ensemble;
        if let Some(relative_dev) = ensemble.relative_deviation {
            model.set_params_distributions_normal(relative_dev);
        }
        if ensemble.flows && model.flow_output_names().is_none() {
            log::warn!("The model has no flows, only compartments are written.");
        }
        let violations = model.check_constraints();
        if violations > 0 {
            log::warn!("The configured model violates {violations} constraints.");
        }

        let seed = ensemble.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("Running {} simulations with seed {seed}...", ensemble.runs);
        let bar = self.progress_bar(ensemble.runs);

        let run_and_count = |run: usize| {
            let run_result = self.run_single(&model, run, seed);
            if let Some(bar) = bar.as_ref() {
                bar.inc(1);
            }
            run_result
        };

        #[cfg(feature = "parallel")]
        let runs: Vec<(TimeSeries, M)> = (0..ensemble.runs)
            .into_par_iter()
            .map(run_and_count)
            .collect::<crate::errors::Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let runs: Vec<(TimeSeries, M)> = (0..ensemble.runs)
            .map(run_and_count)
            .collect::<crate::errors::Result<_>>()?;
        let (interpolated, samples): (Vec<TimeSeries>, Vec<M>) = runs.into_iter().unzip();

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }

        log::info!("Storing percentiles...");
        let names = model.compartment_names();
        for (name, p) in PERCENTILES {
            ensemble_percentile(&interpolated, p).write_to_file(self.output_path(name), &names)?;
        }
        let parameters: Vec<(&str, M)> = PERCENTILES
            .iter()
            .map(|&(name, p)| (name, ensemble_params_percentile(&samples, p)))
            .collect();
        write_parameter_table_to_file(self.output_path("parameters"), &parameters)?;
        log::info!("Finished simulation.");
        Ok(())
    }
}
