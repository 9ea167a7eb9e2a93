use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use appointment_optimizer::{
    json::types::JsonScheduleRequest,
    problem::schedule_request::{ScheduleRequest, ScheduleRequestBuilder},
    solver::{
        optimal_schedule::OptimalSchedule,
        optimizer_params::{OptimizerParams, Termination},
        schedule_optimizer::ScheduleOptimizer,
    },
};
use clap::Args;
use tracing::info;

use crate::{file_utils::read_json_files, parsers};

#[derive(Args)]
pub struct OptimizerArgs {
    /// Stop the minimizer after this long (e.g., "500ms", "5s", "PT1M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    #[arg(long, default_value_t = 500)]
    max_iterations: usize,

    /// Overrides the size-dependent convergence tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Recompute every matrix exponential instead of reusing them
    #[arg(long)]
    no_cache: bool,
}

/// Default timeout, usually set in `.env.local`.
const TIMEOUT_ENV_VAR: &str = "APPOINTMENT_TIMEOUT";

impl OptimizerArgs {
    fn params(&self) -> Result<OptimizerParams, anyhow::Error> {
        let mut terminations = vec![Termination::Iterations(self.max_iterations)];
        if let Some(timeout) = self.timeout_or_env()? {
            terminations.push(Termination::Duration(timeout));
        }

        Ok(OptimizerParams {
            terminations,
            tolerance: self.tolerance,
            exponential_cache: !self.no_cache,
        })
    }

    fn timeout_or_env(&self) -> Result<Option<jiff::SignedDuration>, anyhow::Error> {
        if self.timeout.is_some() {
            return Ok(self.timeout);
        }

        match std::env::var(TIMEOUT_ENV_VAR) {
            Ok(value) => parsers::parse_duration(&value)
                .map(Some)
                .map_err(|error| anyhow!("{TIMEOUT_ENV_VAR}: {error}")),
            Err(_) => Ok(None),
        }
    }
}

#[derive(Args)]
pub struct OptimizeArgs {
    /// Mean service times, e.g. "1, 1.5, 2". A single value is repeated for `--clients`
    #[arg(short, long, value_parser = parsers::parse_number_list, allow_hyphen_values = true)]
    means: ::std::vec::Vec<f64>,

    /// Squared coefficients of variation, one per client or a single value for all
    #[arg(short, long, value_parser = parsers::parse_number_list, allow_hyphen_values = true)]
    scvs: ::std::vec::Vec<f64>,

    /// Number of clients when `--means` and `--scvs` are single values
    #[arg(short = 'n', long)]
    clients: Option<usize>,

    #[arg(short, long, default_value_t = 0.5, allow_hyphen_values = true)]
    omega: f64,

    /// Interarrival times already agreed upon
    #[arg(short, long, value_parser = parsers::parse_number_list, allow_hyphen_values = true)]
    fixed: Option<::std::vec::Vec<f64>>,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    tau: f64,

    /// Clients already in the system
    #[arg(short, default_value_t = 0)]
    k: usize,

    /// Elapsed service time of the client in service
    #[arg(short, default_value_t = 0.0, allow_hyphen_values = true)]
    u: f64,

    #[command(flatten)]
    optimizer: OptimizerArgs,
}

#[derive(Args)]
pub struct OptimizeFileArgs {
    /// A JSON request, or a folder of them
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    optimizer: OptimizerArgs,
}

pub fn run(args: OptimizeArgs) -> Result<(), anyhow::Error> {
    let request = build_request(&args)?;
    let optimizer = ScheduleOptimizer::new(args.optimizer.params()?);

    let schedule = optimizer.optimize(&request)?;
    print_schedule(&schedule)
}

pub fn run_file(args: OptimizeFileArgs) -> Result<(), anyhow::Error> {
    let paths = if args.input.is_file() {
        vec![args.input]
    } else {
        read_json_files(&args.input)?
    };

    let optimizer = ScheduleOptimizer::new(args.optimizer.params()?);
    for path in paths {
        info!("Optimizing {:?}", path);

        let content =
            std::fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
        let json: JsonScheduleRequest =
            serde_json::from_str(&content).with_context(|| format!("parsing {path:?}"))?;

        let schedule = optimizer
            .optimize(&json.into())
            .with_context(|| format!("optimizing {path:?}"))?;
        print_schedule(&schedule)?;
    }

    Ok(())
}

fn print_schedule(schedule: &OptimalSchedule) -> Result<(), anyhow::Error> {
    if !schedule.converged {
        tracing::warn!(termination = ?schedule.termination, "Schedule did not converge");
    }

    println!("{}", serde_json::to_string_pretty(schedule)?);
    Ok(())
}

fn build_request(args: &OptimizeArgs) -> Result<ScheduleRequest, anyhow::Error> {
    let num_clients = match args.clients {
        Some(clients) => clients,
        None => args.means.len().max(args.scvs.len()),
    };

    let means = broadcast("means", &args.means, num_clients)?;
    let scvs = broadcast("scvs", &args.scvs, num_clients)?;

    let mut builder = ScheduleRequestBuilder::default();
    builder
        .set_means(means)
        .set_scvs(scvs)
        .set_omega(args.omega)
        .set_tau(args.tau)
        .set_clients_in_system(args.k)
        .set_elapsed_service_time(args.u);

    if let Some(fixed) = &args.fixed {
        builder.set_fixed_inter_arrival_times(fixed.clone());
    }

    Ok(builder.build())
}

/// Repeats a single value for every client.
fn broadcast(name: &str, values: &[f64], num_clients: usize) -> Result<Vec<f64>, anyhow::Error> {
    match values {
        [value] => Ok(vec![*value; num_clients]),
        _ if values.len() == num_clients => Ok(values.to_vec()),
        _ => bail!(
            "`{name}` has {} values but there are {num_clients} clients",
            values.len()
        ),
    }
}
