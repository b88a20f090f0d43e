use anyhow::*;
use mealy::{plan, simulate, Synthesis};
use mealy_domains::BridgeWalk;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt::Formatter;
use structopt::StructOpt;

/// Synthesizes a bounded finite-state controller for the bridge walk and
/// cross-checks it by simulation.
#[derive(Debug, StructOpt)]
#[structopt(name = "walk", rename_all = "kebab-case")]
struct Opt {
    /// Number of bridge segments to cross.
    #[structopt(long, short, default_value = "4")]
    length: u8,
    /// Maximum number of controller states.
    #[structopt(long, short, default_value = "2")]
    bound: u32,
    /// Desired likelihood of plan completion, strictly below 1.
    #[structopt(long, default_value = "0.9")]
    lpc: f64,
    /// Number of simulation episodes used to cross-check the controller.
    #[structopt(long, default_value = "2000")]
    trials: u32,

    /// Return failure with code 1 if no controller is found.
    #[structopt(long)]
    expect_found: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt: Opt = Opt::from_args();
    let env = BridgeWalk::new(opt.length);

    let start_time = std::time::Instant::now();
    let synthesis = plan(&env, opt.bound, opt.lpc)?;
    let runtime = start_time.elapsed();

    let result = match &synthesis {
        Synthesis::Found { controller, stats } => {
            println!("Controller found with at most {} states.", opt.bound);
            println!("=============");
            print!("{controller}");
            println!("=============");
            println!("{stats}");

            let mut rng = SmallRng::seed_from_u64(0);
            let rate = simulate::success_rate(&env, controller, opt.trials, 500, &mut rng);
            DemoResult {
                found: true,
                simulated_lpc: Some(rate),
                runtime,
            }
        }
        Synthesis::NotFound { stats } => {
            println!("No controller found with at most {} states.", opt.bound);
            println!("{stats}");
            DemoResult {
                found: false,
                simulated_lpc: None,
                runtime,
            }
        }
    };

    println!("{result}");
    if opt.expect_found && !result.found {
        std::process::exit(1);
    }
    Ok(())
}

struct DemoResult {
    found: bool,
    simulated_lpc: Option<f64>,
    runtime: std::time::Duration,
}

impl std::fmt::Display for DemoResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[summary] controller:{} simulated-lpc:{} runtime:{}ms",
            if self.found { "FOUND" } else { "NONE" },
            self.simulated_lpc
                .map_or_else(|| "_".to_string(), |rate| format!("{rate:.3}")),
            self.runtime.as_millis()
        )
    }
}
