use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libflipper::{
    BodyKind, ChargeOwner, FlipConfig, FlipError, GroundSim, RollValue, SolidType, StdThrowRng,
    TableSession,
};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// CLI for the dice and coin flipper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dice expressions to throw (2D6, 1D20, coin, 3coin)
    #[arg(required = true, value_parser = parse_dice_notation)]
    dice_expressions: Vec<DiceNotation>,

    /// Throw power, 0-100 (anything under 10 throws at 10)
    #[arg(short, long, default_value_t = 70)]
    power: u8,

    /// Charge the throw by holding for this many milliseconds instead of using --power
    #[arg(long)]
    hold_ms: Option<u32>,

    /// Maximum simulated time per throw in seconds
    #[arg(short, long, default_value_t = 30.0)]
    time: f32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Verbose output (raises logging to at least info)
    #[arg(short, long)]
    verbose: bool,

    /// Logging verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: Level,

    /// Number of rolls for batch mode
    #[arg(long, default_value_t = 1)]
    batch: usize,

    /// Seed for reproducible throws; batch roll i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file; missing sections use defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize)]
struct RollResult {
    die_type: String,
    value: RollValue,
}

#[derive(Debug, Clone, Serialize)]
struct SimulationResult {
    results: Vec<RollResult>,
    total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DiceNotation {
    count: u32,
    kind: BodyKind,
}

/// Parse dice notation like 2D6, 1D20, coin or 3coin.
fn parse_dice_notation(s: &str) -> Result<DiceNotation, String> {
    let s = s.trim().to_uppercase();
    let invalid = || FlipError::InvalidNotation(s.clone()).to_string();

    let (count_str, kind) = if let Some(count_str) = s.strip_suffix("COIN") {
        (count_str, BodyKind::Coin)
    } else {
        let (count_str, sides_str) = s.split_once('D').ok_or_else(invalid)?;
        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;
        let solid = SolidType::from_sides(sides).map_err(|e| e.to_string())?;
        if count_str.is_empty() {
            return Err(invalid());
        }
        (count_str, BodyKind::Die(solid))
    };

    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str.parse().map_err(|_| invalid())?
    };
    if count == 0 {
        return Err(format!("Invalid count: {count}. Must be greater than 0"));
    }

    Ok(DiceNotation { count, kind })
}

fn load_config(args: &Args) -> Result<FlipConfig, FlipError> {
    match &args.config {
        Some(path) => FlipConfig::load(path),
        None => Ok(FlipConfig::default()),
    }
}

fn run_simulation(args: &Args, config: &FlipConfig) -> Result<Vec<SimulationResult>, Box<dyn std::error::Error>> {
    let mut all_results = Vec::new();
    let max_frames = (args.time / config.physics.frame_dt).ceil().max(1.0) as u64;

    for roll in 0..args.batch {
        let rng = match args.seed {
            Some(seed) => StdThrowRng::from_seed(seed.wrapping_add(roll as u64)),
            None => StdThrowRng::from_entropy(),
        };
        let mut session = TableSession::new(GroundSim::new(config), rng, config.clone());

        for notation in &args.dice_expressions {
            for _ in 0..notation.count {
                session.add_body(notation.kind)?;
            }
        }

        // dice first, then the coin control once the dice are down
        for owner in [ChargeOwner::Dice, ChargeOwner::Coin] {
            if !session.bodies().iter().any(|b| b.owner() == owner) {
                continue;
            }
            match args.hold_ms {
                Some(ms) => {
                    session.start_charge(owner)?;
                    let held = ms as f32 / 1000.0;
                    let frames = (held / config.physics.frame_dt).round() as u64;
                    for _ in 0..frames {
                        session.step(config.physics.frame_dt);
                    }
                    session.release_charge(owner)?;
                }
                None => {
                    match owner {
                        ChargeOwner::Dice => session.throw_all(args.power)?,
                        ChargeOwner::Coin => session.flip_coin(args.power)?,
                    };
                }
            }
            let frames = session.run_until_settled(max_frames);
            if session.is_rolling() {
                return Err(format!("bodies still rolling after {frames} frames; raise --time").into());
            }
            info!(%owner, frames, "throw finished");
        }

        let results = session
            .bodies()
            .iter()
            .filter_map(|b| {
                b.result.map(|value| RollResult {
                    die_type: b.kind.to_string(),
                    value,
                })
            })
            .collect();
        all_results.push(SimulationResult {
            results,
            total: session.total(),
        });
    }

    Ok(all_results)
}

impl SimulationResult {
    fn dice(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.results
            .iter()
            .filter_map(|r| r.value.face().map(|v| (r.die_type.as_str(), v)))
    }

    fn coins(&self) -> impl Iterator<Item = RollValue> + '_ {
        self.results.iter().map(|r| r.value).filter(|v| v.face().is_none())
    }

    /// One line: dice faces, then coin sides, then the dice total. Coins never
    /// count towards the total.
    fn summary(&self) -> String {
        let mut parts = Vec::new();
        let dice: Vec<String> = self.dice().map(|(kind, v)| format!("{kind}: {v}")).collect();
        if !dice.is_empty() {
            parts.push(dice.join(", "));
        }
        let coins: Vec<String> = self.coins().map(|c| c.to_string()).collect();
        if !coins.is_empty() {
            parts.push(format!("coins: {}", coins.join(", ")));
        }
        if !dice.is_empty() {
            parts.push(format!("total: {}", self.total));
        }
        parts.join(" | ")
    }
}

fn format_output(results: &[SimulationResult], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            if let [single] = results {
                output.push_str(&single.summary());
                output.push('\n');
                return Ok(output);
            }
            for (i, result) in results.iter().enumerate() {
                output.push_str(&format!("Roll {}: {}\n", i + 1, result.summary()));
            }
            let with_dice = results.iter().filter(|r| r.dice().next().is_some()).count();
            if with_dice > 0 {
                let sum: u32 = results.iter().map(|r| r.total).sum();
                output.push_str(&format!("Mean total: {:.2}\n", sum as f64 / with_dice as f64));
            }
            Ok(output)
        }
        OutputFormat::Json => match results {
            [single] => serde_json::to_string_pretty(single),
            _ => serde_json::to_string_pretty(results),
        },
        OutputFormat::Csv => {
            let mut output = String::from("roll,kind,face,coin\n");
            for (i, result) in results.iter().enumerate() {
                for roll in &result.results {
                    let (face, coin) = match roll.value.face() {
                        Some(v) => (v.to_string(), String::new()),
                        None => (String::new(), roll.value.to_string()),
                    };
                    output.push_str(&format!("{},{},{face},{coin}\n", i + 1, roll.die_type));
                }
            }
            Ok(output)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        args.log_level.max(Level::INFO)
    } else {
        args.log_level
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!(expressions = ?args.dice_expressions, power = args.power, hold_ms = ?args.hold_ms, "rolling");

    match run_simulation(&args, &config) {
        Ok(results) => {
            let output = format_output(&results, args.output)?;
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error during simulation: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
