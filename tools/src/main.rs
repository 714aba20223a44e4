//! churn-runner: headless front end for the churn scoring core.
//!
//! Usage:
//!   churn-runner --db churn.db --model bundle.json
//!   churn-runner --config churn.json --ipc-mode < commands.jsonl

use anyhow::{Context, Result};
use churn_core::{
    config::ChurnConfig,
    features::FeatureRecord,
    service::ChurnService,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Predict {
        features: FeatureRecord,
    },
    PredictBatch {
        customers: Vec<FeatureRecord>,
    },
    Analytics,
    History {
        #[serde(default)]
        limit: Option<i64>,
        #[serde(default)]
        offset: i64,
    },
    Customers {
        #[serde(default)]
        limit: Option<usize>,
    },
    HighRisk,
    PredictionsOn {
        date: chrono::NaiveDate,
    },
    ModelInfo,
    ModelMetrics,
    ReloadModel {
        path: String,
    },
    Health,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match string_arg(&args, "--config") {
        Some(path) => ChurnConfig::load(path)?,
        None => ChurnConfig::default(),
    };
    if let Some(db) = string_arg(&args, "--db") {
        config.database_path = db.to_string();
    }
    if let Some(model) = string_arg(&args, "--model") {
        config.model_bundle_path = Some(model.to_string());
    }
    if let Some(seed) = string_arg(&args, "--seed").and_then(|s| s.parse().ok()) {
        config.confidence_seed = Some(seed);
    }

    if !ipc_mode {
        println!("churn-runner");
        println!("  db:     {}", config.database_path);
        println!("  model:  {}", config.model_bundle_path.as_deref().unwrap_or("(none)"));
        println!();
    }

    let service = ChurnService::open(config.clone())
        .with_context(|| format!("opening {}", config.database_path))?;

    if ipc_mode {
        run_ipc_loop(&service)?;
    } else {
        print_summary(&service)?;
    }

    Ok(())
}

fn run_ipc_loop(service: &ChurnService) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(service, cmd) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("command failed: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(service: &ChurnService, cmd: IpcCommand) -> Result<serde_json::Value> {
    let cfg = service.config();
    let value = match cmd {
        IpcCommand::Predict { features } => serde_json::to_value(service.predict(&features)?)?,
        IpcCommand::PredictBatch { customers } => {
            serde_json::to_value(service.predict_batch(&customers)?)?
        }
        IpcCommand::Analytics => serde_json::to_value(service.analytics())?,
        IpcCommand::History { limit, offset } => {
            let limit = limit.unwrap_or(cfg.history_page_size as i64);
            serde_json::to_value(service.history(limit, offset))?
        }
        IpcCommand::Customers { limit } => {
            serde_json::to_value(service.customers(limit.unwrap_or(cfg.customer_list_limit)))?
        }
        IpcCommand::HighRisk => serde_json::to_value(service.high_risk_predictions())?,
        IpcCommand::PredictionsOn { date } => serde_json::to_value(service.predictions_on(date))?,
        IpcCommand::ModelInfo => serde_json::to_value(service.model_info())?,
        IpcCommand::ModelMetrics => serde_json::to_value(service.model_metrics())?,
        IpcCommand::ReloadModel { path } => {
            let kind = service.reload_model(&path)?;
            serde_json::json!({ "scorer": kind })
        }
        IpcCommand::Health => serde_json::to_value(service.health())?,
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn print_summary(service: &ChurnService) -> Result<()> {
    let health = service.health();
    let snap = service.analytics();

    println!("=== SCORER ===");
    println!("  path:           {}", health.scorer.as_str());
    println!("  model version:  {}", health.model_version.as_deref().unwrap_or("-"));
    println!("  database:       {}", if health.database_reachable { "reachable" } else { "unreachable" });

    println!();
    println!("=== ANALYTICS ({}) ===", health.checked_at.format("%Y-%m-%d %H:%M"));
    println!("  total predictions:  {}", snap.total_predictions);
    println!("  churn rate:         {:.1}%", snap.churn_rate * 100.0);
    println!("  avg confidence:     {:.3}", snap.avg_confidence);
    println!("  predictions today:  {}", snap.predictions_today);
    println!("  high risk:          {}", snap.high_risk_customers);

    let busiest = snap
        .hourly_distribution
        .iter()
        .filter(|(_, c)| **c > 0)
        .collect::<Vec<_>>();
    if busiest.is_empty() {
        println!("  (No predictions today yet)");
    } else {
        for (hour, count) in busiest {
            println!("  {hour:02}:00  {count}");
        }
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
