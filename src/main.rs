use anyhow::Context;
use canteen_attendance::core::report::daily_summary;
use canteen_attendance::core::roster::RosterFilter;
use canteen_attendance::domain::ports::RecordStore;
use canteen_attendance::utils::error::ErrorSeverity;
use canteen_attendance::utils::{logger, validation::Validate};
use canteen_attendance::{
    AdmissionGate, AdmissionOutcome, CanteenConfig, CaptureOutcome, CliConfig, Kiosk,
    LabelIdentifier, MemoryStore, NotificationService, RosterService,
};
use clap::Parser;
use std::fs::File;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match &cli.config {
        Some(path) => match CanteenConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => CanteenConfig::default(),
    };

    if config.monitoring.json_logs {
        logger::init_json_logger(&config.monitoring.log_level);
    } else {
        logger::init_cli_logger(cli.verbose, &config.monitoring.log_level);
    }

    tracing::info!("Starting canteen-attendance for {}", config.canteen.name);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let schedule = config.meal_schedule()?;
    let store = Arc::new(MemoryStore::new());
    let roster = RosterService::new(Arc::clone(&store), config.roster.default_tokens);

    let roster_file =
        File::open(&cli.roster).with_context(|| format!("Failed to open roster {}", cli.roster))?;
    let imported = roster.import_csv(roster_file).await?;
    tracing::info!("📋 Loaded {} students from {}", imported.imported, cli.roster);

    let identifier = LabelIdentifier::from_roster(&store.list_students().await?);
    let gate = Arc::new(AdmissionGate::new(
        Arc::clone(&store),
        schedule,
        config.gate_policy(),
    ));
    let kiosk = Kiosk::new(config.canteen.name.clone(), identifier, Arc::clone(&gate));

    let mut exit_code = 0;
    for label in &cli.label {
        match kiosk.capture(label.as_bytes(), cli.meal).await {
            Ok(outcome) => print_outcome(label, &outcome, cli.json)?,
            Err(e) => {
                tracing::error!(
                    "❌ Admission failed for {}: {} (Category: {:?}, Severity: {:?})",
                    label,
                    e,
                    e.category(),
                    e.severity()
                );
                eprintln!("❌ {}: {}", label, e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

                let code = match e.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                };
                exit_code = exit_code.max(code);
            }
        }
    }

    if let Some(slot) = cli.notify_missed {
        let notices = NotificationService::new(Arc::clone(&store), schedule);
        let draft = notices.missed_meal(slot, &RosterFilter::default()).await?;
        if draft.recipients.is_empty() {
            tracing::info!("Nobody missed {} today", slot);
        } else {
            let queued = notices.queue(draft).await?;
            tracing::info!(
                "📣 Queued '{}' for {} students",
                queued.title,
                queued.recipients.len()
            );
        }
    }

    if cli.summary {
        let today = schedule.local_date(chrono::Utc::now());
        let summary = daily_summary(store.as_ref(), &schedule, today).await?;
        if cli.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!(
                "📊 {}: {} students, breakfast {}, lunch {}, dinner {} ({}% attended, {}% tokens used, {} notifications pending)",
                summary.date,
                summary.total_students,
                summary.breakfast,
                summary.lunch,
                summary.dinner,
                summary.attendance_rate_percent,
                summary.token_usage_percent,
                summary.pending_notifications
            );
        }
    }

    if let Some(path) = &cli.export {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        let written = roster.export_csv(file).await?;
        tracing::info!("📁 Exported {} students to {}", written, path);
    }

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn print_outcome(label: &str, capture: &CaptureOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({ "label": label, "capture": capture }))?
        );
        return Ok(());
    }

    match capture {
        CaptureOutcome::Unrecognized => println!("❓ {}: no matching student", label),
        CaptureOutcome::Decided { outcome, .. } => match outcome {
            AdmissionOutcome::Admitted { student, .. } => println!(
                "✅ {} ({}): admitted, tokens left B:{} L:{} D:{}",
                student.name,
                student.roll_number,
                student.tokens.breakfast,
                student.tokens.lunch,
                student.tokens.dinner
            ),
            AdmissionOutcome::Denied(denial) => {
                println!("⛔ {}: {} [{}]", label, denial.message, denial.reason.code())
            }
        },
    }
    Ok(())
}
