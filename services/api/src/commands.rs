use crate::infra::{load_scoring_adapter, parse_field};
use clap::Args;
use loan_desk::batch::{read_applicants_from_path, run_batch as decide_batch, BatchOutcome};
use loan_desk::config::AppConfig;
use loan_desk::decision::{
    CounterStore, DecisionOutcome, DecisionService, InMemoryCounterStore, JsonFileCounterStore,
    RawFields, ScoringAdapter,
};
use loan_desk::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// Applicant field as name=value; repeat for all eleven fields
    #[arg(long = "field", value_parser = parse_field)]
    pub(crate) fields: Vec<(String, String)>,
    /// Score without touching the persisted counters
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV file whose header row names the applicant fields
    pub(crate) csv: PathBuf,
    /// Score without touching the persisted counters
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Emit the full report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let adapter = load_scoring_adapter(&config.decision)?;
    let raw: RawFields = args.fields.into_iter().collect();

    let outcome = if args.dry_run {
        decide_with(adapter, Arc::new(InMemoryCounterStore::default()), &raw)?
    } else {
        let counters = Arc::new(JsonFileCounterStore::new(&config.decision.counters_path));
        decide_with(adapter, counters, &raw)?
    };

    render_outcome(&outcome, args.dry_run);
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let adapter = load_scoring_adapter(&config.decision)?;
    let applicants = read_applicants_from_path(&args.csv)?;

    let report = if args.dry_run {
        let service = DecisionService::new(adapter, Arc::new(InMemoryCounterStore::default()));
        decide_batch(&service, &applicants)
    } else {
        let counters = Arc::new(JsonFileCounterStore::new(&config.decision.counters_path));
        let service = DecisionService::new(adapter, counters);
        decide_batch(&service, &applicants)
    };

    if args.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Batch decisions for {}", args.csv.display());
    for entry in &report.entries {
        match &entry.outcome {
            BatchOutcome::Decided(view) => match &view.reason {
                Some(reason) => println!("- row {}: {} ({})", entry.row, view.verdict, reason),
                None => println!("- row {}: {}", entry.row, view.verdict),
            },
            BatchOutcome::Failed { error } => println!("- row {}: error: {}", entry.row, error),
        }
    }
    println!(
        "\n{} approved, {} rejected, {} failed",
        report.approved, report.rejected, report.failed
    );
    if report.unpersisted > 0 {
        println!(
            "warning: {} verdict(s) were not saved to the counter store",
            report.unpersisted
        );
    }

    Ok(())
}

pub(crate) fn run_stats() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let state = JsonFileCounterStore::new(&config.decision.counters_path).load()?;

    println!("Approved: {}", state.approved);
    println!("Rejected: {}", state.rejected);
    Ok(())
}

fn decide_with<C>(
    adapter: ScoringAdapter,
    counters: Arc<C>,
    raw: &RawFields,
) -> Result<DecisionOutcome, AppError>
where
    C: CounterStore + 'static,
{
    let service = DecisionService::new(adapter, counters);
    Ok(service.decide_blocking(raw)?)
}

fn render_outcome(outcome: &DecisionOutcome, dry_run: bool) {
    let view = outcome.result.view();

    println!("Verdict: {}", view.verdict);
    if let (Some(reason), Some(tip), Some(estimated_time)) =
        (&view.reason, &view.tip, &view.estimated_time)
    {
        println!("Reason: {reason}");
        println!("Tip: {tip}");
        println!("Estimated time to improve: {estimated_time}");
    }

    if dry_run {
        println!("\nDry run: counters not updated");
    } else {
        println!(
            "\nCounters: {} approved, {} rejected",
            view.approved_count, view.rejected_count
        );
    }

    if let Some(err) = &outcome.persistence_error {
        println!("warning: verdict was not saved to the counter store ({err})");
    }
}
