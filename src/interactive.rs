use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use persona_core::config::AppConfig;
use persona_core::error::AppError;
use persona_core::inventory::{
    AnswerScale, AssessmentError, AssessmentService, FinalReport, InvalidResponse, Item,
    JsonFileSnapshotStore, MemorySnapshotStore, NextItem, Session, SessionId, SnapshotSink,
    SnapshotStore, SnapshotWriter, StoreError, WriterHandle,
};
use tracing::{debug, info, warn};

use crate::cli::{load_inventory, ResumeArgs, RunArgs, SimulateArgs};
use crate::render;

/// What the respondent did with the item on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Answer(u8),
    Skip,
    /// Stop presenting but keep the session resumable.
    Pause,
    /// Finish now and score what has been answered.
    Quit,
}

pub(crate) async fn run(config: &AppConfig, args: RunArgs) -> Result<(), AppError> {
    let inventory = Arc::new(load_inventory(config, &args.source)?);
    let store = Arc::new(JsonFileSnapshotStore::new(
        config.storage.snapshot_dir.clone(),
    ));
    let (writer, handle) = SnapshotWriter::spawn(store);
    let service = AssessmentService::new(inventory, Arc::new(writer), config.assessment.clone());

    let mode = args.mode.unwrap_or(config.session.mode);
    let seed = args.seed.or(config.session.seed);
    let mut session = service.start(mode, seed)?;

    println!("{} (at most {} items)", mode.label(), session.policy().max_items);
    println!("Session {}", session.id());

    let outcome = present(&service, &mut session, prompt_stdin)?;
    conclude(service, handle, &session, outcome, config, args.json).await
}

pub(crate) async fn resume(config: &AppConfig, args: ResumeArgs) -> Result<(), AppError> {
    let inventory = Arc::new(load_inventory(config, &args.source)?);
    let store = Arc::new(JsonFileSnapshotStore::new(
        config.storage.snapshot_dir.clone(),
    ));
    let id = SessionId::new(args.session_id);
    let snapshot = store
        .load(&id)?
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;

    let (writer, handle) = SnapshotWriter::spawn(store);
    let service = AssessmentService::new(inventory, Arc::new(writer), config.assessment.clone());
    let mut session = service.resume(snapshot)?;

    println!(
        "Resuming {} from {} ({} of at most {} items presented)",
        session.id(),
        session.started_at().format("%Y-%m-%d %H:%M"),
        session.ledger().len(),
        session.policy().max_items
    );

    let outcome = present(&service, &mut session, prompt_stdin)?;
    conclude(service, handle, &session, outcome, config, args.json).await
}

pub(crate) fn simulate(config: &AppConfig, args: SimulateArgs) -> Result<(), AppError> {
    let inventory = Arc::new(load_inventory(config, &args.source)?);
    let scale = inventory.scale();
    if !scale.contains(args.answer) {
        return Err(AssessmentError::InvalidResponse(InvalidResponse::OutOfScale {
            answer: args.answer,
            min: scale.min,
            max: scale.max,
        })
        .into());
    }

    let store = Arc::new(MemorySnapshotStore::new());
    let service = AssessmentService::new(inventory, store.clone(), config.assessment.clone());
    let mode = args.mode.unwrap_or(config.session.mode);
    let seed = args.seed.or(config.session.seed);
    let mut session = service.start(mode, seed)?;

    let answer = args.answer;
    let outcome = present(&service, &mut session, |_, _, _| Ok(Reply::Answer(answer)))?;
    debug!(snapshots = store.history().len(), "simulated session finished");

    match outcome {
        Some(report) => render::finish(&report, config.assessment.display_top, args.json),
        None => Ok(()),
    }
}

/// Present items until the session completes, runs out of items, or the
/// respondent stops. Returns `None` when the session was paused.
fn present<K, F>(
    service: &AssessmentService<K>,
    session: &mut Session,
    mut reply: F,
) -> Result<Option<FinalReport>, AppError>
where
    K: SnapshotSink + 'static,
    F: FnMut(&Item, AnswerScale, &Session) -> Result<Reply, AppError>,
{
    let scale = service.inventory().scale();

    loop {
        let item = match service.next_item(session) {
            Ok(NextItem::Present(item)) => item,
            Ok(NextItem::Complete(reason)) => {
                info!(session_id = %session.id(), reason = reason.label(), "assessment complete");
                break;
            }
            Err(AssessmentError::ExhaustedPool { presented }) => {
                warn!(session_id = %session.id(), presented, "no items left to present");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let shown = Instant::now();
        match reply(item, scale, session)? {
            Reply::Answer(answer) => {
                let latency_ms = u64::try_from(shown.elapsed().as_millis()).ok();
                match service.submit(session, &item.id, answer, latency_ms) {
                    Ok(()) => {}
                    Err(AssessmentError::InvalidResponse(err)) => println!("  {err}"),
                    Err(err) => return Err(err.into()),
                }
            }
            Reply::Skip => service.skip(session, &item.id)?,
            Reply::Pause => return Ok(None),
            Reply::Quit => break,
        }
    }

    Ok(Some(service.finalize(session)))
}

async fn conclude(
    service: AssessmentService<SnapshotWriter>,
    handle: WriterHandle,
    session: &Session,
    outcome: Option<FinalReport>,
    config: &AppConfig,
    json: bool,
) -> Result<(), AppError> {
    // The writer drains once the service's sender is gone.
    drop(service);
    let summary = handle.join().await?;
    debug!(
        written = summary.written,
        dropped = summary.dropped,
        failed = summary.failed,
        "snapshot writer drained"
    );
    if summary.failed > 0 {
        warn!(failed = summary.failed, "some snapshots were not saved");
    }

    match outcome {
        Some(report) => render::finish(&report, config.assessment.display_top, json),
        None => {
            println!("\nPaused. Continue with `persona resume {}`.", session.id());
            Ok(())
        }
    }
}

fn prompt_stdin(item: &Item, scale: AnswerScale, session: &Session) -> Result<Reply, AppError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        println!("\n[{:>3.0}%] {}", session.progress_percent(), item.text);
        print!(
            "  {}-{} (s skip, p pause, q finish now): ",
            scale.min, scale.max
        );
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(Reply::Pause);
        }
        match parse_reply(&line) {
            Some(reply) => return Ok(reply),
            None => println!(
                "  Enter a number from {} to {}, or s, p, q.",
                scale.min, scale.max
            ),
        }
    }
}

fn parse_reply(raw: &str) -> Option<Reply> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "s" | "skip" => Some(Reply::Skip),
        "p" | "pause" => Some(Reply::Pause),
        "q" | "quit" => Some(Reply::Quit),
        other => other.parse::<u8>().ok().map(Reply::Answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::inventory::{
        AssessmentConfig, AssessmentMode, Inventory, ResultQuality, TerminationReason,
    };

    fn memory_service() -> (AssessmentService<MemorySnapshotStore>, Arc<MemorySnapshotStore>) {
        let store = Arc::new(MemorySnapshotStore::new());
        let service = AssessmentService::new(
            Arc::new(Inventory::builtin()),
            store.clone(),
            AssessmentConfig::default(),
        );
        (service, store)
    }

    #[test]
    fn replies_parse_commands_and_numbers() {
        assert_eq!(parse_reply(" 4\n"), Some(Reply::Answer(4)));
        assert_eq!(parse_reply("S"), Some(Reply::Skip));
        assert_eq!(parse_reply("pause"), Some(Reply::Pause));
        assert_eq!(parse_reply("q"), Some(Reply::Quit));
        assert_eq!(parse_reply("maybe"), None);
        assert_eq!(parse_reply("-1"), None);
    }

    #[test]
    fn quitting_finalizes_as_an_early_exit() {
        let (service, _) = memory_service();
        let mut session = service
            .start(AssessmentMode::Demo, Some(1))
            .expect("session starts");

        let mut replies = vec![Reply::Quit, Reply::Answer(5), Reply::Answer(2)];
        let report = present(&service, &mut session, |_, _, _| {
            Ok(replies.pop().unwrap_or(Reply::Quit))
        })
        .expect("loop runs")
        .expect("quit produces a report");

        assert_eq!(report.answered, 2);
        assert_eq!(report.termination, TerminationReason::EarlyExit);
        assert_eq!(report.quality, ResultQuality::LowReliability);
    }

    #[test]
    fn pausing_leaves_the_session_resumable() {
        let (service, store) = memory_service();
        let mut session = service
            .start(AssessmentMode::Demo, Some(2))
            .expect("session starts");

        let mut replies = vec![Reply::Pause, Reply::Skip, Reply::Answer(9), Reply::Answer(3)];
        let outcome = present(&service, &mut session, |_, _, _| {
            Ok(replies.pop().unwrap_or(Reply::Pause))
        })
        .expect("loop runs");
        assert!(outcome.is_none());
        assert!(!session.is_finalized());
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(session.ledger().skipped(), 1);

        let saved = store
            .load(session.id())
            .expect("store readable")
            .expect("progress saved");
        assert!(!saved.is_final());
        assert_eq!(saved.ledger.len(), 2);
    }
}
