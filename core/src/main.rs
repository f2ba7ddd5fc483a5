use std::sync::Arc;

use anyhow::Result;
use speaking_coach_core::session::{
    Evaluation, SessionEvent, SessionHandle, SessionManager, SessionPhase, TestPart,
};
use speaking_coach_core::telemetry::init_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::warn;

const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing();

    let part = match std::env::args().nth(1) {
        Some(label) => label.parse::<TestPart>()?,
        None => TestPart::Part1,
    };

    let manager = SessionManager::from_env()?;
    let (handle, events) = manager.start_session(part);
    let printer = tokio::spawn(print_events(events));

    println!("{part} started. Type your answers, or {QUIT_COMMAND} to stop.");
    drive(&handle).await?;

    match handle.wait_for_evaluation().await {
        Ok(Some(evaluation)) => print_evaluation(&evaluation),
        Ok(None) => println!("Session ended without an evaluation."),
        Err(err) => println!("Scoring failed: {err}"),
    }

    printer.abort();
    Ok(())
}

/// Feeds stdin lines to the session until it completes or the user quits.
async fn drive(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = handle
            .wait_for(|snapshot| {
                !matches!(
                    snapshot.phase,
                    SessionPhase::NotStarted | SessionPhase::AwaitingExaminer
                )
            })
            .await?;
        if snapshot.is_completed() {
            return Ok(());
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    handle.abort().await?;
                    return Ok(());
                };
                let line = line.trim();
                if line.eq_ignore_ascii_case(QUIT_COMMAND) {
                    handle.abort().await?;
                    return Ok(());
                }
                if line.is_empty() {
                    continue;
                }
                if let Err(err) = handle.record_candidate_utterance(line).await {
                    warn!(target: "speaking_coach", %err, "answer rejected");
                }
            }
            _ = handle.wait_for(|snapshot| snapshot.is_completed()) => {
                return Ok(());
            }
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::ExaminerUtterance { text, .. }) => println!("Examiner: {text}"),
            Ok(SessionEvent::Notice { notice, .. }) => {
                println!("[{:?}] {}", notice.level, notice.message)
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(target: "speaking_coach", skipped, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_evaluation(evaluation: &Arc<Evaluation>) {
    println!(
        "Overall band: {:.1} ({})",
        evaluation.overall_band(),
        evaluation.band_descriptor()
    );
    let criteria = [
        ("Fluency and coherence", evaluation.fluency_coherence()),
        ("Lexical resource", evaluation.lexical_resource()),
        ("Grammatical range and accuracy", evaluation.grammatical_range()),
        ("Pronunciation", evaluation.pronunciation()),
    ];
    for (name, feedback) in criteria {
        println!("  {name}: {:.1}", feedback.band);
        if !feedback.strengths.is_empty() {
            println!("    + {}", feedback.strengths);
        }
        if !feedback.weaknesses.is_empty() {
            println!("    - {}", feedback.weaknesses);
        }
    }
    for recommendation in evaluation.recommendations() {
        println!("  * {recommendation}");
    }
}
