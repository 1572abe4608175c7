//! Prompt runner
//!
//! One-shot mode for a prompt given on the command line, and a line mode
//! that answers each non-empty stdin line as its own conversation.

use askcal_core::{ConversationOutcome, Orchestrator};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

/// Answer text followed by a tool-call summary line
pub fn format_outcome(outcome: &ConversationOutcome) -> String {
    let answer = if outcome.answer.trim().is_empty() {
        "(no answer)"
    } else {
        outcome.answer.trim_end()
    };
    format!(
        "{}\n[tool calls: {}, rounds: {}]\n",
        answer, outcome.tool_call_count, outcome.rounds
    )
}

/// Run one conversation and print the answer
pub async fn run_prompt(orchestrator: &Orchestrator, prompt: &str) -> anyhow::Result<()> {
    let outcome = orchestrator.ask(prompt).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format_outcome(&outcome).as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Answer every stdin line
pub async fn run_stdin(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    info!("Reading prompts from stdin");
    let reader = BufReader::new(tokio::io::stdin());
    run_lines(orchestrator, reader, tokio::io::stdout()).await
}

/// Answer each non-empty line of `reader`
///
/// A failed conversation is reported and the next line is still read.
pub async fn run_lines<R, W>(
    orchestrator: &Orchestrator,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0usize;

    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        let text = match orchestrator.ask(prompt).await {
            Ok(outcome) => format_outcome(&outcome),
            Err(e) => {
                tracing::error!(error = %e, "Conversation failed");
                format!("Error: {}\n", e)
            }
        };
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        answered += 1;
    }

    info!(answered, "Input closed");
    Ok(())
}
