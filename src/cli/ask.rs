use super::ui;
use crate::agent::FundAgent;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::info;

/// Runs the query pipeline and prints the answer. In streaming mode
/// chunks are written as they arrive; otherwise a spinner covers the
/// whole run.
pub async fn run(agent: &FundAgent, question: &str, stream: bool) -> anyhow::Result<()> {
    info!(question, stream, "Answering query");

    if stream {
        let (tx, mut rx) = mpsc::channel::<String>(32);

        // The sender is dropped when the pipeline finishes, which
        // terminates the printer loop.
        let printer = async move {
            let mut stdout = std::io::stdout();
            while let Some(chunk) = rx.recv().await {
                write!(stdout, "{chunk}")?;
                stdout.flush()?;
            }
            anyhow::Ok(())
        };

        let (run_result, print_result) = tokio::join!(agent.run_stream(question, tx), printer);
        run_result?;
        print_result?;
        println!();
    } else {
        let pb = ui::new_spinner("Thinking...");
        let response = agent.run(question).await;
        pb.finish_and_clear();
        println!("{}", response?);
    }

    ui::print_separator();
    Ok(())
}
