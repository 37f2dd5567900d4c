//! Interactive loop around a [`TurnController`].
//!
//! Input lines and the in-flight inference call are awaited together, so
//! `/reset` and `/quit` keep working while the model is thinking.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::controller::{BUSY_NOTICE, PendingTurn, SubmitError, TurnController};
use crate::llm::{InferenceClient, InferenceError};
use crate::render::render_page;

/// Printed for `/help` and for `/export` without a path.
pub const HELP: &str = "Commands: /reset starts over, /export <file.html> saves the conversation, /quit exits.";

type Settled = (PendingTurn, Result<String, InferenceError>);

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    Reset,
    Export(&'a str),
    Quit,
    Help,
}

/// Only known command names are commands; any other line is sent as is.
fn parse(line: &str) -> Command<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "reset" => Command::Reset,
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        "export" if arg.is_empty() => Command::Help,
        "export" => Command::Export(arg),
        _ => Command::Say(line),
    }
}

fn dispatch(client: Arc<dyn InferenceClient>, pending: PendingTurn) -> BoxFuture<'static, Settled> {
    async move {
        let outcome = client.generate(pending.prompt()).await;
        (pending, outcome)
    }
    .boxed()
}

async fn settle(slot: &mut Option<BoxFuture<'static, Settled>>) -> Settled {
    match slot {
        Some(call) => {
            let settled = call.as_mut().await;
            *slot = None;
            settled
        }
        None => std::future::pending().await,
    }
}

fn apply(controller: &mut TurnController, settled: Settled) {
    let (pending, outcome) = settled;
    if let Err(e) = controller.complete(pending, outcome) {
        error!(error = %e, "failed to save conversation");
        controller.notice(&format!("Could not save the conversation: {e}"));
    }
}

async fn export(controller: &mut TurnController, path: &str) {
    let page = render_page("Conversation", controller.transcript());
    match tokio::fs::write(path, page).await {
        Ok(()) => {
            info!(path, "transcript exported");
            controller.notice(&format!("Conversation exported to {path}"));
        }
        Err(e) => {
            warn!(path, error = %e, "export failed");
            controller.notice(&format!("Could not export to {path}: {e}"));
        }
    }
}

/// Drive `controller` from `input` until end of input or `/quit`.
///
/// At end of input a pending reply is still awaited and recorded.
pub async fn run<R>(controller: &mut TurnController, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut inflight: Option<BoxFuture<'static, Settled>> = None;

    loop {
        tokio::select! {
            biased;
            settled = settle(&mut inflight) => apply(controller, settled),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse(&line) {
                    Command::Quit => return Ok(()),
                    Command::Help => controller.notice(HELP),
                    Command::Export(path) => export(controller, path).await,
                    Command::Reset => {
                        if let Err(e) = controller.reset() {
                            error!(error = %e, "failed to clear stored conversation");
                            controller.notice(&format!("Could not clear the stored conversation: {e}"));
                        }
                    }
                    Command::Say(text) => match controller.begin(text) {
                        Ok(Some(pending)) => inflight = Some(dispatch(controller.client(), pending)),
                        Ok(None) => {}
                        Err(SubmitError::Busy) => controller.notice(BUSY_NOTICE),
                        Err(SubmitError::Store(e)) => {
                            error!(error = %e, "failed to save conversation");
                            controller.notice(&format!("Could not save the conversation: {e}"));
                        }
                    },
                }
            }
        }
    }

    if let Some(call) = inflight.take() {
        apply(controller, call.await);
    }
    Ok(())
}
