use std::io::Write;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

use crate::turn::Turn;

/// Display surface the controller drives.
///
/// Methods are infallible: a broken display must never break the
/// conversation itself.
pub trait View: Send {
    /// Render one transcript turn.
    fn show(&mut self, turn: &Turn);

    /// Render a display-only system notice that is not part of the transcript.
    fn notice(&mut self, text: &str);

    /// Remove every rendered message.
    fn clear(&mut self);

    /// Toggle the busy indicator.
    fn set_busy(&mut self, busy: bool);

    /// Empty the input field and drop any "ready to send" state.
    fn reset_input(&mut self) {}
}

/// Line-oriented view printing `Label: content` to a writer, with an
/// `indicatif` spinner on stderr while a reply is pending.
pub struct TerminalView<W: Write + Send> {
    out: W,
    spinner: Option<ProgressBar>,
    animate: bool,
}

impl TerminalView<std::io::Stdout> {
    /// View writing to stdout. When `animate` is false the busy indicator
    /// is hidden.
    pub fn stdout(animate: bool) -> Self {
        Self::new(std::io::stdout(), animate)
    }
}

impl<W: Write + Send> TerminalView<W> {
    /// Wrap `out`. When `animate` is false the busy indicator is hidden.
    pub fn new(out: W, animate: bool) -> Self {
        Self {
            out,
            spinner: None,
            animate,
        }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn line(&mut self, label: &str, content: &str) {
        let spinner = self.spinner.clone();
        let write = |out: &mut W| -> std::io::Result<()> {
            writeln!(out, "{label}: {content}")?;
            out.flush()
        };
        let res = match spinner {
            Some(pb) => pb.suspend(|| write(&mut self.out)),
            None => write(&mut self.out),
        };
        if let Err(e) = res {
            warn!(error = %e, "failed to write to terminal");
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn show(&mut self, turn: &Turn) {
        self.line(turn.role.label(), &turn.content);
    }

    fn notice(&mut self, text: &str) {
        self.line("System", text);
    }

    fn clear(&mut self) {
        self.stop_spinner();
        if let Err(e) = writeln!(self.out).and_then(|_| self.out.flush()) {
            warn!(error = %e, "failed to write to terminal");
        }
    }

    fn set_busy(&mut self, busy: bool) {
        if !busy {
            self.stop_spinner();
            return;
        }
        if self.spinner.is_some() {
            return;
        }
        let pb = if self.animate {
            let pb = ProgressBar::new_spinner();
            pb.set_draw_target(ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                pb.set_style(style);
            }
            pb.set_message("thinking...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        self.spinner = Some(pb);
    }
}
