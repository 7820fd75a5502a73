//! Drawing the verification form
use sk_portal_core::{
    countdown::format_mm_ss,
    session::{Notice, SessionView},
};
use std::io::Write;

/// Output side of a verification screen.
pub trait Screen: Send {
    /// Called whenever the visible state changed
    fn render(&mut self, view: &SessionView);

    /// Show a one-off message
    fn notify(&mut self, notice: &Notice);
}

/// Draws the form as a single status line on stdout.
#[derive(Debug, Default)]
pub struct TerminalScreen;

impl Screen for TerminalScreen {
    fn render(&mut self, view: &SessionView) {
        let mut out = std::io::stdout().lock();
        // Not worth failing the flow over a broken stdout
        let _ = writeln!(out, "{}", status_line(view));
        let _ = out.flush();
    }

    fn notify(&mut self, notice: &Notice) {
        match notice {
            Notice::Error(_) | Notice::ResendFailed(_) => eprintln!("{notice}"),
            _ => println!("{notice}"),
        }
    }
}

pub fn status_line(view: &SessionView) -> String {
    let boxes: String = view
        .digits
        .iter()
        .map(|d| format!("[{}]", d.unwrap_or('_')))
        .collect();

    let timer = if view.remaining_seconds > 0 {
        format!("Code expires in {}", format_mm_ss(view.remaining_seconds))
    } else {
        "Code expired".to_string()
    };

    let action = if view.is_loading {
        "verifying..."
    } else if view.is_resending {
        "sending..."
    } else if view.can_resend {
        "type :r to resend"
    } else {
        "enter the code"
    };

    format!("{boxes}  {timer}  ({action})")
}
