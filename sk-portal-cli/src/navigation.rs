//! The router's side of a verification screen
use url::Url;

/// What a verification screen may ask of the surrounding router.
pub trait Navigator: Send {
    /// The screen can't be shown, send the user back to login
    fn redirect_to_login(&mut self);

    /// Leave for `destination` with a full reload, dropping all client state
    fn reload(&mut self, destination: &Url);

    /// Stop "back" from returning to a finished verification screen
    fn guard_back_navigation(&mut self);
}

impl<T: Navigator + ?Sized> Navigator for &mut T {
    fn redirect_to_login(&mut self) {
        (**self).redirect_to_login()
    }

    fn reload(&mut self, destination: &Url) {
        (**self).reload(destination)
    }

    fn guard_back_navigation(&mut self) {
        (**self).guard_back_navigation()
    }
}

/// Navigator for the terminal: there is no page to load, so it reports
/// where a browser would go next.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_to_login(&mut self) {
        tracing::info!("Redirecting to login");
        println!("Please log in first: sk-portal login");
    }

    fn reload(&mut self, destination: &Url) {
        tracing::info!(%destination, "Navigating away from verification");
        println!("Continue at {destination}");
    }

    fn guard_back_navigation(&mut self) {
        // A terminal has no history to go back through.
        tracing::debug!("Back navigation to the verification screen is now blocked");
    }
}
