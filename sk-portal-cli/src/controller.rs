//! Drives one OTP verification screen.
//!
//! The controller owns a [`VerificationSession`] and everything with a
//! lifetime attached to it: the one-second countdown tick, the status poll,
//! a pending reconciliation check, requests in flight and the
//! post-verification redirect delay. All of them live inside
//! [`VerificationController::run`], so returning from it, for whatever
//! reason, stops every timer and abandons every request at once.
use crate::{
    api::OtpApi,
    navigation::Navigator,
    pending::PendingSession,
    screen::Screen,
    settings::{Settings, TimingSettings},
};
use anyhow::{Context, Result};
use sk_portal_core::{
    code::BoxEvent,
    common::{OtpStatusResponse, Purpose, ResendOtpResponse, VerifyOtpResponse},
    email::Email,
    error::InitError,
    session::{Notice, SessionView, StatusOutcome, TickOutcome, VerificationSession},
    throttle::Throttle,
};
use std::{future::Future, pin::Pin};
use tokio::{
    sync::mpsc,
    time::{interval, sleep, Instant, MissedTickBehavior, Sleep},
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// User interaction with the verification form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Key or paste event on the code boxes
    Key(BoxEvent),
    /// The verify button
    Submit,
    /// The resend button
    Resend,
}

/// How a verification screen was left
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The code was accepted and the user was sent to `destination`
    Verified { destination: Url },
    /// The screen went away before verification finished
    Unmounted,
}

enum Step {
    Continue,
    Verified,
    Unmounted,
}

/// Work out which email a verification screen is for.
///
/// An explicitly passed email wins. Otherwise a pending session for the
/// same purpose is used. With neither, the user is sent back to login.
pub fn initialize(
    email: Option<Email>,
    purpose: Purpose,
    pending: Option<PendingSession>,
    navigator: &mut impl Navigator,
) -> Result<VerificationSession, InitError> {
    let email = email.or_else(|| {
        pending
            .filter(|session| session.purpose == purpose)
            .map(|session| session.email)
    });

    match email {
        Some(email) => {
            tracing::info!(%email, %purpose, "Mounting verification screen");
            Ok(VerificationSession::new(email, purpose))
        }
        None => {
            tracing::warn!(%purpose, "No email to verify");
            navigator.redirect_to_login();
            Err(InitError::NoEmail)
        }
    }
}

type Request<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Completion of a resend or verify request. At most one of them is in
/// flight at a time.
enum Action {
    Resend(Result<ResendOtpResponse>),
    Verify(Result<VerifyOtpResponse>),
}

pub struct VerificationController<A, S, N> {
    session: VerificationSession,
    api: A,
    screen: S,
    navigator: N,
    timing: TimingSettings,
    throttle: Throttle,
    destination: Url,
    cancel: CancellationToken,
    last_view: Option<SessionView>,
    status_request: Option<Request<Result<OtpStatusResponse>>>,
    action_request: Option<Request<Action>>,
}

impl<A, S, N> std::fmt::Debug for VerificationController<A, S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationController")
            .field("session", &self.session)
            .field("destination", &self.destination)
            .field("status_in_flight", &self.status_request.is_some())
            .field("action_in_flight", &self.action_request.is_some())
            .finish_non_exhaustive()
    }
}

impl<A, S, N> VerificationController<A, S, N>
where
    A: OtpApi + Clone + 'static,
    S: Screen,
    N: Navigator,
{
    pub fn new(
        session: VerificationSession,
        api: A,
        screen: S,
        navigator: N,
        settings: &Settings,
    ) -> Result<Self> {
        let destination = settings
            .portal_url
            .join(session.purpose().destination_path())
            .context("Building post-verification URL")?;

        Ok(Self {
            session,
            api,
            screen,
            navigator,
            timing: settings.timing.clone(),
            throttle: Throttle::new(settings.timing.status_throttle()),
            destination,
            cancel: CancellationToken::new(),
            last_view: None,
            status_request: None,
            action_request: None,
        })
    }

    /// Cancelling this token unmounts the screen. In-flight requests are
    /// abandoned and their responses never touch the session.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the screen until it is verified or unmounted.
    ///
    /// Requests run alongside the timers and user input, so a slow server
    /// never stalls the countdown. Closing the `inputs` channel counts as
    /// unmounting.
    #[tracing::instrument(skip_all, fields(email = %self.session.email(), purpose = %self.session.purpose()))]
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> Outcome {
        let mut tick = interval(self.timing.tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first poll tick completes immediately: that's the check on mount.
        let mut poll = interval(self.timing.poll());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reconcile: Option<Pin<Box<Sleep>>> = None;

        self.render();

        loop {
            let step = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => Step::Unmounted,

                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => Step::Unmounted,
                },

                action = in_flight(&mut self.action_request), if self.action_request.is_some() => {
                    self.action_request = None;
                    match action {
                        Action::Resend(result) => self.resend_finished(result),
                        Action::Verify(result) => self.verify_finished(result),
                    }
                }

                result = in_flight(&mut self.status_request), if self.status_request.is_some() => {
                    self.status_request = None;
                    self.status_finished(result)
                }

                _ = async { if let Some(sleep) = reconcile.as_mut() { sleep.await } }, if reconcile.is_some() => {
                    reconcile = None;
                    tracing::debug!("Reconciling expired countdown with the server");
                    self.check_status();
                    Step::Continue
                }

                _ = tick.tick(), if self.session.countdown_running() => {
                    if self.on_tick() == TickOutcome::Expired {
                        reconcile = Some(Box::pin(sleep(self.timing.reconcile_delay())));
                    }
                    Step::Continue
                }

                _ = poll.tick() => {
                    self.check_status();
                    Step::Continue
                }
            };

            match step {
                Step::Continue => {}
                Step::Unmounted => {
                    tracing::info!("Verification screen unmounted");
                    return Outcome::Unmounted;
                }
                Step::Verified => break,
            }
        }

        drop((tick, poll, reconcile));
        self.finish().await
    }

    fn handle_input(&mut self, input: Input) -> Step {
        match input {
            Input::Key(event) => {
                self.session.key(event);
                self.render();
            }
            Input::Submit => self.submit(),
            Input::Resend => self.resend(true),
        }
        Step::Continue
    }

    fn on_tick(&mut self) -> TickOutcome {
        let outcome = self.session.tick(Instant::now().into_std());
        if outcome != TickOutcome::Unchanged {
            self.render();
        }
        outcome
    }

    fn check_status(&mut self) {
        if self.status_request.is_some() {
            tracing::debug!("Status check already in flight");
            return;
        }
        if !self.throttle.permit(Instant::now().into_std()) {
            tracing::debug!("Status check throttled");
            return;
        }

        let api = self.api.clone();
        let email = self.session.email().clone();
        let purpose = self.session.purpose();
        self.status_request = Some(Box::pin(async move {
            api.otp_status(&email, purpose).await
        }));
    }

    fn status_finished(&mut self, result: Result<OtpStatusResponse>) -> Step {
        let outcome = match result {
            Ok(response) => self.session.apply_status(&response, Instant::now().into_std()),
            Err(e) => {
                tracing::warn!(?e, "Status check failed, allowing resend");
                self.session.status_failed()
            }
        };
        self.render();

        if outcome == StatusOutcome::AutoIssue {
            self.resend(false);
        }
        Step::Continue
    }

    fn resend(&mut self, force: bool) {
        if self.action_request.is_some() {
            tracing::debug!("Resend requested while another request is in flight, ignoring");
            return;
        }
        let Some(request) = self.session.begin_resend(force) else {
            return;
        };
        self.render();

        let api = self.api.clone();
        self.action_request = Some(Box::pin(async move {
            Action::Resend(api.resend(&request).await)
        }));
    }

    fn resend_finished(&mut self, result: Result<ResendOtpResponse>) -> Step {
        let notice = match result {
            Ok(response) => self
                .session
                .finish_resend(&response, Instant::now().into_std()),
            Err(e) => {
                tracing::warn!(?e, "Resend failed");
                self.session.resend_failed()
            }
        };
        self.screen.notify(&notice);
        self.render();
        Step::Continue
    }

    fn submit(&mut self) {
        let request = match self.session.begin_submit() {
            Ok(request) => request,
            Err(e) => {
                self.screen.notify(&Notice::Error(e));
                return;
            }
        };
        self.render();

        let api = self.api.clone();
        self.action_request = Some(Box::pin(async move {
            Action::Verify(api.verify(&request).await)
        }));
    }

    fn verify_finished(&mut self, result: Result<VerifyOtpResponse>) -> Step {
        let verdict = match result {
            Ok(response) => self.session.finish_verify(&response),
            Err(e) => {
                tracing::warn!(?e, "Verify request failed");
                Err(self.session.verify_failed())
            }
        };

        match verdict {
            Ok(()) => Step::Verified,
            Err(e) => {
                tracing::info!(%e, "Code not accepted");
                self.screen.notify(&Notice::Error(e));
                self.render();
                Step::Continue
            }
        }
    }

    async fn finish(mut self) -> Outcome {
        tracing::info!("Code verified");
        // A status check still in flight must not touch the cleared session.
        self.status_request = None;
        self.screen.notify(&Notice::Verified);
        self.render();

        let delay = self.timing.redirect_delay();
        if until_cancelled(&self.cancel, sleep(delay)).await.is_none() {
            return Outcome::Unmounted;
        }

        self.navigator.reload(&self.destination);
        Outcome::Verified {
            destination: self.destination,
        }
    }

    fn render(&mut self) {
        let view = self.session.view();
        if self.last_view.as_ref() != Some(&view) {
            self.screen.render(&view);
            self.last_view = Some(view);
        }
    }
}

/// Resolves with the output of the request in `slot`. Only polled while the
/// slot is filled.
async fn in_flight<T>(slot: &mut Option<Request<T>>) -> T {
    match slot.as_mut() {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
