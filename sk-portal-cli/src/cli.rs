//! Main sk-portal command line entry points
use crate::{
    api::PortalClient,
    controller::{initialize, Input, Outcome, VerificationController},
    navigation::{Navigator, TerminalNavigator},
    paths::config_file,
    pending::{PendingSession, PendingSessionStore},
    screen::TerminalScreen,
    settings::Settings,
};
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use inquire::ui::RenderConfig;
use sk_portal_core::{
    code::BoxEvent,
    common::{LoginRequest, Purpose},
    email::Email,
};
use std::{io::BufRead, path::PathBuf};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "sk-portal")]
#[command(about = "Log into the SK portal and verify one-time passcodes from the command line")]
pub struct Cli {
    #[arg(
        long,
        help = "Path of the file remembering a login that still needs its verification code"
    )]
    session_file: Option<PathBuf>,
    #[arg(long, help = "Whether to turn off ansi terminal colors")]
    no_colors: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in with email and password, continuing with two-factor verification when required
    Login(LoginCommand),
    /// Verify the email address of a newly registered account
    Verify(VerifyCommand),
    /// Enter the two-factor code of a pending login
    TwoFactor(VerifyCommand),
    /// Print file paths used by the application (e.g. the path to config)
    Paths,
}

#[derive(Debug, Parser)]
pub struct LoginCommand {
    /// Email address of the account. Prompted for if not provided.
    #[arg(long)]
    email: Option<Email>,
}

#[derive(Debug, Parser)]
pub struct VerifyCommand {
    /// Email address the code was sent to.
    /// If not provided, the email of the pending login is used.
    #[arg(long)]
    email: Option<Email>,
}

impl Cli {
    pub async fn run(&self, mut settings: Settings) -> Result<()> {
        let ansi = !self.no_colors;
        setup_tracing(ansi);

        if let Some(session_file) = &self.session_file {
            settings.session_file = session_file.clone();
        }

        let store = PendingSessionStore::new(settings.session_file.clone());
        let client = PortalClient::new(
            settings.api_endpoint.clone(),
            settings.timing.request_timeout(),
        )?;

        match &self.command {
            Commands::Login(login) => {
                let render_config = if ansi {
                    RenderConfig::default_colored()
                } else {
                    RenderConfig::empty()
                };

                let email = match &login.email {
                    Some(email) => email.clone(),
                    None => inquire::Text::new("What's your email address?")
                        .with_render_config(render_config)
                        .prompt()?
                        .parse::<Email>()?,
                };
                let password = inquire::Password::new("Password:")
                    .without_confirmation()
                    .with_render_config(render_config)
                    .prompt()?;

                let response = client
                    .login(&LoginRequest {
                        email: email.clone(),
                        password,
                    })
                    .await?;

                if !response.success {
                    bail!(response
                        .message
                        .unwrap_or_else(|| "Login failed".to_string()));
                }

                if response.requires_two_factor {
                    store.save(&PendingSession {
                        email,
                        purpose: Purpose::TwoFactor,
                    })?;
                    verify(&settings, &store, client, None, Purpose::TwoFactor).await?;
                } else {
                    println!("Successfully logged in");
                    tracing::info!(%email, "Logged in without second factor");
                }
            }
            Commands::Verify(cmd) => {
                verify(
                    &settings,
                    &store,
                    client,
                    cmd.email.clone(),
                    Purpose::SignupVerification,
                )
                .await?;
            }
            Commands::TwoFactor(cmd) => {
                verify(&settings, &store, client, cmd.email.clone(), Purpose::TwoFactor).await?;
            }
            Commands::Paths => {
                println!(
                    "{}",
                    config_file().to_str().expect("non utf8 config file path?")
                );
                println!(
                    "{}",
                    settings
                        .session_file
                        .to_str()
                        .expect("non utf8 session file path")
                );
            }
        }

        Ok(())
    }
}

async fn verify(
    settings: &Settings,
    store: &PendingSessionStore,
    client: PortalClient,
    email: Option<Email>,
    purpose: Purpose,
) -> Result<()> {
    let mut navigator = TerminalNavigator;
    let session = initialize(email, purpose, store.load()?, &mut navigator)?;

    println!(
        "Enter the 6-digit code sent to {}. Type :r to resend, :q to quit.",
        session.email()
    );

    let controller =
        VerificationController::new(session, client, TerminalScreen, &mut navigator, settings)?;
    let cancel = controller.cancel_token();

    let (inputs, receiver) = mpsc::channel(16);
    // Blocking stdin reads would hold up runtime shutdown, so they get a
    // detached thread instead of the blocking pool.
    std::thread::spawn(move || read_inputs(inputs));
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = controller.run(receiver).await;
    interrupt.abort();

    match outcome {
        Outcome::Verified { destination } => {
            store.clear()?;
            navigator.guard_back_navigation();
            tracing::info!(%destination, "Verification finished");
            Ok(())
        }
        Outcome::Unmounted => Err(anyhow!("Verification cancelled")),
    }
}

/// Feed stdin lines to the controller until EOF or `:q`.
fn read_inputs(inputs: mpsc::Sender<Input>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%e, "Reading stdin failed");
                return;
            }
        };
        let Some(batch) = parse_line(&line) else {
            return;
        };
        for input in batch {
            if inputs.blocking_send(input).is_err() {
                return;
            }
        }
    }
}

/// Translate one line of terminal input into form events.
///
/// A six digit line counts as a paste, anything else as keystrokes into the
/// focused box. Either way the form is submitted afterwards.
/// `None` means the user wants to leave.
pub fn parse_line(line: &str) -> Option<Vec<Input>> {
    let line = line.trim();
    match line {
        ":q" | ":quit" => None,
        ":r" | ":resend" => Some(vec![Input::Resend]),
        "" => Some(Vec::new()),
        _ if line.len() == 6 && line.chars().all(|c| c.is_ascii_digit()) => Some(vec![
            Input::Key(BoxEvent::Paste(line.to_string())),
            Input::Submit,
        ]),
        _ => Some(
            line.chars()
                .map(|c| Input::Key(BoxEvent::Type(c)))
                .chain(std::iter::once(Input::Submit))
                .collect(),
        ),
    }
}

fn setup_tracing(ansi: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::from_default_env())
        .init();
}
