mod cli;

use crate::cli::Cli;
use clap::Parser;
use drivesort_config::{BackoffKind, Credential, Loader, RetrySettings, Settings};
use drivesort_library::organize::{OrganizeEvent, organize};
use drivesort_library::{Backoff, Context, RetryPolicy};
use drivesort_storage::backend::{GraphBackend, ReadOnlyBackend};
use drivesort_storage::{BackendHandle, StaticToken, TokenHandle, auth::RefreshTokenProvider};
use futures::StreamExt;
use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Logs go to stderr; stdout is the progress line.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with_writer(std::io::stderr)
        .init();

    // Must be read while the process is still single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not determine local UTC offset, dates will be in UTC");
        UtcOffset::UTC
    });

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::FAILURE;
        },
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Could not start async runtime: {e}");
            return ExitCode::FAILURE;
        },
    };
    let ctx = Context::new(settings.photos_folder_path.clone())
        .with_offset(offset)
        .with_retry(retry_policy(&settings.retry));
    runtime.block_on(async {
        let backend = backend(&settings, cli.dry_run);
        run(&backend, &ctx).await
    })
}

fn load_settings(cli: &Cli) -> drivesort_config::error::Result<Settings> {
    let mut loader = Loader::new(cli.config.as_deref())?;
    if let Some(source) = &cli.source {
        loader = loader.set("photos_folder_path", source);
    }
    loader.load()
}

fn backend(settings: &Settings, dry_run: bool) -> BackendHandle {
    let client = reqwest::Client::new();
    let tokens: TokenHandle = match settings.credential() {
        Some(Credential::RefreshToken(token)) => Arc::new(RefreshTokenProvider::new(
            client.clone(),
            &settings.application_id,
            &settings.redirect_uri,
            token,
        )),
        Some(Credential::AccessToken(token)) => Arc::new(StaticToken::new(token)),
        // Settings validation rejects this; the token provider reports it on
        // first use anyway.
        None => Arc::new(StaticToken::new("")),
    };
    let graph: BackendHandle = Arc::new(GraphBackend::with_client("onedrive", client, tokens));
    if dry_run {
        tracing::info!("Dry run: nothing on the drive will be changed");
        Arc::new(ReadOnlyBackend::new(graph))
    } else {
        graph
    }
}

fn retry_policy(settings: &RetrySettings) -> RetryPolicy {
    let backoff = match settings.backoff {
        BackoffKind::Fixed => Backoff::Fixed(settings.delay()),
        BackoffKind::Exponential => Backoff::Exponential {
            initial: settings.delay(),
            max: settings.max_delay(),
        },
    };
    RetryPolicy::new(settings.attempts, backoff)
}

async fn run(backend: &BackendHandle, ctx: &Context) -> ExitCode {
    let events = organize(backend, ctx);
    futures::pin_mut!(events);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let terminal = std::io::stdout().is_terminal();
    let mut stdout = std::io::stdout();
    let mut progress_shown = false;

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                if progress_shown && terminal {
                    println!();
                }
                tracing::warn!("Interrupted, stopping");
                return ExitCode::from(EXIT_INTERRUPTED);
            }
            event = events.next() => {
                match event {
                    Some(Ok(OrganizeEvent::NothingToDo)) => println!("No items in photos folder!"),
                    Some(Ok(OrganizeEvent::Organized { progress, .. })) => {
                        if terminal {
                            print!("{progress}\r");
                            // A failed flush only delays the progress line.
                            _ = stdout.flush();
                        } else {
                            println!("{progress}");
                        }
                        progress_shown = true;
                    },
                    Some(Ok(OrganizeEvent::Complete(moved))) => {
                        if progress_shown && terminal {
                            println!();
                        }
                        tracing::info!(moved, "Done");
                    },
                    Some(Ok(OrganizeEvent::Started | OrganizeEvent::DiscoveryComplete(_))) => (),
                    Some(Err(e)) => {
                        if progress_shown && terminal {
                            println!();
                        }
                        eprintln!("{e:?}");
                        return ExitCode::FAILURE;
                    },
                    None => return ExitCode::SUCCESS,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retry_policy_from_settings() {
        let policy = retry_policy(&RetrySettings::default());
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Backoff::Fixed(Duration::from_secs(3)));

        let settings = RetrySettings {
            attempts: 5,
            delay_secs: 2,
            backoff: BackoffKind::Exponential,
            max_delay_secs: 30,
        };
        let policy = retry_policy(&settings);
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(
            policy.backoff(),
            Backoff::Exponential {
                initial: Duration::from_secs(2),
                max: Duration::from_secs(30),
            }
        );
    }
}
