use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use voxli_demo::quota::FileStore;
use voxli_demo::{
    create_router, AppState, CallSessionState, Config, MemoryWaitlist, RateLimiter,
    SessionController, SessionDeps, SessionHandle, SessionSnapshot, UserAction,
};

#[derive(Debug, Parser)]
#[command(name = "voxli-demo", version, about = "Voxli demo-call session service")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/voxli-demo")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP control API (default)
    Serve,
    /// Place one demo call from the terminal
    Call,
    /// Show how many demo calls are left today
    Quota,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Voxli demo v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg).await,
        Command::Call => call(&cfg).await,
        Command::Quota => {
            let limiter = RateLimiter::new(Arc::new(FileStore::new(&cfg.storage.path)));
            let record = limiter.record();
            println!(
                "{} of {} demo calls left today ({} used on {})",
                limiter.remaining(),
                voxli_demo::MAX_DAILY_CALLS,
                record.count,
                record.date
            );
            Ok(())
        }
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    let (controller, events) = SessionController::new(SessionDeps::from_config(cfg)?);
    let (session, driver) = SessionHandle::spawn(controller, events);
    let waitlist = Arc::new(MemoryWaitlist::new());
    let state = AppState::new(session, waitlist.clone());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    // The router (and its session handle) is gone; the session task cleans up and exits
    driver.await.context("Session task panicked")?;
    info!("Waitlist signups this run: {}", waitlist.len().await);
    Ok(())
}

async fn call(cfg: &Config) -> Result<()> {
    let (controller, events) = SessionController::new(SessionDeps::from_config(cfg)?);
    let (session, driver) = SessionHandle::spawn(controller, events);
    let mut updates = session.subscribe();

    let snapshot = session.dispatch(UserAction::StartDemo).await??;
    match snapshot.state {
        CallSessionState::PreCall => {}
        CallSessionState::LimitReached => {
            println!(
                "Daily demo limit reached ({} calls/day). Join the waitlist for unlimited access.",
                voxli_demo::MAX_DAILY_CALLS
            );
            return Ok(());
        }
        _ => {
            println!("{}", snapshot.error_message.unwrap_or_default());
            return Ok(());
        }
    }

    println!(
        "Calling {} (max {} min, {} left today). Ctrl-C hangs up.",
        snapshot.business_name.as_deref().unwrap_or("Voxli"),
        snapshot.max_call_minutes.unwrap_or(2),
        snapshot.remaining_calls
    );

    let snapshot = session.dispatch(UserAction::Confirm).await??;
    if snapshot.state == CallSessionState::Error {
        println!("{}", snapshot.error_message.unwrap_or_default());
        return Ok(());
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot);
                if matches!(snapshot.state, CallSessionState::PostCall | CallSessionState::Error) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = session.dispatch(UserAction::EndCall).await? {
                    warn!("Could not hang up: {}", e);
                }
                break;
            }
        }
    }

    let last = session.snapshot();
    println!();
    match last.state {
        CallSessionState::Error => println!("{}", last.error_message.unwrap_or_default()),
        _ => println!("Call ended after {}. That's Voxli.", last.elapsed_display),
    }

    drop(updates);
    drop(session);
    driver.await.context("Session task panicked")?;
    Ok(())
}

fn render(snapshot: &SessionSnapshot) {
    match snapshot.state {
        CallSessionState::Connecting => print!("\rConnecting to Voxli..."),
        CallSessionState::Active => print!(
            "\r{}  {:<12}{}",
            snapshot.elapsed_display,
            snapshot.speaking.label(),
            if snapshot.muted { "[muted]" } else { "       " }
        ),
        _ => return,
    }
    std::io::stdout().flush().ok();
}
