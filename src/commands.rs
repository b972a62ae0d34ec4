//! Command handlers.

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{DateTime, Local, TimeDelta, Utc};
use ghtt_config::{Config, CredentialStore, FileCredentialStore, TokenSource, resolve_token};
use ghtt_github::{GistStore, OctocrabConnector};
use ghtt_protocol::{Issue, IssueRef};
use ghtt_session::{
    CommitReport, FailureKind, IssueTimerState, Session, SessionController, SessionHandle,
};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::cli::{Cli, Command};

/// Everything a command needs.
struct App {
    config: Config,
    credentials: Arc<dyn CredentialStore>,
    session: SessionHandle,
    token: Option<String>,
}

/// Runs the parsed command line.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().await.context("failed to load config")?,
    };
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(config.credentials_path()?));

    let mut store = GistStore::new(&config.gist.description, &config.gist.filename);
    if let Some(environment) = &config.gist.environment {
        store = store.with_environment(environment);
    }
    let connector = OctocrabConnector::new(&config.api_base_url, config.per_page);
    let controller = SessionController::new(connector, store, Arc::clone(&credentials))
        .with_staleness_check(config.staleness_check);
    let (session, _task) = SessionHandle::spawn(controller);

    let app = App {
        config,
        credentials,
        session,
        token: cli.token,
    };

    match cli.command {
        Command::Login => login(&app).await,
        Command::Logout => logout(&app).await,
        Command::Status => status(&app).await,
        Command::Issues => issues(&app).await,
        Command::Track { issue } => track(&app, &issue).await,
        Command::Untrack { issue } => untrack(&app, &issue).await,
        Command::Start { issue } => start(&app, &issue).await,
        Command::Stop => stop(&app).await,
        Command::Entries { issue } => entries(&app, &issue).await,
        Command::RateLimit => rate_limit(&app).await,
    }
}

/// Logs in with the first token available and returns the session.
async fn open_session(app: &App) -> anyhow::Result<Session> {
    let stored = app.credentials.load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable credential store");
        None
    });
    let Some(resolved) = resolve_token(app.token.as_deref(), stored.as_deref(), &app.config).await
    else {
        bail!("not logged in: run `ghtt login --token <TOKEN>`, set GITHUB_TOKEN, or log in with `gh`");
    };
    debug!(source = %resolved.source, "using token");

    let report = if resolved.source == TokenSource::Stored {
        app.session.restore().await?.unwrap_or_default()
    } else {
        app.session
            .login(SecretString::from(resolved.token))
            .await?
    };
    report_failures(&report);
    Ok(app.session.snapshot().await?)
}

fn report_failures(report: &CommitReport) {
    if report.remote_changed {
        eprintln!("warning: the state gist was changed elsewhere and has been overwritten");
    }
    for failure in &report.failures {
        let step = match failure.kind {
            FailureKind::Credentials => "could not save the token",
            FailureKind::Document => "could not save the state gist",
            FailureKind::Repair => "could not repair the state gist",
            FailureKind::Comment => "could not post the time entry",
        };
        eprintln!("warning: {step}: {}", failure.message);
    }
}

async fn login(app: &App) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    if let Some(user) = &session.user {
        println!("Logged in as {} (@{})", user.display_name(), user.login);
    }
    if let Some(gist) = session.gist_id() {
        println!("State gist: {gist}");
    }
    Ok(())
}

async fn logout(app: &App) -> anyhow::Result<()> {
    let report = app.session.logout().await?;
    report_failures(&report);
    println!("Logged out");
    Ok(())
}

async fn status(app: &App) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    println!("User: @{}", session.login());
    if let Some(gist) = session.gist_id() {
        println!("State gist: {gist}");
    }

    if session.document.issues.is_empty() {
        println!("No tracked issues");
    } else {
        println!("Tracked issues:");
        for issue in &session.document.issues {
            let marker = match session.issue_timer_state(issue.id) {
                IssueTimerState::Running => "▶",
                IssueTimerState::Idle | IssueTimerState::OtherIssue => " ",
            };
            println!("{marker} {:<32} {}", reference(issue), issue.title);
        }
    }

    match &session.document.start {
        Some(timer) => println!(
            "Timer running on {} since {} ({})",
            reference(&timer.issue),
            timer.at.with_timezone(&Local).format("%H:%M"),
            format_duration(Utc::now() - timer.at),
        ),
        None => println!("No timer running"),
    }
    Ok(())
}

async fn issues(app: &App) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    let outcome = app.session.assigned_issues().await?;
    for issue in &outcome.items {
        let marker = if session.document.contains(issue.id) { "*" } else { " " };
        println!("{marker} {:<32} {}", reference(issue), issue.title);
    }
    if let Some(error) = &outcome.error {
        eprintln!(
            "warning: listing stopped after {} page(s): {error}",
            outcome.pages
        );
    }
    Ok(())
}

async fn track(app: &App, issue_ref: &IssueRef) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    if let Some(issue) = find(&session.document.issues, issue_ref) {
        println!("Already tracking {}", issue.title);
        return Ok(());
    }

    let issue = find_assigned(app, issue_ref).await?;
    let title = issue.title.clone();
    report_failures(&app.session.add_issue(issue).await?);
    println!("Tracking {issue_ref}: {title}");
    Ok(())
}

async fn untrack(app: &App, issue_ref: &IssueRef) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    let Some(issue) = find(&session.document.issues, issue_ref) else {
        bail!("{issue_ref} is not tracked");
    };
    report_failures(&app.session.drop_issue(issue.id).await?);
    println!("No longer tracking {issue_ref}");
    Ok(())
}

async fn start(app: &App, issue_ref: &IssueRef) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    let issue = match find(&session.document.issues, issue_ref) {
        Some(issue) => issue.clone(),
        None => {
            let issue = find_assigned(app, issue_ref).await?;
            report_failures(&app.session.add_issue(issue.clone()).await?);
            issue
        }
    };

    if let Some(previous) = &session.document.start {
        println!(
            "Discarding timer on {} started at {}",
            reference(&previous.issue),
            previous.at.with_timezone(&Local).format("%H:%M"),
        );
    }
    let title = issue.title.clone();
    report_failures(&app.session.start_timer(issue, Utc::now()).await?);
    println!("Timer started on {issue_ref}: {title}");
    Ok(())
}

async fn stop(app: &App) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    let Some(timer) = session.document.start else {
        println!("No timer running");
        return Ok(());
    };

    let report = app.session.stop_timer(Utc::now()).await?;
    report_failures(&report);
    if let Some(entry) = report.entry {
        println!(
            "Recorded {} on {}",
            format_duration(entry.duration()),
            reference(&timer.issue)
        );
    }
    Ok(())
}

async fn entries(app: &App, issue_ref: &IssueRef) -> anyhow::Result<()> {
    let session = open_session(app).await?;
    let issue = match find(&session.document.issues, issue_ref) {
        Some(issue) => issue.clone(),
        None => find_assigned(app, issue_ref).await?,
    };

    let outcome = app.session.time_entries(issue).await?;
    let mut total = TimeDelta::zero();
    for entry in &outcome.items {
        total += entry.duration();
        println!(
            "{}  {}-{}  {:>6}  @{}",
            local(entry.begin).format("%Y-%m-%d"),
            local(entry.begin).format("%H:%M"),
            local(entry.end).format("%H:%M"),
            format_duration(entry.duration()),
            entry.user,
        );
    }
    println!("Total: {} in {} entries", format_duration(total), outcome.items.len());
    if let Some(error) = &outcome.error {
        eprintln!("warning: the total is incomplete: {error}");
    }
    Ok(())
}

async fn rate_limit(app: &App) -> anyhow::Result<()> {
    open_session(app).await?;
    let snapshot = app.session.rate_limits().snapshot();
    let now = Utc::now();
    for record in snapshot.records.values() {
        let reset = TimeDelta::from_std(record.reset_after(now)).unwrap_or(TimeDelta::zero());
        println!(
            "{:<12} {:>6}/{:<6} used, {} left, resets in {}",
            record.resource,
            record.used,
            record.limit,
            record.remaining,
            format_duration(reset),
        );
    }
    if snapshot.critical {
        println!("Less than half of a quota remains");
    }
    Ok(())
}

async fn find_assigned(app: &App, issue_ref: &IssueRef) -> anyhow::Result<Issue> {
    let outcome = app.session.assigned_issues().await?;
    if let Some(issue) = find(&outcome.items, issue_ref) {
        return Ok(issue.clone());
    }
    match outcome.error {
        Some(error) => Err(error).context(format!("could not look up {issue_ref}")),
        None => bail!("{issue_ref} is not assigned to you"),
    }
}

fn find<'a>(issues: &'a [Issue], issue_ref: &IssueRef) -> Option<&'a Issue> {
    issues.iter().find(|issue| issue_ref.matches(issue))
}

fn reference(issue: &Issue) -> String {
    issue
        .reference()
        .map_or_else(|| format!("#{}", issue.number), |reference| reference.to_string())
}

fn local(at: DateTime<Utc>) -> DateTime<Local> {
    at.with_timezone(&Local)
}

/// Formats a span as `H:MM`.
fn format_duration(span: TimeDelta) -> String {
    let minutes = span.num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use ghtt_protocol::dummy::dummy_issues;

    use super::*;

    #[test]
    fn formats_durations_as_hours_and_minutes() {
        assert_eq!(format_duration(TimeDelta::minutes(0)), "0:00");
        assert_eq!(format_duration(TimeDelta::minutes(75)), "1:15");
        assert_eq!(format_duration(TimeDelta::hours(26)), "26:00");
        assert_eq!(format_duration(TimeDelta::minutes(-5)), "0:00");
    }

    #[test]
    fn finds_issues_by_reference() {
        let issues = dummy_issues();
        let issue_ref: IssueRef = "Octocat/Tracker#31".parse().unwrap();

        let issue = find(&issues, &issue_ref).unwrap();
        assert_eq!(issue.title, "Add CSV export");
        assert_eq!(reference(issue), "octocat/tracker#31");
        assert!(find(&issues, &"octocat/tracker#999".parse().unwrap()).is_none());
    }
}
