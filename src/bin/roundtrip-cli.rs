#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for sending, searching and round-trip checking test mail

use clap::{Parser, Subcommand};
use mail_roundtrip::{
    Attachment, Email, Folder, Harness, ImapClient, ImapConfig, MessageBuilder, SearchQuery,
    SmtpClient, SmtpConfig, random_address, random_text,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roundtrip-cli")]
#[command(about = "Send, search and verify mail through an SMTP relay and IMAP mailbox")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compose and send one message
    Send {
        /// Envelope sender (random if omitted)
        #[arg(long)]
        from: Option<String>,

        /// Recipient, repeatable (one random recipient if omitted)
        #[arg(long)]
        to: Vec<String>,

        /// Subject (random if omitted)
        #[arg(long)]
        subject: Option<String>,

        /// Body text (random if omitted)
        #[arg(long)]
        body: Option<String>,

        /// File to attach, repeatable
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Search the mailbox
    Search {
        /// Substring of a recipient address
        #[arg(long)]
        to: Option<String>,

        /// Substring of the sender address
        #[arg(long)]
        from: Option<String>,

        /// Substring of the subject
        #[arg(long)]
        subject: Option<String>,

        /// Substring of the body
        #[arg(long)]
        body: Option<String>,

        /// Mailbox to search in (defaults to IMAP_MAILBOX)
        #[arg(long)]
        mailbox: Option<String>,
    },

    /// Send a generated message and verify it comes back unchanged
    Check {
        /// File to attach, repeatable
        #[arg(long)]
        attach: Vec<PathBuf>,

        /// Number of generated recipients
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..))]
        recipients: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Send {
            from,
            to,
            subject,
            body,
            attach,
        } => {
            cmd_send(
                &args,
                from.clone(),
                to.clone(),
                subject.clone(),
                body.clone(),
                attach,
            )
            .await?;
        }
        Command::Search {
            to,
            from,
            subject,
            body,
            mailbox,
        } => {
            let query = build_query(
                to.as_deref(),
                from.as_deref(),
                subject.as_deref(),
                body.as_deref(),
            );
            cmd_search(&args, &query, mailbox.as_deref()).await?;
        }
        Command::Check { attach, recipients } => {
            cmd_check(&args, attach, usize::from(*recipients)).await?;
        }
    }

    Ok(())
}

async fn cmd_send(
    args: &Args,
    from: Option<String>,
    to: Vec<String>,
    subject: Option<String>,
    body: Option<String>,
    attach: &[PathBuf],
) -> anyhow::Result<()> {
    let to = if to.is_empty() {
        vec![random_address()]
    } else {
        to
    };

    let message = compose(
        from.unwrap_or_else(random_address),
        to,
        subject.unwrap_or_else(|| random_text(16, 2)),
        body.unwrap_or_else(|| random_text(64, 8)),
        attach,
    )
    .await?;

    let client = SmtpClient::new(SmtpConfig::from_env()?);
    client.send_message(&message).await?;
    let sent = message.parse()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sent)?);
    } else {
        println!(
            "Sent \"{}\" from {} to {} ({} part(s))",
            message.subject(),
            message.from(),
            message.to().join(", "),
            sent.parts.len()
        );
    }

    Ok(())
}

async fn cmd_search(
    args: &Args,
    query: &SearchQuery,
    mailbox: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = ImapConfig::from_env()?;
    if let Some(mailbox) = mailbox {
        config.mailbox = Folder::from(mailbox);
    }

    let client = ImapClient::new(config);
    let emails = client.search(query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&emails)?);
    } else {
        print_email_table(&emails);
    }

    Ok(())
}

async fn cmd_check(args: &Args, attach: &[PathBuf], recipients: usize) -> anyhow::Result<()> {
    let harness = Harness::from_env()?;

    let to: Vec<String> = (0..recipients).map(|_| random_address()).collect();
    let subject = random_text(24, 3);
    let message = compose(
        random_address(),
        to.clone(),
        subject.clone(),
        random_text(128, 16),
        attach,
    )
    .await?;

    let query = to
        .iter()
        .fold(SearchQuery::new().subject(&subject), |q, addr| q.to(addr));
    let received = harness.roundtrip(&message, &query).await?;

    if args.json {
        let report = serde_json::json!({
            "status": "ok",
            "subject": subject,
            "recipients": to,
            "parts": received.parts,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "OK: \"{}\" round-tripped to {} recipient(s), {} part(s) verified",
            subject,
            to.len(),
            received.parts.len()
        );
    }

    Ok(())
}

async fn compose(
    from: String,
    to: Vec<String>,
    subject: String,
    body: String,
    attach: &[PathBuf],
) -> anyhow::Result<mail_roundtrip::OutgoingMessage> {
    let mut builder = MessageBuilder::new()
        .from(from)
        .to_all(to)
        .subject(subject)
        .body(body);

    for path in attach {
        builder = builder.attachment(Attachment::from_path(path).await?);
    }

    Ok(builder.build()?)
}

fn build_query(
    to: Option<&str>,
    from: Option<&str>,
    subject: Option<&str>,
    body: Option<&str>,
) -> SearchQuery {
    let mut query = SearchQuery::new();
    if let Some(to) = to {
        query = query.to(to);
    }
    if let Some(from) = from {
        query = query.from(from);
    }
    if let Some(subject) = subject {
        query = query.subject(subject);
    }
    if let Some(body) = body {
        query = query.body(body);
    }
    query
}

fn print_email_table(emails: &[Email]) {
    if emails.is_empty() {
        println!("No emails found.");
        return;
    }

    let header = format!("{:<6} {:<30} {:<6} {}", "SEQ", "From", "Parts", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(80));

    for email in emails {
        println!(
            "{:<6} {:<30} {:<6} {}",
            email.seq.map_or_else(|| "-".to_string(), |s| s.to_string()),
            truncate(&email.from.join(", "), 28),
            email.parts.len(),
            truncate(email.subject_or_empty(), 40),
        );
    }

    println!("\n{} email(s)", emails.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
