use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{DurableSessionStore, HttpReadingApi, SessionStore};
use shared::{domain::Phase, protocol::UserProfileDraft};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Command-line driver for the reading-strategy learning session")]
struct Args {
    /// Base URL of the backend API. Falls back to READING_SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Sqlite file holding the durable session slice. Falls back to
    /// READING_DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

fn resolve_setting(flag: Option<String>, env_key: &str, default: &str) -> String {
    flag.or_else(|| std::env::var(env_key).ok())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the system introduction.
    Intro,
    /// Fetch the self-rating scale items.
    SelfRate,
    /// Register a user profile and adopt the name as the session identity.
    Register {
        name: String,
        #[arg(long)]
        grade: Option<String>,
        #[arg(long)]
        major: Option<String>,
    },
    /// Fetch one exam by id.
    Exam { exam_id: i64 },
    /// Fetch the strategy questionnaire items.
    Strategies,
    /// Submit an exam result.
    SubmitExam {
        exam_id: i64,
        score: i64,
        #[arg(long)]
        wrong: Vec<String>,
    },
    /// Submit a strategy questionnaire result.
    SubmitStrategy {
        score: i64,
        #[arg(long)]
        pre_test: bool,
    },
    /// Fetch the stored profile of the current user.
    Profile,
    /// Fetch the AI analysis of the current user's profile.
    Analyze,
    /// Fetch the AI analysis of the current user's wrong answers.
    WrongAnswers,
    /// Fetch personalised strategy suggestions.
    Suggest,
    /// Send one chat message and print the reply.
    Chat { message: String },
    /// Fetch the final learning summary.
    Summary,
    /// Show the current phase, or move to a new one.
    Phase { phase: Option<Phase> },
    /// Drop the session, including the durable slice.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let server_url = resolve_setting(
        args.server_url,
        "READING_SERVER_URL",
        "http://localhost:8000/api",
    );
    let database_url = resolve_setting(
        args.database_url,
        "READING_DATABASE_URL",
        "sqlite://data/session.db",
    );

    info!(server_url = %server_url, database_url = %database_url, "starting session");
    let api = Arc::new(HttpReadingApi::new(&server_url)?);
    let persistence = Arc::new(DurableSessionStore::open(&database_url).await?);
    let store = SessionStore::open(api, persistence).await?;

    match args.command {
        Command::Intro => println!("{}", store.fetch_introduction().await),
        Command::SelfRate => {
            for item in store.fetch_self_rate_items().await {
                println!("{}", serde_json::to_string(&item)?);
            }
        }
        Command::Register { name, grade, major } => {
            let draft = UserProfileDraft {
                grade,
                major,
                ..UserProfileDraft::named(name)
            };
            if store.create_user_profile(&draft).await {
                println!("registered as {}", store.snapshot().await.user_name);
            }
        }
        Command::Exam { exam_id } => {
            if let Some(exam) = store.fetch_exam(exam_id).await {
                println!("{}", serde_json::to_string_pretty(&exam)?);
            }
        }
        Command::Strategies => {
            for item in store.fetch_strategies().await {
                println!("{}", serde_json::to_string(&item)?);
            }
        }
        Command::SubmitExam {
            exam_id,
            score,
            wrong,
        } => {
            let accepted = store.submit_exam_result(exam_id, score, wrong).await;
            println!("accepted: {accepted}");
        }
        Command::SubmitStrategy { score, pre_test } => {
            let accepted = store.submit_strategy_result(score, pre_test).await;
            println!("accepted: {accepted}");
        }
        Command::Profile => {
            if let Some(profile) = store.fetch_user_profile().await {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
        }
        Command::Analyze => println!("{}", store.fetch_profile_analysis().await),
        Command::WrongAnswers => println!("{}", store.fetch_wrong_answers_analysis().await),
        Command::Suggest => println!("{}", store.fetch_strategy_suggestions().await),
        Command::Chat { message } => {
            if let Some(reply) = store.send_chat_message(&message).await {
                println!("{}", reply.content);
            }
        }
        Command::Summary => println!("{}", store.fetch_final_summary().await),
        Command::Phase { phase } => match phase {
            Some(phase) => store.set_current_phase(phase).await,
            None => {
                let (phase, screens) = store.phase_progress().await;
                println!("{}: {}", phase.as_str(), screens.join(", "));
            }
        },
        Command::Reset => store.reset_session().await,
    }

    if let Some(error) = store.snapshot().await.error {
        eprintln!("error: {error}");
    }

    Ok(())
}
