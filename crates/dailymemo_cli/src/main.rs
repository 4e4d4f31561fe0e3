//! Command-line adapter over `dailymemo_core`.
//!
//! # Responsibility
//! - Load `CoreConfig` from the environment and open the store.
//! - Map one subcommand to one core call and print the result as JSON.
//!
//! # Invariants
//! - Exit code 0 on success, 2 on configuration/startup failure, 1 otherwise.
//! - Passwords and tokens go to stdout only as part of a session payload.

use clap::{Parser, Subcommand};
use dailymemo_core::{
    init_logging, open_db, AuthContext, AuthService, CommentService, CoreConfig, CoreError,
    DbOptions, MemoDraft, MemoService, SignUpRequest, SqliteAccountRepository,
    SqliteCommentRepository, SqliteMemoRepository,
};
use log::error;
use rusqlite::Connection;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dailymemo")]
#[command(about = "DailyMemo core command-line tool", long_about = None)]
struct Cli {
    /// Absolute directory for rolling log files; logging stays off when unset.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an account with its default room.
    Signup {
        #[arg(short, long)]
        identifier: String,
        #[arg(short, long)]
        password: String,
        #[arg(short = 'n', long)]
        display_name: String,
        #[arg(short = 'c', long)]
        admission_code: String,
    },
    /// Sign in and print a fresh session.
    Signin {
        #[arg(short, long)]
        identifier: String,
        #[arg(short, long)]
        password: String,
    },
    /// Exchange a refresh token for a new session.
    Refresh {
        #[arg(short, long)]
        token: String,
    },
    /// Verify an access token and print its claims.
    VerifyToken {
        #[arg(short, long)]
        token: String,
    },
    /// Write a memo into the caller's default room.
    Memo {
        #[arg(short, long)]
        token: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Comment on a memo with a 0-5 rating.
    Comment {
        #[arg(short, long)]
        token: String,
        #[arg(short, long)]
        memo_id: i64,
        #[arg(short, long)]
        content: String,
        #[arg(short, long, default_value_t = 0)]
        rating: i64,
    },
    /// Delete one of the caller's comments.
    Uncomment {
        #[arg(short, long)]
        token: String,
        #[arg(short, long)]
        comment_id: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    }
    let context = match AuthContext::from_config(&config) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    let mut conn = match open_db(
        &config.db_path,
        DbOptions {
            busy_timeout: config.busy_timeout,
        },
    ) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    match run(cli.command, &mut conn, &context) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_command module=cli status=error error_code={}",
                err.kind().code()
            );
            eprintln!("error[{}]: {err}", err.kind().code());
            ExitCode::from(1)
        }
    }
}

fn run(command: Commands, conn: &mut Connection, context: &AuthContext) -> Result<String, CoreError> {
    match command {
        Commands::Signup {
            identifier,
            password,
            display_name,
            admission_code,
        } => {
            let mut service = AuthService::new(SqliteAccountRepository::new(conn), context);
            let session = service.sign_up(&SignUpRequest {
                identifier,
                password,
                display_name,
                admission_code,
            })?;
            to_json(&session)
        }
        Commands::Signin {
            identifier,
            password,
        } => {
            let service = AuthService::new(SqliteAccountRepository::new(conn), context);
            to_json(&service.sign_in(&identifier, &password)?)
        }
        Commands::Refresh { token } => {
            let service = AuthService::new(SqliteAccountRepository::new(conn), context);
            to_json(&service.refresh_session(&token)?)
        }
        Commands::VerifyToken { token } => to_json(&context.authenticate(&token)?),
        Commands::Memo {
            token,
            title,
            content,
        } => {
            let account_id = context.authenticate(&token)?.account_id()?;
            let service = MemoService::new(SqliteMemoRepository::new(conn));
            to_json(&service.create_memo(account_id, &MemoDraft::new(title, content))?)
        }
        Commands::Comment {
            token,
            memo_id,
            content,
            rating,
        } => {
            let account_id = context.authenticate(&token)?.account_id()?;
            let mut service = CommentService::new(SqliteCommentRepository::new(conn));
            to_json(&service.create_comment(account_id, memo_id, &content, rating)?)
        }
        Commands::Uncomment { token, comment_id } => {
            let account_id = context.authenticate(&token)?.account_id()?;
            let mut service = CommentService::new(SqliteCommentRepository::new(conn));
            let memo_id = service.delete_comment(account_id, comment_id)?;
            to_json(&serde_json::json!({ "deleted": comment_id, "memo_id": memo_id }))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CoreError::Configuration(format!("failed to render output: {err}")))
}
