use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chatbridge_db::{FeedbackRecord, FeedbackSource, Store};
use chatbridge_prompt::{Directives, Personalizer, UserIdentity};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "chatbridge", version, about)]
struct Cli {
    /// Feedback database. Defaults to $CHATBRIDGE_FEEDBACK_DB, then the app data dir.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an OpenAI-style chat payload into an Ollama-style one.
    Convert {
        /// Payload JSON file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Apply a model parameter map onto a request body.
    Params {
        #[arg(long, value_enum)]
        target: Target,
        /// Parameter map JSON file.
        #[arg(long)]
        params: PathBuf,
        /// Body JSON file; reads stdin when omitted.
        body: Option<PathBuf>,
    },
    /// Show the banned words and tone instructions for a user.
    Directives {
        #[arg(long)]
        user: String,
    },
    /// Print the personalized system prompt for a user.
    Compose {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        system: String,
        /// Template variable as KEY=VALUE. Repeatable.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Rebuild the per-user banned word index from all commented feedback.
    IndexBannedWords {
        /// Defaults to $CHATBRIDGE_BANNED_WORDS_PATH, then the app data dir.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Openai,
    Ollama,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> CliResult<()> {
    let db = cli.db;
    match cli.command {
        Command::Convert { file } => {
            let source = read_object(file.as_deref())?;
            let target = chatbridge_payload::convert_payload(&source)?;
            print_json(&Value::Object(target))
        }
        Command::Params {
            target,
            params,
            body,
        } => {
            let params = read_object(Some(&params))?;
            let mut body = read_object(body.as_deref())?;
            match target {
                Target::Openai => chatbridge_payload::apply_params_openai(&params, &mut body)?,
                Target::Ollama => chatbridge_payload::apply_params_ollama(&params, &mut body)?,
            }
            print_json(&Value::Object(body))
        }
        Command::Directives { user } => {
            let source = open_feedback_source(db)?;
            let directives = Directives::load(&*source, &user);
            print_json(&json!({
                "banned_words": directives.banned_words,
                "tone_instructions": directives.tone_instructions,
            }))
        }
        Command::Compose {
            user,
            name,
            location,
            system,
            vars,
        } => {
            let source = open_feedback_source(db)?;
            let identity = UserIdentity {
                id: user,
                name,
                info: location.map(|location| {
                    let mut info = Map::new();
                    info.insert("location".into(), Value::String(location));
                    info
                }),
            };
            let variables: Map<String, Value> = vars
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();

            let personalizer = Personalizer::new(&*source);
            if let Some(prompt) = personalizer.compose(&system, Some(&variables), Some(&identity)) {
                println!("{prompt}");
            }
            Ok(())
        }
        Command::IndexBannedWords { output } => {
            let db = match db {
                Some(db) => db,
                None => chatbridge_app::feedback_db_path()?,
            };
            let output = match output {
                Some(output) => output,
                None => chatbridge_app::banned_words_path()?,
            };

            let store = Store::open(&db)?;
            let index = chatbridge_prompt::scan(&store, chrono::Utc::now())?;
            chatbridge_prompt::write_index(&index, &output)?;
            tracing::info!(path = %output.display(), users = index.len(), "wrote banned word index");
            Ok(())
        }
    }
}

/// Personalization never fails on the store: a missing or unreadable
/// database means "no directives".
fn open_feedback_source(db: Option<PathBuf>) -> CliResult<Box<dyn FeedbackSource>> {
    let path = match db {
        Some(path) => path,
        None => chatbridge_app::feedback_db_path()?,
    };
    match Store::open(&path) {
        Ok(store) => Ok(Box::new(store)),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "feedback store unavailable");
            Ok(Box::new(Vec::<FeedbackRecord>::new()))
        }
    }
}

fn read_object(path: Option<&Path>) -> CliResult<Map<String, Value>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(map),
        _ => Err("expected a JSON object".into()),
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compose_with_variables() {
        let cli = Cli::try_parse_from([
            "chatbridge",
            "--db",
            "/tmp/webui.db",
            "compose",
            "--user",
            "u1",
            "--name",
            "Ada",
            "--system",
            "Hi {{user_name}}",
            "--var",
            "CURRENT_DATE=2024-05-01",
        ])
        .expect("parse");

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/webui.db")));
        let Command::Compose { user, vars, location, .. } = cli.command else {
            panic!("expected compose");
        };
        assert_eq!(user, "u1");
        assert_eq!(location, None);
        assert_eq!(vars, vec![("CURRENT_DATE".to_string(), "2024-05-01".to_string())]);
    }

    #[test]
    fn parses_params_target() {
        let cli = Cli::try_parse_from([
            "chatbridge", "params", "--target", "ollama", "--params", "p.json",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Params { target: Target::Ollama, body: None, .. }
        ));
        assert!(
            Cli::try_parse_from(["chatbridge", "params", "--target", "vllm", "--params", "p"])
                .is_err()
        );
    }

    #[test]
    fn var_requires_key_and_equals() {
        assert_eq!(
            parse_var("a=b=c"),
            Ok(("a".to_string(), "b=c".to_string()))
        );
        assert_eq!(parse_var("k="), Ok(("k".to_string(), String::new())));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn missing_store_degrades_to_empty_source() {
        let path = std::env::temp_dir().join(format!(
            "chatbridge-cli-missing-{}.db",
            std::process::id()
        ));
        let source = open_feedback_source(Some(path.clone())).expect("source");
        assert!(Directives::load(&*source, "u1").is_empty());
        assert!(!path.exists());
    }
}
