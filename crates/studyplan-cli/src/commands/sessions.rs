use clap::Subcommand;
use studyplan_core::{ApiSessionRecorder, Config, Database};

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List recorded sessions, newest first
    List {
        /// Only sessions for this discipline
        #[arg(long)]
        discipline: Option<String>,
        /// Ask the REST backend instead of the local log
        #[arg(long)]
        remote: bool,
    },
}

pub fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionsAction::List {
            discipline,
            remote: false,
        } => {
            let db = Database::open()?;
            let sessions = db.list_sessions(discipline.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        SessionsAction::List {
            discipline,
            remote: true,
        } => {
            let config = Config::load()?;
            let api = ApiSessionRecorder::from_config(&config.api)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let mut sessions = runtime.block_on(api.list_sessions())?;
            if let Some(discipline) = discipline.as_deref() {
                sessions.retain(|s| match &s["disciplina_id"] {
                    serde_json::Value::String(id) => id == discipline,
                    other => other.to_string() == discipline,
                });
            }
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
