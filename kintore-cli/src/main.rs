use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use serde_json::json;

use kintore::error::ActionError;
use kintore::llm::LlmInterface;
use kintore::menu::{BodyPart, Goal, Level, MenuRequest, WorkoutMenu};
use kintore::session::Session;
use kintore::stats::estimate_rm;

#[derive(Parser, Debug)]
#[command(version, about = "Kintore - workout session tracker", long_about = None)]
struct Args {
    /// SQLite database path; falls back to $DATABASE_URL, then kintore.db
    #[arg(long)]
    db: Option<String>,

    /// Text-generation backend used for menu generation
    #[arg(long, default_value_t = BackendKind::Openai)]
    backend: BackendKind,

    /// Model override for the selected backend
    #[arg(long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendKind {
    Openai,
    Ollama,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Openai => write!(f, "openai"),
            BackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PartArg {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    FullBody,
}

impl From<PartArg> for BodyPart {
    fn from(p: PartArg) -> Self {
        match p {
            PartArg::Chest => BodyPart::Chest,
            PartArg::Back => BodyPart::Back,
            PartArg::Shoulders => BodyPart::Shoulders,
            PartArg::Arms => BodyPart::Arms,
            PartArg::Legs => BodyPart::Legs,
            PartArg::FullBody => BodyPart::FullBody,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GoalArg {
    Hypertrophy,
    Strength,
    Health,
    Toning,
}

impl fmt::Display for GoalArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalArg::Hypertrophy => write!(f, "hypertrophy"),
            GoalArg::Strength => write!(f, "strength"),
            GoalArg::Health => write!(f, "health"),
            GoalArg::Toning => write!(f, "toning"),
        }
    }
}

impl From<GoalArg> for Goal {
    fn from(g: GoalArg) -> Self {
        match g {
            GoalArg::Hypertrophy => Goal::Hypertrophy,
            GoalArg::Strength => Goal::Strength,
            GoalArg::Health => Goal::Health,
            GoalArg::Toning => Goal::Toning,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for LevelArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelArg::Beginner => write!(f, "beginner"),
            LevelArg::Intermediate => write!(f, "intermediate"),
            LevelArg::Advanced => write!(f, "advanced"),
        }
    }
}

impl From<LevelArg> for Level {
    fn from(l: LevelArg) -> Self {
        match l {
            LevelArg::Beginner => Level::Beginner,
            LevelArg::Intermediate => Level::Intermediate,
            LevelArg::Advanced => Level::Advanced,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a suggested menu from training preferences
    Generate {
        /// Target body parts, comma separated
        #[arg(long, value_enum, value_delimiter = ',', required = true)]
        parts: Vec<PartArg>,
        /// Time budget in minutes
        #[arg(long, default_value_t = 60)]
        time: u32,
        #[arg(long, value_enum, default_value_t = GoalArg::Strength)]
        goal: GoalArg,
        #[arg(long, value_enum, default_value_t = LevelArg::Beginner)]
        level: LevelArg,
        /// Bench press max in kg
        #[arg(long)]
        bench: Option<f64>,
        /// Deadlift max in kg
        #[arg(long)]
        deadlift: Option<f64>,
        /// Squat max in kg
        #[arg(long)]
        squat: Option<f64>,
        /// Previous menu JSON file; the new menu diverges from it
        #[arg(long)]
        previous: Option<PathBuf>,
        /// Immediately start a session from the generated menu
        #[arg(long)]
        start: bool,
    },
    /// Start a session from a menu JSON file
    Start {
        #[arg(long)]
        menu: PathBuf,
    },
    /// Render a session with its exercises and sets
    Show { session_id: i64 },
    /// Check whether a session is still in progress
    Status { session_id: i64 },
    /// Append an exercise to a session
    AddExercise {
        session_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        bodyweight: bool,
        /// Number of blank sets to create
        #[arg(long, default_value_t = 3)]
        sets: i64,
    },
    /// Append a set to an exercise, carrying the previous targets forward
    AddSet { exercise_id: i64 },
    /// Update a set's targets and memo
    UpdateSet {
        set_id: i64,
        #[arg(long)]
        reps: i64,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        memo: Option<String>,
    },
    /// Delete a set and renumber the remainder
    DeleteSet { set_id: i64 },
    /// Complete a session, pruning blank sets and empty exercises first
    Complete { session_id: i64 },
}

fn emit(value: serde_json::Value) {
    println!("{}", value);
}

fn emit_error(e: &ActionError) {
    emit(json!({ "error": e.to_string() }));
}

fn read_menu(path: &PathBuf) -> Result<WorkoutMenu> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read menu file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse menu file {}", path.display()))
}

fn render_session(state: &kintore::session::WorkoutState) {
    println!(
        "Session {} [{}] user={}",
        state.session.id, state.session.status, state.session.user_id
    );
    for ex in &state.exercises {
        let kind = if ex.exercise.is_bodyweight {
            " (bodyweight)"
        } else {
            ""
        };
        println!("  {}. {}{}", ex.exercise.order_index, ex.exercise.name, kind);
        for set in &ex.sets {
            let rm = estimate_rm(set.target_weight, set.target_reps)
                .map(|rm| format!("  (RM {:.1})", rm))
                .unwrap_or_default();
            let memo = set
                .memo
                .as_deref()
                .map(|m| format!("  -- {}", m))
                .unwrap_or_default();
            println!("     [{}] {}{}{}", set.id, set, rm, memo);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let db_path = args
        .db
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "kintore.db".to_string());

    let backend = match args.backend {
        BackendKind::Openai => LlmInterface::new_openai(None, args.model.clone()),
        BackendKind::Ollama => LlmInterface::new_ollama(args.model.clone()),
    };
    let session = Session::new(&db_path, backend).await?;

    match args.command {
        Commands::Generate {
            parts,
            time,
            goal,
            level,
            bench,
            deadlift,
            squat,
            previous,
            start,
        } => {
            let request = MenuRequest {
                parts: parts.into_iter().map(Into::into).collect(),
                time_minutes: time,
                goal: goal.into(),
                level: level.into(),
                bench_max: bench,
                deadlift_max: deadlift,
                squat_max: squat,
            };
            let previous_menu = previous.as_ref().map(read_menu).transpose()?;
            match session
                .generate_menu(&request, previous_menu.as_deref())
                .await
            {
                Ok(menu) => {
                    if start {
                        match session.start_workout(&menu).await {
                            Ok(session_id) => emit(json!({ "sessionId": session_id })),
                            Err(e) => emit_error(&e),
                        }
                    } else {
                        println!("{}", serde_json::to_string_pretty(&menu)?);
                    }
                }
                Err(e) => emit_error(&e),
            }
        }
        Commands::Start { menu } => {
            let menu = read_menu(&menu)?;
            match session.start_workout(&menu).await {
                Ok(session_id) => emit(json!({ "sessionId": session_id })),
                Err(e) => emit_error(&e),
            }
        }
        Commands::Show { session_id } => match session.load_workout(session_id).await {
            Ok(state) => render_session(&state),
            Err(e) => emit_error(&e),
        },
        Commands::Status { session_id } => {
            emit(json!({ "isValid": session.is_session_active(session_id).await }));
        }
        Commands::AddExercise {
            session_id,
            name,
            bodyweight,
            sets,
        } => match session
            .create_exercise(session_id, &name, bodyweight, sets)
            .await
        {
            Ok(id) => emit(json!({ "id": id })),
            Err(e) => emit_error(&e),
        },
        Commands::AddSet { exercise_id } => match session.add_set(exercise_id).await {
            Ok(id) => emit(json!({ "id": id })),
            Err(e) => emit_error(&e),
        },
        Commands::UpdateSet {
            set_id,
            reps,
            weight,
            memo,
        } => match session
            .update_set(set_id, reps, weight, memo.as_deref())
            .await
        {
            Ok(()) => emit(json!({})),
            Err(e) => emit_error(&e),
        },
        Commands::DeleteSet { set_id } => match session.delete_set(set_id).await {
            Ok(()) => emit(json!({})),
            Err(e) => emit_error(&e),
        },
        Commands::Complete { session_id } => match session.complete_workout(session_id).await {
            Ok(()) => emit(json!({})),
            Err(e) => emit_error(&e),
        },
    }

    Ok(())
}
