use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use time::{Date, OffsetDateTime, UtcOffset};
use tokio::runtime::Handle;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use doit::config::Config;
use doit::domain::calendar::{at_clock, clock_label, day_label, parse_clock, parse_day};
use doit::domain::suggest::SuggestionCatalog;
use doit::domain::task::{Task, TaskStatus};
use doit::notify::memory::InMemoryNotificationCenter;
use doit::notify::scheduler::NotificationScheduler;
use doit::notify::sqlite::SqliteNotificationCenter;
use doit::notify::{AlarmRequest, NotificationCenter};
use doit::repo::KeyValueStore;
use doit::repo::memory::InMemoryKeyValueStore;
use doit::repo::sqlite::{SqliteKeyValueStore, default_db_path};
use doit::store::TaskStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "doit — day-based task list with start and deadline alarms", long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use in-memory storage instead of SQLite
    #[arg(long, global = true, default_value_t = false)]
    memory: bool,

    /// Path to SQLite DB file (default: config, then OS data dir)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a task
    Add {
        title: String,
        #[arg(long, default_value = "")]
        note: String,
        /// Day the task belongs to, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Start time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Finish-by time, HH:MM
        #[arg(long)]
        deadline: Option<String>,
    },
    /// List the tasks of a day
    List {
        #[arg(long)]
        date: Option<String>,
    },
    /// Toggle completion of a task by its number in `list`
    Toggle {
        number: usize,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete tasks by their numbers in `list`
    Delete {
        #[arg(required = true)]
        numbers: Vec<usize>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show pending alarms
    Alarms {
        /// Only alarms whose time has passed
        #[arg(long, default_value_t = false)]
        due: bool,
    },
    /// Suggest task titles matching TEXT
    Suggest {
        text: String,
        /// JSON catalog of `{"id", "todo"}` entries
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .init();

    // Read while the process is still single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(args, config, offset))
}

async fn run(args: Args, config: Config, offset: UtcOffset) -> Result<()> {
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let today = now.date();

    if let Command::Suggest {
        text,
        catalog: path,
    } = &args.command
    {
        let catalog = SuggestionCatalog::from_file(path)?;
        if catalog.is_empty() {
            bail!("suggestion catalog {} is empty", path.display());
        }
        debug!(entries = catalog.len(), "suggestion catalog loaded");
        for title in catalog.matching(text) {
            println!("{title}");
        }
        return Ok(());
    }

    let (storage, center) = open_backends(&args, &config)?;
    let scheduler = NotificationScheduler::new(Arc::clone(&center), Handle::current())
        .with_sounds(config.notifications.sounds());
    let mut store = TaskStore::with_key(storage, config.storage.tasks_key.clone(), scheduler);

    match args.command {
        Command::Add {
            title,
            note,
            date,
            time,
            deadline,
        } => {
            let day = day_or_today(date.as_deref(), today)?;
            let start = time
                .as_deref()
                .map(parse_clock)
                .transpose()?
                .map(|clock| at_clock(day, clock, offset));
            let finish = deadline
                .as_deref()
                .map(parse_clock)
                .transpose()?
                .map(|clock| at_clock(day, clock, offset));
            if let (Some(start), Some(finish)) = (start, finish)
                && finish <= start
            {
                bail!("deadline must be after the start time");
            }
            if start.is_some() {
                store.scheduler().request_authorization().await;
            }
            let task = store
                .add_task(&title, &note, day, start, finish)
                .ok_or_else(|| anyhow!("task title must not be blank"))?;
            println!("Added \"{}\" for {}", task.title, day_label(task.date, today));
        }
        Command::List { date } => {
            let day = day_or_today(date.as_deref(), today)?;
            print_day(&store, day, today, now);
        }
        Command::Toggle { number, date } => {
            let day = day_or_today(date.as_deref(), today)?;
            let pos = position_for(&store, day, number)?;
            let task = store.tasks()[pos].clone();
            store.toggle_task(&task);
            let state = if store.tasks()[pos].is_done { "done" } else { "open" };
            println!("\"{}\" is now {state}", task.title);
        }
        Command::Delete { numbers, date } => {
            let day = day_or_today(date.as_deref(), today)?;
            let positions = numbers
                .iter()
                .map(|&n| position_for(&store, day, n))
                .collect::<Result<Vec<_>>>()?;
            let before = store.tasks().len();
            store.delete_tasks(positions);
            println!("Deleted {} task(s)", before - store.tasks().len());
        }
        Command::Alarms { due } => {
            let alarms = if due { center.due(now) } else { center.pending() };
            print_alarms(&alarms);
        }
        Command::Suggest { .. } => {}
    }

    store.scheduler().flush().await;
    Ok(())
}

type Backends = (Box<dyn KeyValueStore>, Arc<dyn NotificationCenter>);

fn open_backends(args: &Args, config: &Config) -> Result<Backends> {
    if args.memory {
        return Ok((
            Box::new(InMemoryKeyValueStore::default()),
            Arc::new(InMemoryNotificationCenter::default()),
        ));
    }
    let path = match args.db_path.clone().or_else(|| config.storage.db_path.clone()) {
        Some(path) => path,
        None => default_db_path()?,
    };
    Ok((
        Box::new(SqliteKeyValueStore::open(&path)?),
        Arc::new(SqliteNotificationCenter::open(&path)?),
    ))
}

fn day_or_today(raw: Option<&str>, today: Date) -> Result<Date> {
    raw.map(parse_day).transpose().map(|day| day.unwrap_or(today))
}

/// Map a 1-based number from `list` to a store position.
fn position_for<S: KeyValueStore>(store: &TaskStore<S>, day: Date, number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .and_then(|i| store.tasks_on(day).get(i).map(|(pos, _)| *pos))
        .ok_or_else(|| anyhow!("no task #{number} on {day}"))
}

fn print_day<S: KeyValueStore>(store: &TaskStore<S>, day: Date, today: Date, now: OffsetDateTime) {
    println!("{}", day_label(day, today));
    let tasks = store.tasks_on(day);
    if tasks.is_empty() {
        if store.tasks().is_empty() {
            println!("  Use `doit add` to add tasks.");
        } else {
            println!("  No tasks");
        }
        return;
    }
    for (n, (_, task)) in tasks.iter().enumerate() {
        let mark = if task.is_done { "x" } else { " " };
        println!("{:>3}. [{mark}] {}{}", n + 1, task.title, schedule_suffix(task, now));
        if !task.note.trim().is_empty() {
            println!("       ↳ {}", task.note);
        }
    }
}

fn schedule_suffix(task: &Task, now: OffsetDateTime) -> String {
    let Some(start) = task.time else {
        return String::new();
    };
    let mut out = format!("  {}", clock_label(start));
    if let Some(deadline) = task.deadline {
        out.push_str(&format!(" → {}", clock_label(deadline)));
    }
    match task.status(now) {
        TaskStatus::Delayed => out.push_str("  (delayed)"),
        TaskStatus::InProgress => match task.progress(now) {
            Some(p) => out.push_str(&format!("  (in progress, {:.0}%)", p * 100.0)),
            None => out.push_str("  (in progress)"),
        },
        TaskStatus::Done | TaskStatus::Upcoming | TaskStatus::Unscheduled => {}
    }
    out
}

fn print_alarms(alarms: &[AlarmRequest]) {
    if alarms.is_empty() {
        println!("No alarms");
        return;
    }
    for alarm in alarms {
        let when = alarm
            .trigger
            .fire_time()
            .map(|at| format!("{} {}", at.date(), clock_label(at)))
            .unwrap_or_else(|| "invalid trigger".to_string());
        println!("{when}  {}  {}", alarm.title, alarm.identifier);
    }
}
