//! `courses`: command-line client for the course marketplace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use course_core::EnrollmentProgressTracker;
use course_core::catalog::{CatalogQuery, SortField, SortOrder};
use course_core::model::{CourseDraft, CourseId, LessonKey, Principal};
use services::{ApiConfig, AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Parser)]
#[command(name = "courses")]
#[command(about = "Browse courses, enroll and track lesson progress", long_about = None)]
struct Cli {
    /// Remote API base URL; without it the local `SQLite` backend is used
    #[arg(long, env = "COURSES_API_URL", global = true)]
    api_url: Option<String>,

    /// `SQLite` database for the local backend
    #[arg(
        long = "db",
        env = "COURSES_DB_URL",
        default_value = "sqlite://courses.sqlite3",
        global = true
    )]
    db_url: String,

    /// Signed-in learner id; omit to browse anonymously
    #[arg(long, env = "COURSES_LEARNER_ID", global = true)]
    learner: Option<String>,

    /// Act with the admin role
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the demo catalog into the local database
    Seed,
    /// Browse the catalog
    Courses {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// createdAt, price, title or totalEnrollments
        #[arg(long, default_value = "createdAt")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "12")]
        limit: u32,
    },
    /// Course details and the enroll / go-to-course action
    Show { course_id: String },
    /// Enroll the signed-in learner
    Enroll { course_id: String },
    /// Enrolled courses with progress
    Dashboard,
    /// Course player outline
    Play {
        course_id: String,
        /// Additional module indices to expand
        #[arg(long = "expand")]
        expand: Vec<usize>,
        /// Lesson key to select, e.g. 1-2
        #[arg(long)]
        select: Option<String>,
    },
    /// Mark a lesson complete (the selected lesson when no key is given)
    Complete {
        course_id: String,
        lesson_key: Option<String>,
    },
    /// Course administration
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Course and enrollment totals
    Stats,
    /// Print a course as an editable JSON draft, lesson ids included
    Draft { course_id: String },
    /// Create a course from a JSON draft
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace a course from a JSON draft
    Update {
        course_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a course
    Delete { course_id: String },
}

impl Cli {
    fn principal(&self) -> Option<Principal> {
        let learner = self
            .learner
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())?;
        Some(if self.admin {
            Principal::admin(learner)
        } else {
            Principal::student(learner)
        })
    }
}

fn require_principal(principal: Option<&Principal>) -> Result<&Principal> {
    principal.ok_or_else(|| anyhow!("sign in first: pass --learner or set COURSES_LEARNER_ID"))
}

fn parse_course_id(raw: &str) -> Result<CourseId> {
    raw.parse().with_context(|| format!("invalid course id: {raw:?}"))
}

fn parse_key(raw: &str) -> Result<LessonKey> {
    raw.parse().with_context(|| format!("invalid lesson key: {raw:?}"))
}

fn read_draft(path: &Path) -> Result<CourseDraft> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn draft_json(draft: &CourseDraft) -> Result<String> {
    serde_json::to_string_pretty(draft).context("encoding course draft")
}

fn check_category(known: &[&str], category: Option<&str>) -> Result<()> {
    match category {
        Some(c) if !known.contains(&c) => {
            bail!("unknown category {c:?}; expected one of: {}", known.join(", "))
        }
        _ => Ok(()),
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_outline(tracker: &EnrollmentProgressTracker) {
    let course = tracker.course();
    println!("{} ({} lessons)", course.title, course.total_lessons());
    if tracker.is_enrolled() {
        println!(
            "progress: {} ({} completed)",
            tracker.progress(),
            tracker.completed_count()
        );
    } else {
        println!("not enrolled: progress is not tracked");
    }
    for module in tracker.outline() {
        let marker = if module.expanded { "v" } else { ">" };
        println!("{marker} [{}] {}", module.index, module.title);
        for lesson in module.lessons {
            let done = if lesson.completed { "x" } else { " " };
            let cursor = if lesson.selected { "*" } else { " " };
            let key = lesson.key.map(|k| k.to_string()).unwrap_or_default();
            println!(
                "   {cursor}[{done}] {key:<5} {} ({} min)",
                lesson.title, lesson.duration_minutes
            );
        }
    }
    if tracker.can_mark_selected_complete() {
        println!("=> Mark as complete");
    }
}

async fn build_services(cli: &Cli) -> Result<AppServices> {
    match cli.api_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => {
            let config = ApiConfig::from_env().with_base_url(url);
            info!(api = %config.base_url, "using remote course api");
            Ok(AppServices::remote(config)?)
        }
        None => {
            let db_url = normalize_sqlite_url(&cli.db_url);
            // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
            prepare_sqlite_file(&db_url)?;
            info!(db = %db_url, "using local course backend");
            Ok(AppServices::new_sqlite(&db_url, Clock::system()).await?)
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let principal = cli.principal();
    let app = build_services(&cli).await?;

    match cli.command {
        Commands::Seed => {
            if cli.api_url.is_some() {
                bail!("seed only targets the local backend; drop --api-url");
            }
            let seeder = Principal::admin("seed");
            for draft in seed::sample_courses() {
                let course = app.admin().create_course(&seeder, &draft).await?;
                println!("{}  {}", course.id, course.title);
            }
        }
        Commands::Courses {
            search,
            category,
            sort,
            order,
            page,
            limit,
        } => {
            check_category(app.catalog().categories(), category.as_deref())?;
            let query = CatalogQuery {
                search,
                category,
                sort_by: SortField::from_param(&sort)
                    .ok_or_else(|| anyhow!("unknown sort field: {sort}"))?,
                order: SortOrder::from_param(&order)
                    .ok_or_else(|| anyhow!("unknown sort order: {order}"))?,
                page,
                limit,
            };
            let page = app.catalog().browse(&query).await?;
            if page.courses.is_empty() {
                println!("No courses found");
            }
            for course in &page.courses {
                println!(
                    "{}  {}  [{}]  {}  ${:.2}  {} enrolled",
                    course.id,
                    course.title,
                    course.category,
                    course.instructor,
                    course.price,
                    course.total_enrollments
                );
            }
            println!("page {} of {} ({} courses)", page.page, page.pages.max(1), page.total);
        }
        Commands::Show { course_id } => {
            let course_id = parse_course_id(&course_id)?;
            let detail = app.detail().load(principal.as_ref(), &course_id).await?;
            let course = &detail.course;
            println!("{}", course.title);
            println!("by {}  [{}]  ${:.2}", course.instructor, course.category, course.price);
            println!("{}", course.description);
            println!(
                "{} modules, {} lessons, {} min, {} enrolled",
                course.modules.len(),
                course.total_lessons(),
                course.total_duration_minutes(),
                course.total_enrollments
            );
            for (index, module) in course.modules.iter().enumerate() {
                println!("  [{index}] {} ({} lessons)", module.title, module.lessons.len());
            }
            let action = match detail.primary_action() {
                Some(services::PrimaryAction::GoToCourse) => "Go to course",
                Some(services::PrimaryAction::Enroll) => "Enroll",
                Some(services::PrimaryAction::SignIn) => "Sign in to enroll",
                None => "...",
            };
            println!("=> {action}");
        }
        Commands::Enroll { course_id } => {
            let course_id = parse_course_id(&course_id)?;
            let mut detail = app.detail().load(principal.as_ref(), &course_id).await?;
            if detail.is_enrolled() {
                println!("Already enrolled in {}", detail.course.title);
                return Ok(());
            }
            app.detail().enroll(principal.as_ref(), &mut detail).await?;
            println!("Successfully enrolled in {}", detail.course.title);
        }
        Commands::Dashboard => {
            let learner = require_principal(principal.as_ref())?;
            let dashboard = app.dashboard().load(&learner.learner_id).await?;
            if dashboard.is_empty() {
                println!("No courses yet");
                return Ok(());
            }
            for entry in &dashboard.entries {
                println!(
                    "{}  {}  {}  {}/{} lessons",
                    entry.course_id,
                    entry.title,
                    entry.progress,
                    entry.completed_lessons,
                    entry.total_lessons
                );
            }
            println!(
                "{} enrolled, {} completed, average {}",
                dashboard.entries.len(),
                dashboard.completed_courses(),
                dashboard.average_progress()
            );
        }
        Commands::Play {
            course_id,
            expand,
            select,
        } => {
            let learner = require_principal(principal.as_ref())?;
            let course_id = parse_course_id(&course_id)?;
            let mut tracker = app.player().open(&learner.learner_id, &course_id).await?;
            for index in expand {
                tracker.toggle_module(index);
            }
            if let Some(raw) = select {
                let key = parse_key(&raw)?;
                if !tracker.select_key(key) {
                    bail!("no lesson {key} in this course");
                }
            }
            print_outline(&tracker);
        }
        Commands::Complete {
            course_id,
            lesson_key,
        } => {
            let learner = require_principal(principal.as_ref())?;
            let course_id = parse_course_id(&course_id)?;
            let mut tracker = app.player().open(&learner.learner_id, &course_id).await?;
            let progress = match lesson_key {
                Some(raw) => {
                    let key = parse_key(&raw)?;
                    tracker.select_key(key);
                    app.player().mark_complete(&mut tracker, key).await?
                }
                None => app.player().mark_selected_complete(&mut tracker).await?,
            };
            println!("Lesson marked as completed! Progress: {progress}");
        }
        Commands::Admin { action } => {
            let admin = require_principal(principal.as_ref())?;
            match action {
                AdminCommands::Stats => {
                    let overview = app.admin().overview(admin).await?;
                    println!("Total courses: {}", overview.total_courses);
                    println!("Total enrollments: {}", overview.total_enrollments);
                    for course in &overview.courses {
                        println!(
                            "{}  {}  {} enrolled",
                            course.id, course.title, course.total_enrollments
                        );
                    }
                }
                AdminCommands::Draft { course_id } => {
                    let course_id = parse_course_id(&course_id)?;
                    let draft = app.admin().edit_draft(admin, &course_id).await?;
                    println!("{}", draft_json(&draft)?);
                }
                AdminCommands::Create { file } => {
                    let draft = read_draft(&file)?;
                    let course = app.admin().create_course(admin, &draft).await?;
                    println!("Created {}  {}", course.id, course.title);
                }
                AdminCommands::Update { course_id, file } => {
                    let course_id = parse_course_id(&course_id)?;
                    let draft = read_draft(&file)?;
                    let course = app.admin().update_course(admin, &course_id, &draft).await?;
                    println!("Updated {}  {}", course.id, course.title);
                }
                AdminCommands::Delete { course_id } => {
                    let course_id = parse_course_id(&course_id)?;
                    app.admin().delete_course(admin, &course_id).await?;
                    println!("Deleted {course_id}");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
