//! Scribe CLI: browse projects, edit scripts, and run analyses against the
//! story-analysis backend.
//!
//! Usage:
//!   scribe projects
//!   scribe scripts <project>
//!   scribe script show <id>
//!   scribe script edit <id> [--title T] [--content-file PATH]
//!   scribe analyze <id>
//!   scribe entities list <project> [--type character|location|event]
//!   scribe entities show <project> <entity>
//!   scribe ask <project> <question>

use clap::{Parser, Subcommand};
use scribe::config::{self, Config};
use scribe::{
    group_by_type, EntityBrowser, EntityId, EntityType, HttpService, ProjectId, ProjectStore,
    QuestionRequest, ScriptId, ScriptStore, Workspace,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "scribe",
    version,
    about = "Script editing and analysis client for the story-analysis service"
)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend API base URL (overrides config and SCRIBE_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all projects
    Projects,
    /// List the scripts of a project
    Scripts {
        /// Project id
        project: String,
    },
    /// Show or edit one script
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },
    /// Submit a script for analysis and wait for the outcome
    Analyze {
        /// Script id
        id: String,
    },
    /// Browse extracted entities
    Entities {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Ask a question about a project's story
    Ask {
        /// Project id
        project: String,
        /// The question, e.g. "Who is Mara's brother?"
        question: String,
    },
}

#[derive(Subcommand)]
enum ScriptAction {
    /// Print a script
    Show {
        /// Script id
        id: String,
    },
    /// Change a script's title and/or content and save it
    Edit {
        /// Script id
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// File holding the new content
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum EntityAction {
    /// List a project's entities, grouped by type
    List {
        /// Project id
        project: String,
        /// Only entities of this type
        #[arg(long = "type")]
        entity_type: Option<EntityType>,
    },
    /// Print one entity as JSON
    Show {
        /// Project id
        project: String,
        /// Entity id
        entity: String,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("SCRIBE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>, base_url: Option<String>) -> Result<Config, String> {
    let path = path.unwrap_or_else(config::default_path);
    let config = Config::load(&path).map_err(|e| e.to_string())?.with_env();
    Ok(match base_url {
        Some(url) => config.with_base_url(url),
        None => config,
    })
}

async fn cmd_projects(service: &HttpService) -> i32 {
    let projects = match service.list_projects().await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if projects.is_empty() {
        println!("No projects.");
        return 0;
    }
    println!("{:<36}  {:<32}  {:<20}", "ID", "TITLE", "UPDATED");
    println!("{}", "-".repeat(92));
    for project in projects {
        println!(
            "{:<36}  {:<32}  {:<20}",
            project.id,
            project.title,
            project.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    0
}

async fn cmd_scripts(service: &HttpService, project: &str) -> i32 {
    let scripts = match service.list_scripts(&ProjectId::from(project)).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if scripts.is_empty() {
        println!("No scripts in project '{}'.", project);
        return 0;
    }
    println!("{:<36}  {:<32}  {:>7}", "ID", "TITLE", "WORDS");
    println!("{}", "-".repeat(79));
    for script in scripts {
        let stats = script.draft().stats();
        println!("{:<36}  {:<32}  {:>7}", script.id, script.title, stats.words);
    }
    0
}

async fn cmd_script_show(service: &HttpService, id: &str) -> i32 {
    match service.get_script(&ScriptId::from(id)).await {
        Ok(script) => {
            let stats = script.draft().stats();
            println!("{} ({})", script.title, script.id);
            println!(
                "{} words, {} characters, updated {}",
                stats.words,
                stats.characters,
                script.updated_at.format("%Y-%m-%d %H:%M")
            );
            println!();
            println!("{}", script.content);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_script_edit(
    workspace: &Workspace,
    id: &str,
    title: Option<String>,
    content_file: Option<PathBuf>,
) -> i32 {
    if title.is_none() && content_file.is_none() {
        eprintln!("Error: nothing to change; pass --title and/or --content-file");
        return 1;
    }
    let content = match content_file {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("Error: cannot read '{}': {}", path.display(), e);
                return 1;
            }
        },
        None => None,
    };
    let script = match workspace.open(&ScriptId::from(id)).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if !script.edit(title, content) {
        println!("No changes to '{}'", id);
        return 0;
    }
    match script.save().await {
        Ok(saved) => {
            println!("Saved '{}' ({})", saved.title, saved.id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_analyze(workspace: &Workspace, id: &str) -> i32 {
    let script = match workspace.open(&ScriptId::from(id)).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut updates = script.subscribe();
    match script.analyze().await {
        Ok(task) => eprintln!("Submitted analysis task {}", task),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }

    loop {
        if updates.borrow_and_update().is_terminal() {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    let status = script.analysis_status();
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    if status.error.is_some() {
        1
    } else {
        0
    }
}

async fn cmd_entities_list(
    service: Arc<HttpService>,
    project: &str,
    entity_type: Option<EntityType>,
) -> i32 {
    let browser = EntityBrowser::new(service, ProjectId::from(project));
    let entities = match browser.list(entity_type).await {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if entities.is_empty() {
        println!("No entities in project '{}'.", project);
        return 0;
    }
    for (kind, group) in group_by_type(&entities) {
        println!("{} ({})", kind, group.len());
        for entity in group {
            println!("  {:<36}  {}", entity.id, entity.name);
        }
    }
    0
}

async fn cmd_entities_show(service: Arc<HttpService>, project: &str, entity: &str) -> i32 {
    let browser = EntityBrowser::new(service, ProjectId::from(project));
    let entity = match browser.entity(&EntityId::from(entity)).await {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match serde_json::to_string_pretty(&entity) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_ask(service: &HttpService, project: &str, question: &str) -> i32 {
    if question.trim().is_empty() {
        eprintln!("Error: question must not be empty");
        return 1;
    }
    let request = QuestionRequest::new(question);
    match service.ask_question(&ProjectId::from(project), &request).await {
        Ok(reply) => {
            println!("{}", reply.answer);
            if !reply.source_chunks.is_empty() {
                println!();
                println!("Sources:");
                for chunk in &reply.source_chunks {
                    println!("  - {}", chunk);
                }
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config, cli.base_url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let service = match HttpService::new(config.api.base_url.clone(), config.request_timeout()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let workspace = Workspace::new(service.clone(), service.clone(), config.analysis_config());

    let code = match cli.command {
        Commands::Projects => cmd_projects(&service).await,
        Commands::Scripts { project } => cmd_scripts(&service, &project).await,
        Commands::Script { action } => match action {
            ScriptAction::Show { id } => cmd_script_show(&service, &id).await,
            ScriptAction::Edit {
                id,
                title,
                content_file,
            } => cmd_script_edit(&workspace, &id, title, content_file).await,
        },
        Commands::Analyze { id } => cmd_analyze(&workspace, &id).await,
        Commands::Entities { action } => match action {
            EntityAction::List {
                project,
                entity_type,
            } => cmd_entities_list(service, &project, entity_type).await,
            EntityAction::Show { project, entity } => {
                cmd_entities_show(service, &project, &entity).await
            }
        },
        Commands::Ask { project, question } => cmd_ask(&service, &project, &question).await,
    };
    workspace.close_all();
    std::process::exit(code);
}
