//! `design-render` -- export designs and edit them with an AI assistant.
//!
//! # Environment variables
//!
//! | Variable         | Default               | Description                          |
//! |------------------|-----------------------|--------------------------------------|
//! | `RUST_LOG`       | `design_render=info`  | Log filter                           |
//! | `GEMINI_API_KEY` | --                    | Overrides the stored API key         |

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use design_render::ai::{AiCoordinator, GeminiClient, SubmitOutcome};
use design_render::templates::{find_template, load_templates};
use design_render::{
    export, AiConfig, AspectRatio, DesignStore, DocumentContent, Error, ExportRequest, FileKind,
    HttpFetcher, MemorySurface, Orientation, PageSize, RenderConfig, Result, Workspace,
    AVAILABLE_MODELS,
};

const STORE_FILE: &str = "designs.json";
const AI_CONFIG_FILE: &str = "ai_config.json";

/// Export HTML/CSS designs to fixed-size PNG, JPEG, PDF or Word files.
#[derive(Parser, Debug)]
#[command(name = "design-render")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # A4 portrait PDF from a file pair
    design-render export --html card.html --css card.css

    # Instagram story JPEG of a saved design
    design-render export --design 5f0c... --format jpeg --ratio story

    # Ask the assistant for a change and write it back
    design-render edit --html card.html --css card.css --write "make the title red"
"#)]
struct Cli {
    /// Directory holding the design store and AI settings
    #[arg(long, global = true, default_value = ".design-render", value_name = "DIR")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a design to a file
    Export(ExportArgs),
    /// Run one AI edit against a design
    Edit(EditArgs),
    /// Manage saved designs
    #[command(subcommand)]
    Designs(DesignsCommand),
    /// Manage AI settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct Source {
    /// HTML file; `<style>` blocks inside it are used when --css is absent
    #[arg(long, value_name = "FILE", conflicts_with = "design")]
    html: Option<PathBuf>,

    /// CSS file
    #[arg(long, value_name = "FILE", requires = "html")]
    css: Option<PathBuf>,

    /// Id of a saved design
    #[arg(long, value_name = "ID")]
    design: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    source: Source,

    /// Output format: pdf, png, jpeg or doc
    #[arg(short, long, default_value = "pdf")]
    format: FileKind,

    /// Named page size: a4, letter or poster
    #[arg(long, conflicts_with_all = ["ratio", "ratio_custom"])]
    page: Option<String>,

    /// portrait or landscape
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Custom page width in pixels
    #[arg(long, requires = "height", conflicts_with_all = ["page", "ratio", "ratio_custom"])]
    width: Option<String>,

    /// Custom page height in pixels
    #[arg(long, requires = "width")]
    height: Option<String>,

    /// Named aspect ratio: square, portrait, story or landscape
    #[arg(long, conflicts_with = "ratio_custom")]
    ratio: Option<String>,

    /// Custom aspect ratio as W:H, e.g. 3:2
    #[arg(long, value_name = "W:H")]
    ratio_custom: Option<String>,

    /// Name used for the output file
    #[arg(long)]
    name: Option<String>,

    /// Pixels per CSS pixel
    #[arg(long, default_value_t = 2.0)]
    density: f32,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[command(flatten)]
    source: Source,

    /// What to change
    prompt: String,

    /// Model id for this request
    #[arg(long)]
    model: Option<String>,

    /// Write the result back to the source files or saved design
    #[arg(long)]
    write: bool,

    /// Save the result as a new design with this name
    #[arg(long, value_name = "NAME")]
    save_as: Option<String>,
}

#[derive(Subcommand, Debug)]
enum DesignsCommand {
    /// List saved designs, newest first
    List {
        /// Only designs of this type
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Print a saved design as JSON
    Show { id: String },
    /// Delete a design
    Delete { id: String },
    /// Rename a design
    Rename { id: String, name: String },
    /// Create a design from a template directory
    New {
        /// Template id, e.g. invitation-college-event
        template: String,
        /// Template root
        #[arg(long, default_value = "templates")]
        templates: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Store the API key
    SetKey { key: String },
    /// Store the default model
    SetModel { model: String },
    /// Print the current settings
    Show,
    /// List models available to the stored key
    Models,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "design_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = DesignStore::open(cli.data_dir.join(STORE_FILE));
    let ai_config_path = cli.data_dir.join(AI_CONFIG_FILE);

    match cli.command {
        Command::Export(args) => run_export(&store, args).await,
        Command::Edit(args) => run_edit(&store, &ai_config_path, args).await,
        Command::Designs(cmd) => run_designs(&store, cmd),
        Command::Config(cmd) => run_config(&ai_config_path, cmd).await,
    }
}

/// A loaded document plus where it came from.
struct Loaded {
    content: DocumentContent,
    name: String,
    design_id: Option<String>,
    combined_html: bool,
}

fn load_source(store: &DesignStore, source: &Source) -> Result<Loaded> {
    if let Some(id) = &source.design {
        let record = store.get(id)?.ok_or_else(|| Error::NotFound(id.clone()))?;
        return Ok(Loaded {
            content: record.document(),
            name: record.name,
            design_id: Some(record.id),
            combined_html: false,
        });
    }
    let Some(html_path) = &source.html else {
        return Err(Error::InvalidConfig(
            "pass --html <FILE> or --design <ID>".to_string(),
        ));
    };
    let html = std::fs::read_to_string(html_path)?;
    let name = html_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "design".to_string());
    let (content, combined_html) = match &source.css {
        Some(css_path) => (
            DocumentContent::new(html, std::fs::read_to_string(css_path)?),
            false,
        ),
        None => (DocumentContent::from_combined(&html), true),
    };
    Ok(Loaded {
        content,
        name,
        design_id: None,
        combined_html,
    })
}

fn build_request(args: &ExportArgs, name: &str) -> Result<ExportRequest> {
    let mut request = ExportRequest::for_template(args.name.as_deref().unwrap_or(name))
        .file_kind(args.format)
        .render(RenderConfig::new().density(args.density));

    if let Some(key) = &args.ratio {
        let ratio = AspectRatio::named(key)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown aspect ratio '{key}'")))?;
        request = request.ratio(ratio);
    } else if let Some(custom) = &args.ratio_custom {
        let (numerator, denominator) = custom.split_once(':').unwrap_or((custom.as_str(), ""));
        request = request.ratio(AspectRatio::custom(numerator, denominator));
    } else if let (Some(width), Some(height)) = (&args.width, &args.height) {
        let page = PageSize::custom(width.clone(), height.clone());
        request = request.page(page, args.orientation.unwrap_or_default());
    } else if args.page.is_some() || args.orientation.is_some() {
        let page = match &args.page {
            Some(key) => PageSize::named(key)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown page size '{key}'")))?,
            None => PageSize::a4(),
        };
        request = request.page(page, args.orientation.unwrap_or_default());
    }
    Ok(request)
}

async fn run_export(store: &DesignStore, args: ExportArgs) -> Result<()> {
    let loaded = load_source(store, &args.source)?;
    let request = build_request(&args, &loaded.name)?;
    let fetcher = HttpFetcher::new(request.render.fetch_timeout);

    let outcome = export(&loaded.content, &request, &fetcher, &args.out).await?;
    for warning in &outcome.export.warnings {
        eprintln!("warning: image {} not inlined: {}", warning.url, warning.reason);
    }
    println!("{}", outcome.path.display());
    Ok(())
}

async fn run_edit(store: &DesignStore, config_path: &Path, args: EditArgs) -> Result<()> {
    let loaded = load_source(store, &args.source)?;
    let mut config = AiConfig::load(config_path)?;
    if let Some(model) = &args.model {
        config.model = model.clone();
    }

    let workspace = Arc::new(Mutex::new(Workspace::new(Box::new(MemorySurface::new(
        &loaded.content,
    )))));
    let coordinator = AiCoordinator::new(Arc::new(GeminiClient::new()), config, workspace.clone());

    let outcome = coordinator.submit(&args.prompt).await?;
    if let Some(reply) = coordinator.chat().last() {
        println!("{}", reply.text);
    }

    let missing_images = match outcome {
        SubmitOutcome::Applied { missing_images, .. } => missing_images,
        SubmitOutcome::Failed { reason } => return Err(Error::AiContract(reason)),
        SubmitOutcome::MissingCredential => return Err(Error::MissingApiKey),
        SubmitOutcome::Discarded | SubmitOutcome::Ignored => return Ok(()),
    };
    if !missing_images.is_empty() {
        eprintln!("warning: {} image(s) were dropped by the model", missing_images.len());
    }

    let edited = workspace
        .lock()
        .map_err(|_| Error::Store("workspace lock poisoned".to_string()))?
        .content();

    if args.write {
        match (&loaded.design_id, &args.source.html) {
            (Some(id), _) => {
                store.update_content(id, &edited)?;
            }
            (None, Some(html_path)) if loaded.combined_html => {
                std::fs::write(html_path, edited.combined())?;
            }
            (None, Some(html_path)) => {
                std::fs::write(html_path, &edited.html)?;
                if let Some(css_path) = &args.source.css {
                    std::fs::write(css_path, &edited.css)?;
                }
            }
            (None, None) => {}
        }
    }
    if let Some(name) = &args.save_as {
        let record = store.create_from_ai(Some(name), &edited, None)?;
        println!("saved as {}", record.id);
    }
    if !args.write && args.save_as.is_none() {
        println!("{}", edited.combined());
    }
    Ok(())
}

fn run_designs(store: &DesignStore, cmd: DesignsCommand) -> Result<()> {
    match cmd {
        DesignsCommand::List { kind } => {
            let designs = match kind {
                Some(kind) => store.by_type(&kind)?,
                None => store.all()?,
            };
            for design in designs {
                println!(
                    "{}  {:<12} {}  (updated {})",
                    design.id,
                    design.kind,
                    design.name,
                    design.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        DesignsCommand::Show { id } => {
            let design = store.get(&id)?.ok_or(Error::NotFound(id))?;
            println!("{}", serde_json::to_string_pretty(&design)?);
        }
        DesignsCommand::Delete { id } => {
            if !store.delete(&id)? {
                return Err(Error::NotFound(id));
            }
        }
        DesignsCommand::Rename { id, name } => {
            let design = store.rename(&id, &name)?;
            println!("{}  {}", design.id, design.name);
        }
        DesignsCommand::New {
            template,
            templates,
        } => {
            let catalog = load_templates(&templates)?;
            let found = find_template(&catalog, &template)
                .ok_or_else(|| Error::NotFound(format!("template {template}")))?;
            let design = store.create_from_template(found)?;
            println!("{}  {}", design.id, design.name);
        }
    }
    Ok(())
}

async fn run_config(path: &Path, cmd: ConfigCommand) -> Result<()> {
    let mut config = AiConfig::load(path)?;
    match cmd {
        ConfigCommand::SetKey { key } => {
            config.api_key = key;
            config.save(path)?;
        }
        ConfigCommand::SetModel { model } => {
            config.model = model;
            config.save(path)?;
        }
        ConfigCommand::Show => {
            let key = if config.has_credential() { "set" } else { "not set" };
            println!("api key:  {key}");
            println!("model:    {}", config.model);
            println!("endpoint: {}", config.endpoint);
        }
        ConfigCommand::Models => {
            let models = match GeminiClient::new().list_models(&config).await {
                Ok(models) if !models.is_empty() => models
                    .into_iter()
                    .map(|m| (m.id, m.name))
                    .collect::<Vec<_>>(),
                Ok(_) => builtin_models(),
                Err(e) => {
                    tracing::warn!(error = %e, "model listing unavailable, using built-in list");
                    builtin_models()
                }
            };
            for (id, name) in models {
                let marker = if id == config.model { "*" } else { " " };
                println!("{marker} {id:<28} {name}");
            }
        }
    }
    Ok(())
}

fn builtin_models() -> Vec<(String, String)> {
    AVAILABLE_MODELS
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect()
}
