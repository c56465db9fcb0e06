use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use docseal::{
    AbortSignal, DocumentDescriptor, FinalizePolicy, FontRegistry, PipelineConfig, PlacementModel,
    SigningSession,
};

#[derive(Parser, Debug)]
#[command(name = "docseal", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page of a document to PNG and print the slide geometry.
    Slides(SlidesArgs),
    /// Embed edited signature fields and write the final PDF.
    Finalize(FinalizeArgs),
}

#[derive(Parser, Debug)]
struct SlidesArgs {
    /// Input document (path or URL).
    #[arg(long = "in")]
    input: String,

    /// Directory receiving `slide-NNN.png` files.
    #[arg(long)]
    out_dir: PathBuf,

    /// Container width in pixels (defaults to the reference design width).
    #[arg(long)]
    viewport_width: Option<f64>,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FinalizeArgs {
    /// Input document (path or URL).
    #[arg(long = "in")]
    input: String,

    /// Signature fields JSON (array of camelCase records).
    #[arg(long)]
    fields: PathBuf,

    /// Font registry JSON: `{"default_family": "...", "families": {"Name": "url"}}`.
    #[arg(long)]
    fonts: PathBuf,

    /// Output PDF path.
    #[arg(long)]
    out: PathBuf,

    /// Container width the fields were placed at.
    #[arg(long)]
    viewport_width: Option<f64>,

    /// Override the registry's default font family.
    #[arg(long)]
    default_font: Option<String>,

    /// Fail instead of skipping fields that cannot be embedded.
    #[arg(long, default_value_t = false)]
    require_all: bool,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Slides(args) => cmd_slides(args).await,
        Command::Finalize(args) => cmd_finalize(args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::load(p)?,
        None => PipelineConfig::from_env(),
    })
}

async fn open_session(
    input: &str,
    cfg: PipelineConfig,
    viewport_width: Option<f64>,
) -> anyhow::Result<SigningSession> {
    let width = viewport_width.unwrap_or(cfg.reference_design_width);
    let mut session = SigningSession::new(cfg, width)?;
    session
        .load_document(&DocumentDescriptor::url(input), &AbortSignal::never())
        .await
        .with_context(|| format!("load document '{input}'"))?;
    Ok(session)
}

async fn cmd_slides(args: SlidesArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let session = open_session(&args.input, cfg, args.viewport_width).await?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mount = session.mount();
    for index in 0..mount.len() {
        let Some(slide) = mount.slide(index) else {
            continue;
        };
        let path = args.out_dir.join(format!("slide-{index:03}.png"));
        slide
            .raster
            .to_rgba_image()?
            .save(&path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&mount.geometries())?);
    Ok(())
}

async fn cmd_finalize(args: FinalizeArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if args.require_all {
        cfg.finalize_policy = FinalizePolicy::RequireAll;
    }

    let raw = std::fs::read_to_string(&args.fields)
        .with_context(|| format!("read fields '{}'", args.fields.display()))?;
    let mut model = PlacementModel::from_json(&raw)?;

    let raw = std::fs::read_to_string(&args.fonts)
        .with_context(|| format!("read fonts '{}'", args.fonts.display()))?;
    let mut fonts: FontRegistry = serde_json::from_str(&raw)
        .with_context(|| format!("parse fonts '{}'", args.fonts.display()))?;
    if let Some(family) = args.default_font {
        fonts.default_family = Some(family);
    }

    let mut session = open_session(&args.input, cfg, args.viewport_width).await?;
    session.load_fields(model.take())?;
    let out = session.finalize(&fonts, &AbortSignal::never()).await?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &out.pdf)
        .with_context(|| format!("write pdf '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());

    let summary = serde_json::json!({
        "out": args.out.display().to_string(),
        "embedded": out.embedded_count(),
        "reports": out.reports,
        "remaining": out.remaining,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
