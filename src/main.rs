use artist_pages::artist::check_record;
use artist_pages::editor::{Direction, SectionContent, SectionEditor, SectionPatch};
use artist_pages::gallery::{
    AspectRatio, BorderRadius, Gap, HoverEffect, PartialGalleryConfig, PartialGridColumns,
};
use artist_pages::section::SectionKind;
use artist_pages::store::{ArtistStore, JsonDirStore};
use artist_pages::{config, generate, output};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "artist-pages")]
#[command(about = "Author and render artist custom-section pages")]
#[command(long_about = "\
Author and render artist custom-section pages

Each artist is a JSON record in the data directory. Its customSections list
is the page: sections render in ascending order, disabled ones are skipped.

Data structure:

  data/
  ├── config.toml        # Optional; see 'artist-pages gen-config'
  ├── kim-deal.json      # { \"id\": \"kim-deal\", \"name\": \"Kim Deal\",
  │                      #   \"useCustomTemplate\": true, \"customSections\": [...] }
  └── j-mascis.json

Editing commands take the section's index as shown by 'sections', apply one
change and save the whole section list back to the record.

Set RUST_LOG to control log output (default: info).")]
#[command(version = env!("ARTIST_PAGES_VERSION"))]
struct Cli {
    /// Artist data directory
    #[arg(long, default_value = "data", global = true)]
    data: PathBuf,

    /// Output directory for rendered pages
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Extra config file layered over `<data>/config.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List artists and their section counts
    List,
    /// Show an artist's sections with their indices
    Sections { artist: String },
    /// Append a new text section
    Add { artist: String },
    /// Change fields of one section
    Update(UpdateArgs),
    /// Delete one section
    Delete { artist: String, index: usize },
    /// Swap a section with its neighbour in render order
    Move {
        artist: String,
        index: usize,
        #[arg(value_enum)]
        direction: MoveDirection,
    },
    /// Change the layout of a gallery section
    Gallery(GalleryArgs),
    /// Switch the custom section template on or off
    Template {
        artist: String,
        #[arg(value_enum)]
        state: TemplateState,
    },
    /// Render one artist page
    Render { artist: String },
    /// Render every artist page plus an index
    Build,
    /// Validate config and every artist record without rendering
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum MoveDirection {
    Up,
    Down,
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateState {
    On,
    Off,
}

#[derive(clap::Args)]
struct UpdateArgs {
    artist: String,
    index: usize,
    #[arg(long)]
    title: Option<String>,
    /// New section type; resets the content
    #[arg(long = "type")]
    kind: Option<SectionKind>,
    /// Body text, video URL or custom HTML
    #[arg(long, conflicts_with = "image")]
    content: Option<String>,
    /// Gallery image reference (repeat for several, in display order)
    #[arg(long)]
    image: Vec<String>,
    #[arg(long, conflicts_with = "disable")]
    enable: bool,
    #[arg(long)]
    disable: bool,
    #[arg(long, allow_hyphen_values = true)]
    order: Option<i64>,
    /// Background color override; empty string clears it
    #[arg(long)]
    bg: Option<String>,
    /// Text color override; empty string clears it
    #[arg(long)]
    text_color: Option<String>,
}

impl UpdateArgs {
    fn patch(&self) -> SectionPatch {
        let content = if let Some(text) = &self.content {
            Some(SectionContent::Text(text.clone()))
        } else if !self.image.is_empty() {
            Some(SectionContent::Images(self.image.clone()))
        } else {
            None
        };
        let enabled = match (self.enable, self.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let color = |value: &Option<String>| {
            value
                .as_ref()
                .map(|v| Some(v.trim().to_string()).filter(|v| !v.is_empty()))
        };
        SectionPatch {
            title: self.title.clone(),
            kind: self.kind,
            content,
            enabled,
            order: self.order,
            bg_color: color(&self.bg),
            text_color: color(&self.text_color),
        }
    }
}

#[derive(clap::Args)]
struct GalleryArgs {
    artist: String,
    index: usize,
    #[arg(long)]
    mobile: Option<u32>,
    #[arg(long)]
    tablet: Option<u32>,
    #[arg(long)]
    desktop: Option<u32>,
    /// square, portrait, landscape or auto
    #[arg(long, value_parser = parse_keyword::<AspectRatio>)]
    aspect: Option<AspectRatio>,
    /// sm, md or lg
    #[arg(long, value_parser = parse_keyword::<Gap>)]
    gap: Option<Gap>,
    /// none, sm, md or lg
    #[arg(long, value_parser = parse_keyword::<BorderRadius>)]
    radius: Option<BorderRadius>,
    /// none, scale, fade or lift
    #[arg(long, value_parser = parse_keyword::<HoverEffect>)]
    hover: Option<HoverEffect>,
    #[arg(long)]
    lightbox: Option<bool>,
    #[arg(long)]
    captions: Option<bool>,
}

impl GalleryArgs {
    fn partial(&self) -> PartialGalleryConfig {
        let columns = (self.mobile.is_some() || self.tablet.is_some() || self.desktop.is_some())
            .then_some(PartialGridColumns {
                mobile: self.mobile,
                tablet: self.tablet,
                desktop: self.desktop,
            });
        PartialGalleryConfig {
            grid_columns: columns,
            aspect_ratio: self.aspect,
            gap: self.gap,
            border_radius: self.radius,
            hover_effect: self.hover,
            lightbox: self.lightbox,
            captions: self.captions,
        }
    }
}

/// Parse a lowercase layout keyword the same way stored records are decoded.
fn parse_keyword<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown value {value:?}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let site_config = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => config::load_config(&cli.data, cli.config.as_deref())?,
    };
    let mut store = JsonDirStore::new(&cli.data);

    match cli.command {
        Command::List => {
            output::print_artist_list(&store.list()?);
        }
        Command::Sections { artist } => {
            output::print_sections(&store.load(&artist)?);
        }
        Command::Add { artist } => {
            let mut editor = SectionEditor::open(&store, &artist)?;
            let id = editor.add_section().id.clone();
            save(&mut editor, &mut store)?;
            info!(artist = %artist, section = %id, "added section");
        }
        Command::Update(args) => {
            let mut editor = SectionEditor::open(&store, &args.artist)?;
            editor.update_section(args.index, args.patch())?;
            save(&mut editor, &mut store)?;
        }
        Command::Delete { artist, index } => {
            let mut editor = SectionEditor::open(&store, &artist)?;
            let removed = editor.delete_section(index)?;
            save(&mut editor, &mut store)?;
            info!(artist = %artist, section = %removed.id, "deleted section");
        }
        Command::Move {
            artist,
            index,
            direction,
        } => {
            let direction = match direction {
                MoveDirection::Up => Direction::Up,
                MoveDirection::Down => Direction::Down,
            };
            let mut editor = SectionEditor::open(&store, &artist)?;
            editor.move_section(index, direction)?;
            save(&mut editor, &mut store)?;
        }
        Command::Gallery(args) => {
            let mut editor = SectionEditor::open(&store, &args.artist)?;
            editor.update_gallery_config(args.index, args.partial())?;
            save(&mut editor, &mut store)?;
        }
        Command::Template { artist, state } => {
            let mut editor = SectionEditor::open(&store, &artist)?;
            editor.set_use_custom_template(matches!(state, TemplateState::On));
            save(&mut editor, &mut store)?;
        }
        Command::Render { artist } => {
            let record = store.load(&artist)?;
            let page = generate::write_artist_page(&record, &site_config, &cli.output)?;
            output::print_render_output(&page, &cli.output);
        }
        Command::Build => {
            init_thread_pool(&site_config.processing);
            info!("building {} from {}", cli.output.display(), cli.data.display());
            let summary = generate::build(&store, &site_config, &cli.output)?;
            output::print_build_output(&summary, &cli.output);
            if !summary.failures.is_empty() {
                return Err(format!("{} artist page(s) failed", summary.failures.len()).into());
            }
        }
        Command::Check => {
            let report: Vec<_> = store
                .list()?
                .into_iter()
                .map(|record| {
                    let issues = check_record(&record);
                    (record, issues)
                })
                .collect();
            output::print_check_output(&report);
            let issues: usize = report.iter().map(|(_, issues)| issues.len()).sum();
            if issues > 0 {
                return Err(format!("{issues} issue(s) found").into());
            }
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Persist an editing session and show the resulting section list.
fn save(
    editor: &mut SectionEditor,
    store: &mut JsonDirStore,
) -> Result<(), Box<dyn std::error::Error>> {
    editor.save(store)?;
    output::print_sections(editor.record());
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
