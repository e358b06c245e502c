//! `tabula` command-line host.
//!
//! Delivers workflow prompts as text on stdout and images as PNG files, and
//! exposes the map editing use-cases directly.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use tabula_core::raster::PixelRect;
use tabula_core::render::{encode_png, RenderOptions};
use tabula_core::{
    init_logging, open_db, AlignmentWorkflow, Color, Compositor, CoreConfig,
    DirectoryGlyphResolver, GlyphResolver, GridPoint, MaskSpec, NoGlyphs, SessionReply,
    SqliteTabulaRepository, SqliteUserRepository, SqliteWorkflowStateRepository, TabulaService,
    Token, User, UserRepository, WorkflowEngine, WorkflowMessage, WorkflowSession,
};

const ALIGN: &str = "align";

#[derive(Parser)]
#[command(name = "tabula", about = "Grid-aligned battle maps", version)]
struct Cli {
    /// JSON config file; `TABULA_*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Handle of the acting user.
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Import a background image as a new map
    Import { map: String, image: PathBuf },

    /// List your maps
    List,

    /// Render a map to a PNG file
    Render {
        map: String,
        #[arg(short, long, default_value = "tabula.png")]
        out: PathBuf,
        /// Crop as `left,top,width,height` in image pixels
        #[arg(long, value_parser = parse_rect)]
        crop: Option<PixelRect>,
    },

    /// Set grid size and offsets by hand
    Grid {
        map: String,
        dpi: f64,
        #[arg(default_value_t = 0, allow_hyphen_values = true)]
        offset_x: i32,
        #[arg(default_value_t = 0, allow_hyphen_values = true)]
        offset_y: i32,
        #[arg(long)]
        color: Option<Color>,
    },

    /// Manage masks
    Mask {
        #[command(subcommand)]
        command: MaskCommands,
    },

    /// Manage tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Color a grid cell, or clear every mark
    Mark {
        map: String,
        #[arg(allow_hyphen_values = true)]
        x: Option<i32>,
        #[arg(allow_hyphen_values = true)]
        y: Option<i32>,
        #[arg(long, default_value = "red")]
        color: Color,
        #[arg(long, conflicts_with_all = ["x", "y"])]
        clear: bool,
    },

    /// Align a map's grid interactively
    Align {
        #[command(subcommand)]
        command: AlignCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    Add { handle: String },
}

#[derive(Subcommand)]
enum MaskCommands {
    Add {
        map: String,
        name: String,
        /// `left,top,width,height` in image pixels
        #[arg(value_parser = parse_rect)]
        rect: PixelRect,
        #[arg(long, default_value = "black")]
        color: Color,
        /// Reveal the map under masks painted earlier
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        order: Option<u32>,
    },
    Remove {
        map: String,
        name: String,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    Place {
        map: String,
        name: String,
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        #[arg(long, default_value = "blue")]
        color: Color,
        #[arg(long, default_value_t = 1)]
        size: u32,
        #[arg(long)]
        glyph: Option<String>,
        #[arg(long)]
        label: Option<String>,
    },
    Remove {
        map: String,
        name: String,
    },
}

#[derive(Subcommand)]
enum AlignCommands {
    /// Begin aligning `map`
    Start {
        map: String,
        #[arg(short, long, default_value = "align.png")]
        out: PathBuf,
    },
    /// Answer the current prompt with a choice id
    Respond {
        choice: String,
        #[arg(short, long, default_value = "align.png")]
        out: PathBuf,
    },
    /// Show the current prompt again
    Show {
        #[arg(short, long, default_value = "align.png")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CoreConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir).context("starting logging")?;
    }
    run(cli, &config)
}

fn run(cli: Cli, config: &CoreConfig) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("opening database `{}`", config.db_path.display()))?;
    let users = SqliteUserRepository::new(&conn);
    let glyphs: Box<dyn GlyphResolver> = match &config.glyph_dir {
        Some(dir) => Box::new(DirectoryGlyphResolver::new(dir)),
        None => Box::new(NoGlyphs),
    };

    let acting_user = || -> Result<User> {
        let handle = cli
            .user
            .as_deref()
            .ok_or_else(|| anyhow!("pass --user <handle>"))?;
        users
            .find_user_by_handle(handle)?
            .ok_or_else(|| anyhow!("no user `{handle}`; create it with `tabula user add`"))
    };
    let tabulas = TabulaService::new(SqliteTabulaRepository::new(&conn));
    let context = config.context.as_str();

    match &cli.command {
        Commands::User {
            command: UserCommands::Add { handle },
        } => {
            let user = User::new(handle.trim());
            users.create_user(&user)?;
            info!("event=user_add module=cli status=ok user={}", user.id);
            println!("created user {} ({})", user.handle, user.id);
        }
        Commands::Import { map, image } => {
            let owner = acting_user()?;
            let bytes = std::fs::read(image)
                .with_context(|| format!("reading `{}`", image.display()))?;
            let tabula = tabulas.import_tabula(owner.id, map, bytes)?;
            println!("imported `{}`; align it with `tabula align start {}`", tabula.name, tabula.name);
        }
        Commands::List => {
            let owner = acting_user()?;
            for summary in tabulas.list_tabulas(owner.id)? {
                let grid = if summary.dpi > 0.0 {
                    format!("{:.2} px/square", summary.dpi)
                } else {
                    "not aligned".to_string()
                };
                println!("{}\t{grid}", summary.name);
            }
        }
        Commands::Render { map, out, crop } => {
            let owner = acting_user()?;
            let compositor = compositor(glyphs.as_ref(), config);
            let png = tabulas.render_png(&compositor, owner.id, map, context, *crop)?;
            write_file(out, &png)?;
            println!("wrote {}", out.display());
        }
        Commands::Grid {
            map,
            dpi,
            offset_x,
            offset_y,
            color,
        } => {
            let owner = acting_user()?;
            let tabula = tabulas.set_grid(owner.id, map, *dpi, *offset_x, *offset_y)?;
            if color.is_some() {
                tabulas.set_grid_color(owner.id, map, *color)?;
            }
            println!(
                "`{}` grid: {:.2} px/square at ({}, {})",
                tabula.name, tabula.dpi, tabula.offset_x, tabula.offset_y
            );
        }
        Commands::Mask { command } => {
            let owner = acting_user()?;
            match command {
                MaskCommands::Add {
                    map,
                    name,
                    rect,
                    color,
                    clear,
                    order,
                } => {
                    let mask = tabulas.add_mask(
                        owner.id,
                        map,
                        MaskSpec {
                            name: name.clone(),
                            color: *color,
                            rect: *rect,
                            clear: *clear,
                            order: *order,
                        },
                    )?;
                    println!("mask `{}` at order {}", mask.name, mask.order);
                }
                MaskCommands::Remove { map, name } => {
                    tabulas.remove_mask(owner.id, map, name)?;
                    println!("removed mask `{name}`");
                }
            }
        }
        Commands::Token { command } => {
            let owner = acting_user()?;
            match command {
                TokenCommands::Place {
                    map,
                    name,
                    x,
                    y,
                    color,
                    size,
                    glyph,
                    label,
                } => {
                    let mut token = Token::new(GridPoint::new(*x, *y), *color);
                    token.size = *size;
                    token.glyph = glyph.clone();
                    token.label = label.clone();
                    let replaced = tabulas.place_token(owner.id, map, context, name, token)?;
                    let verb = if replaced.is_some() { "moved" } else { "placed" };
                    println!("{verb} `{name}` at ({x}, {y})");
                }
                TokenCommands::Remove { map, name } => {
                    tabulas.remove_token(owner.id, map, context, name)?;
                    println!("removed `{name}`");
                }
            }
        }
        Commands::Mark {
            map,
            x,
            y,
            color,
            clear,
        } => {
            let owner = acting_user()?;
            if *clear {
                let removed = tabulas.clear_marks(owner.id, map, context)?;
                println!("cleared {removed} marks");
            } else {
                let (Some(x), Some(y)) = (x, y) else {
                    bail!("pass a cell as `X Y`, or --clear");
                };
                tabulas.set_mark(owner.id, map, context, GridPoint::new(*x, *y), *color)?;
                println!("marked ({x}, {y})");
            }
        }
        Commands::Align { command } => {
            let owner = acting_user()?;
            let tabula_repo = SqliteTabulaRepository::new(&conn);
            let mut workflow = AlignmentWorkflow::new(&users, &tabula_repo, glyphs.as_ref())
                .with_context(context);
            if let Some(timeout) = config.render_timeout() {
                workflow = workflow.with_render_timeout(timeout);
            }
            let mut engine = WorkflowEngine::new();
            engine.register(workflow)?;
            let session = WorkflowSession::new(&engine, SqliteWorkflowStateRepository::new(&conn));

            let (reply, out) = match command {
                AlignCommands::Start { map, out } => (session.start(owner.id, ALIGN, map)?, out),
                AlignCommands::Respond { choice, out } => {
                    (session.respond(owner.id, ALIGN, choice)?, out)
                }
                AlignCommands::Show { out } => (session.current(owner.id, ALIGN)?, out),
            };
            deliver(&reply, out)?;
        }
    }
    Ok(())
}

fn compositor<'g>(glyphs: &'g dyn GlyphResolver, config: &CoreConfig) -> Compositor<'g> {
    let compositor = Compositor::new(glyphs);
    match config.render_timeout() {
        Some(timeout) => compositor.with_options(RenderOptions::with_timeout(timeout)),
        None => compositor,
    }
}

fn deliver(reply: &SessionReply, out: &Path) -> Result<()> {
    let WorkflowMessage {
        text,
        image,
        choices,
        ..
    } = &reply.message;
    println!("{text}");
    if let Some(image) = image {
        write_file(out, &encode_png(image)?)?;
        println!("preview: {}", out.display());
    }
    for group in choices {
        let line: Vec<String> = group
            .iter()
            .map(|choice| format!("[{}] {}", choice.id, choice.label))
            .collect();
        println!("  {}", line.join("  "));
    }
    if reply.is_finished() {
        println!("({})", reply.state);
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing `{}`", path.display()))
}

fn parse_rect(value: &str) -> Result<PixelRect, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [left, top, width, height] = parts.as_slice() else {
        return Err("expected left,top,width,height".to_string());
    };
    let number = |text: &str| text.parse::<i64>().map_err(|err| format!("`{text}`: {err}"));
    let size = |text: &str| text.parse::<u32>().map_err(|err| format!("`{text}`: {err}"));
    Ok(PixelRect::new(
        number(*left)?,
        number(*top)?,
        size(*width)?,
        size(*height)?,
    ))
}
