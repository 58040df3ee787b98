use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use annotation_editor::core::db::{AnnotationDb, AnnotationRepository};
use annotation_editor::{AppConfig, Editor, Shape, ShapeCanvas, ShapeId};

#[derive(Parser)]
#[command(name = "annotation-editor")]
#[command(about = "Draw, store and edit rectangle annotations on images")]
struct Cli {
    /// Path to the annotation database
    #[arg(long, value_name = "FILE", default_value = "annotations.db")]
    db: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate a new image and save it
    New {
        /// Image file to annotate
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Rectangle to draw, repeatable
        #[arg(long = "rect", value_name = "X,Y,W,H[,ROT]", value_parser = parse_rect)]
        rects: Vec<Shape>,

        /// Number of default rectangles to add
        #[arg(long, default_value_t = 0)]
        default_rects: usize,

        /// Free-form metadata stored with the annotation
        #[arg(long)]
        meta: Option<String>,
    },
    /// List stored annotations
    List,
    /// Print one annotation
    Show {
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Include base64 image data in JSON output
        #[arg(long, requires = "json")]
        with_image: bool,
    },
    /// Edit the rectangles of a stored annotation
    Edit {
        id: i64,

        /// Rectangle to add, repeatable
        #[arg(long = "add", value_name = "X,Y,W,H[,ROT]", value_parser = parse_rect)]
        add: Vec<Shape>,

        /// Remove the rectangle at INDEX, repeatable
        #[arg(long = "remove", value_name = "INDEX")]
        remove: Vec<usize>,

        /// Remove all existing rectangles
        #[arg(long)]
        clear: bool,

        /// Move a rectangle by an offset
        #[arg(long = "move", value_name = "INDEX:DX,DY", value_parser = parse_indexed_pair)]
        moves: Vec<(usize, f64, f64)>,

        /// Set a rectangle's scale factors
        #[arg(long = "scale", value_name = "INDEX:SX,SY", value_parser = parse_indexed_pair)]
        scales: Vec<(usize, f64, f64)>,

        /// Set a rectangle's rotation in degrees
        #[arg(long = "rotate", value_name = "INDEX:DEG", value_parser = parse_indexed_value)]
        rotations: Vec<(usize, f64)>,

        /// Replace the stored metadata
        #[arg(long)]
        meta: Option<String>,
    },
    /// Delete a stored annotation
    Delete { id: i64 },
    /// Write the stored image of an annotation to a file
    Export {
        id: i64,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },
}

fn parse_numbers(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in {:?}: {}", s, e))
}

fn parse_rect(s: &str) -> Result<Shape, String> {
    match parse_numbers(s)?.as_slice() {
        [x, y, w, h] => Ok(Shape::new(*x, *y, *w, *h)),
        [x, y, w, h, rotation] => Ok(Shape {
            angle: *rotation,
            ..Shape::new(*x, *y, *w, *h)
        }),
        _ => Err(format!("expected X,Y,W,H[,ROT], got {:?}", s)),
    }
}

fn split_index(s: &str) -> Result<(usize, &str), String> {
    let (index, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:VALUE, got {:?}", s))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid index in {:?}: {}", s, e))?;
    Ok((index, rest))
}

fn parse_indexed_pair(s: &str) -> Result<(usize, f64, f64), String> {
    let (index, rest) = split_index(s)?;
    match parse_numbers(rest)?.as_slice() {
        [a, b] => Ok((index, *a, *b)),
        _ => Err(format!("expected INDEX:A,B, got {:?}", s)),
    }
}

fn parse_indexed_value(s: &str) -> Result<(usize, f64), String> {
    let (index, rest) = split_index(s)?;
    match parse_numbers(rest)?.as_slice() {
        [value] => Ok((index, *value)),
        _ => Err(format!("expected INDEX:VALUE, got {:?}", s)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_boxes(editor: &Editor<ShapeCanvas>) -> anyhow::Result<()> {
    for (i, bbox) in editor.bounding_boxes()?.iter().enumerate() {
        println!(
            "  [{}] ({}, {}) {}x{} rotation {}",
            i, bbox.x, bbox.y, bbox.width, bbox.height, bbox.rotation
        );
    }
    Ok(())
}

async fn run(command: Command, config: AppConfig, db: &AnnotationDb) -> anyhow::Result<()> {
    match command {
        Command::New {
            image_path,
            rects,
            default_rects,
            meta,
        } => {
            let bytes = tokio::fs::read(&image_path).await?;
            let mut editor = Editor::new(config.editor, ShapeCanvas::new());
            let size = editor.load_image(bytes)?;
            println!("Image loaded: {}x{}", size.width, size.height);

            for _ in 0..default_rects {
                editor.add_rectangle()?;
            }
            for shape in rects {
                editor.add_shape(shape)?;
            }
            editor.set_meta_info(meta);

            let outcome = editor.save(db).await?;
            println!("{} (id {})", outcome.message(), outcome.id());
            print_boxes(&editor)?;
        }
        Command::List => {
            let annotations = db.get_annotations().await?;
            println!("Total annotations: {}", annotations.len());
            for annotation in &annotations {
                let image_len = STANDARD
                    .decode(&annotation.image_data)
                    .map(|b| b.len())
                    .unwrap_or(0);
                println!(
                    "  {}: {} boxes, {} bytes{}",
                    annotation.id,
                    annotation.bounding_boxes.len(),
                    image_len,
                    annotation
                        .meta_info
                        .as_deref()
                        .map(|m| format!(" - {}", m))
                        .unwrap_or_default()
                );
            }
        }
        Command::Show {
            id,
            json,
            with_image,
        } => {
            let annotation = db.get_annotation(id).await?;
            if json {
                let value = if with_image {
                    serde_json::to_value(&annotation)?
                } else {
                    serde_json::json!({
                        "id": annotation.id,
                        "bounding_boxes": annotation.bounding_boxes,
                        "meta_info": annotation.meta_info,
                    })
                };
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let mut editor = Editor::new(config.editor, ShapeCanvas::new());
                match editor.open_annotation(annotation)? {
                    Some(size) => println!("Annotation {} ({}x{})", id, size.width, size.height),
                    None => println!("Annotation {} (unreadable image)", id),
                }
                if let Some(meta) = editor.meta_info() {
                    println!("  meta: {}", meta);
                }
                print_boxes(&editor)?;
            }
        }
        Command::Edit {
            id,
            add,
            remove,
            clear,
            moves,
            scales,
            rotations,
            meta,
        } => {
            let mut editor = Editor::new(config.editor, ShapeCanvas::new());
            editor.fetch_annotation(db, id).await?;

            // Indices refer to the stored order, before anything is removed.
            let original: Vec<ShapeId> = (0..editor.surface().len())
                .filter_map(|i| editor.surface().id_at(i))
                .collect();
            let resolve = |index: usize| {
                original
                    .get(index)
                    .copied()
                    .ok_or_else(|| anyhow::anyhow!("no rectangle at index {}", index))
            };

            for (index, dx, dy) in moves {
                editor.surface_mut().move_by(resolve(index)?, dx, dy);
            }
            for (index, sx, sy) in scales {
                editor.surface_mut().scale_to(resolve(index)?, sx, sy);
            }
            for (index, angle) in rotations {
                editor.surface_mut().rotate_to(resolve(index)?, angle);
            }
            for index in remove {
                let target = resolve(index)?;
                editor.surface_mut().select(target);
                editor.remove_selected();
            }
            if clear {
                let removed = editor.remove_all();
                println!("Removed {} rectangles", removed);
            }
            for shape in add {
                editor.add_shape(shape)?;
            }
            if meta.is_some() {
                editor.set_meta_info(meta);
            }

            let outcome = editor.save(db).await?;
            println!("{} (id {})", outcome.message(), outcome.id());
            print_boxes(&editor)?;
        }
        Command::Delete { id } => {
            let mut editor = Editor::new(config.editor, ShapeCanvas::new());
            editor.fetch_annotation(db, id).await?;
            editor.delete_annotation(db).await?;
            println!("Annotation {} deleted", id);
        }
        Command::Export { id, out } => {
            let annotation = db.get_annotation(id).await?;
            let bytes = STANDARD.decode(&annotation.image_data)?;
            tokio::fs::write(&out, &bytes).await?;
            println!("Wrote {} bytes to {:?}", bytes.len(), out);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = AppConfig::load(args.config.as_deref())?;
    let db = AnnotationDb::open(&args.db, &config.store).await?;

    let result = run(args.command, config, &db).await;
    db.close().await?;
    result
}
