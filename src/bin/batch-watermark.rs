use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use batch_watermark::{
    blending, decode, is_supported_image, Anchor, Color, CompositeOptions, Compositor,
    FontFamily, ImageWatermark, NamedImage, PreviewOptions, SourceFile, TextWatermark,
    WatermarkSpec,
};

#[derive(Parser)]
#[command(
    name = "batch-watermark",
    about = "Batch-apply an image or text watermark and write PNG outputs",
    version,
    after_help = "Image mode: batch-watermark photos/ -w logo.png -o out/\n\
                  Text mode:  batch-watermark beach.jpg -t \"(c) 2024\" --color '#000000'\n\n\
                  Outputs are named {stem}_processed.png. Nothing is written unless every input succeeds."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Placement: top-left, top-right, bottom-left, bottom-right or center
    #[arg(short, long, default_value = "bottom-right")]
    anchor: Anchor,

    /// Watermark opacity (0.0-1.0)
    #[arg(long, default_value = "0.8")]
    opacity: f32,

    /// Image file to use as the watermark
    #[arg(short, long, conflicts_with = "text")]
    watermark: Option<PathBuf>,

    /// Watermark width as a fraction of each image's width
    #[arg(short, long, default_value = "0.2")]
    scale: f32,

    /// Text to use as the watermark
    #[arg(short, long)]
    text: Option<String>,

    /// Text size in pixels
    #[arg(long, default_value = "24")]
    font_size: f32,

    /// Text color, hex (#RGB, #RRGGBB, #RRGGBBAA) or a CSS name
    #[arg(long, default_value = "#ffffff")]
    color: String,

    /// Bold text
    #[arg(long)]
    bold: bool,

    /// Italic text
    #[arg(long)]
    italic: bool,

    /// TrueType/OpenType font file replacing the embedded sans-serif family
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also write a preview PNG of the first input to this path
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Preview width in pixels
    #[arg(long, default_value = "600")]
    preview_width: u32,

    /// Caption drawn on the preview
    #[arg(long)]
    preview_name: Option<String>,

    /// Print "<name>\t<data URI>" lines to stdout instead of writing files
    #[arg(long)]
    data_uri: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if !(0.0..=1.0).contains(&cli.opacity) {
        fail("Opacity must be between 0.0 and 1.0");
    }
    if !(cli.scale.is_finite() && cli.scale > 0.0) {
        fail("Scale must be a positive number");
    }
    if !(cli.font_size.is_finite() && cli.font_size > 0.0) {
        fail("Font size must be a positive number");
    }
    if cli.watermark.is_none() && cli.text.is_none() {
        fail("Specify a watermark with --watermark <FILE> or --text <TEXT>");
    }

    let engine = match &cli.font {
        Some(path) => match std::fs::read(path)
            .map_err(batch_watermark::Error::from)
            .and_then(FontFamily::from_bytes)
        {
            Ok(fonts) => Compositor::with_fonts(fonts),
            Err(e) => fail(&format!("Failed to load font {}: {e}", path.display())),
        },
        None => match Compositor::new() {
            Ok(e) => e,
            Err(e) => fail(&format!("Fatal: Failed to initialize engine: {e}")),
        },
    };

    let paths = collect_inputs(&cli.inputs);
    if paths.is_empty() {
        fail("No supported images found (png, jpg, jpeg, webp, bmp)");
    }
    info!(count = paths.len(), "collected inputs");

    let overlay: Option<NamedImage> = cli.watermark.as_deref().map(|path| {
        SourceFile::read(path)
            .and_then(|source| decode(&source))
            .unwrap_or_else(|e| fail(&format!("Failed to load watermark: {e}")))
    });

    let watermark = match &cli.text {
        Some(text) => {
            let color = Color::parse(&cli.color).unwrap_or_else(|e| fail(&e.to_string()));
            WatermarkSpec::Text(TextWatermark {
                text: text.clone(),
                font_size: cli.font_size,
                color,
                bold: cli.bold,
                italic: cli.italic,
                opacity: cli.opacity,
            })
        }
        None => WatermarkSpec::Image(ImageWatermark {
            image: overlay.as_ref().map(|o| &o.image),
            scale: cli.scale,
            opacity: cli.opacity,
        }),
    };
    let options = CompositeOptions {
        anchor: cli.anchor,
        watermark,
    };

    let sources: Vec<SourceFile> = paths
        .iter()
        .map(|p| {
            SourceFile::read(p).unwrap_or_else(|e| fail(&format!("{}: {e}", p.display())))
        })
        .collect();

    let results = match engine.composite_all(&sources, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[FAIL] {e}");
            eprintln!("No output written.");
            process::exit(1);
        }
    };

    if let Some(preview_path) = &cli.preview {
        write_preview(&engine, &sources[0], &options, &cli, preview_path);
    }

    let mut fail_count = 0u32;
    for (input, result) in paths.iter().zip(&results) {
        if cli.data_uri {
            println!("{}\t{}", result.name, result.data_uri());
            continue;
        }
        let dir = match &cli.output {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        match result.save_in(&dir) {
            Ok(path) => {
                if !cli.quiet {
                    eprintln!("[OK] {} -> {}", display_name(input), path.display());
                }
            }
            Err(e) => {
                eprintln!("[FAIL] {}: {e}", result.name);
                fail_count += 1;
            }
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {}", results.len() - fail_count as usize);
        if fail_count > 0 {
            eprint!(", Failed to write: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

/// Expand directories to their supported images (sorted by name); files are
/// kept as given, in argument order.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = match std::fs::read_dir(input) {
                Ok(rd) => rd
                    .filter_map(std::result::Result::ok)
                    .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                    .map(|e| e.path())
                    .filter(|p| is_supported_image(p))
                    .collect(),
                Err(e) => fail(&format!("Failed to read directory {}: {e}", input.display())),
            };
            entries.sort();
            debug!(dir = %input.display(), count = entries.len(), "expanded directory");
            paths.extend(entries);
        } else if input.exists() {
            paths.push(input.clone());
        } else {
            fail(&format!("Input path does not exist: {}", input.display()));
        }
    }
    paths
}

fn write_preview(
    engine: &Compositor,
    source: &SourceFile,
    options: &CompositeOptions<'_>,
    cli: &Cli,
    path: &Path,
) {
    let base = decode(source).unwrap_or_else(|e| fail(&e.to_string()));
    let preview = engine.preview(
        &base.image,
        options,
        &PreviewOptions {
            width: cli.preview_width,
            caption: cli.preview_name.clone(),
        },
    );
    let written = blending::encode_png(&preview)
        .and_then(|png| std::fs::write(path, png).map_err(batch_watermark::Error::from));
    match written {
        Ok(()) => {
            if !cli.quiet {
                eprintln!("[PREVIEW] {}", path.display());
            }
        }
        Err(e) => fail(&format!("Failed to write preview: {e}")),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
