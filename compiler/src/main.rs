use clap::Parser;
use std::path::{Path, PathBuf};

use sgc::catalog::{self, CatalogEntry};
use sgc::codegen::{emit_kernel, EmitOptions};
use sgc::ir::Builder;
use sgc::pipeline::BuildInfo;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    Glsl,
    Wrapper,
    Bindings,
    Dot,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "sgc",
    version,
    about = "Shader Generator Compiler — lowers per-pixel expression DAGs to GPU fragment kernels"
)]
struct Cli {
    /// Catalog kernel to emit
    kernel: Option<String>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Glsl)]
    emit: EmitStage,

    /// JSON file with emitter options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List catalog kernels and exit
    #[arg(long)]
    list: bool,

    /// Print compiler phases
    #[arg(long)]
    verbose: bool,
}

// ── Logging ─────────────────────────────────────────────────────────────────

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("sgc: [{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn load_options(path: Option<&Path>) -> Result<EmitOptions, String> {
    let Some(path) = path else {
        return Ok(EmitOptions::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn write_output(path: Option<&Path>, text: &str) -> std::io::Result<()> {
    match path {
        Some(path) => std::fs::write(path, text),
        None => {
            use std::io::Write;
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list {
        for CatalogEntry { name, description, .. } in catalog::CATALOG {
            println!("{:<20} {}", name, description);
        }
        return;
    }

    let Some(kernel) = cli.kernel.as_deref() else {
        eprintln!("sgc: error: no kernel given (use --list to see the catalog)");
        std::process::exit(2);
    };
    let Some(entry) = catalog::find(kernel) else {
        eprintln!("sgc: error: unknown kernel '{}'", kernel);
        std::process::exit(2);
    };

    let options = match load_options(cli.config.as_deref()) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("sgc: error: {}", e);
            std::process::exit(2);
        }
    };

    if cli.verbose {
        eprintln!("sgc: kernel = {}", entry.name);
        eprintln!("sgc: emit   = {:?}", cli.emit);
        if let Some(path) = &cli.config {
            eprintln!("sgc: config = {}", path.display());
        }
    }

    // ── Build ──
    let mut builder = Builder::new();
    let root = match (entry.build)(&mut builder) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("sgc: {}", e.render());
            std::process::exit(1);
        }
    };
    if cli.verbose {
        eprintln!("sgc: built {} nodes", builder.len());
    }

    // ── Emit ──
    let document = match emit_kernel(&builder, root, &options) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("sgc: {}", e.render());
            std::process::exit(1);
        }
    };
    if cli.verbose {
        eprintln!(
            "sgc: emitted {} initializers, {} bindings",
            document.initializer_count,
            document.bindings.len()
        );
    }
    let rendered = match cli.emit {
        EmitStage::Glsl => Ok(document.source.clone()),
        EmitStage::Wrapper => Ok(document.wrapper(entry.name, &options)),
        EmitStage::Bindings => document.bindings_json(),
        EmitStage::Dot => Ok(sgc::dot::emit_dot(&builder, root)),
        EmitStage::BuildInfo => BuildInfo::new(entry.name, &document).to_json(),
    };
    let text = match rendered {
        Ok(t) => t,
        Err(e) => {
            eprintln!("sgc: error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = write_output(cli.output.as_deref(), &text) {
        let target = cli
            .output
            .as_deref()
            .map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string());
        eprintln!("sgc: error: {}: {}", target, e);
        std::process::exit(2);
    }
    if cli.verbose {
        if let Some(path) = &cli.output {
            eprintln!("sgc: wrote {}", path.display());
        }
    }
}
