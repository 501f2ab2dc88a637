use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use sgc::codegen::CodegenOptions;
use sgc::diag::BuildError;
use sgc::graph::{build_graph, verify_edges, NodeInstance};
use sgc::library::NodeLibrary;
use sgc::template::TemplateCompiler;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    /// Shader program text
    Shader,
    /// Node ids in emission order, one per line
    Order,
    /// Graphviz DOT of the node graph
    Dot,
    /// Provenance JSON (graph hash, library fingerprint, version)
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "sgc",
    version,
    about = "Shader Graph Compiler — compiles JSON node graphs into shader programs"
)]
struct Cli {
    /// Input graph file (JSON array of node instances)
    graph: PathBuf,

    /// Node type library file (repeatable)
    #[arg(short = 'l', long = "library")]
    library: Vec<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Shader)]
    emit: EmitStage,

    /// Entry point signature wrapped around the node blocks
    #[arg(long, default_value = "void main(void)")]
    entry: String,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Omit `// node <id>, <type>` comments
    #[arg(long)]
    no_comments: bool,

    /// Print compiler passes and timing
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("sgc=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sgc=warn"))
    };
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(
        graph = %cli.graph.display(),
        libraries = cli.library.len(),
        emit = ?cli.emit,
        "sgc starting"
    );

    // ── Load node type library ──
    let mut library = NodeLibrary::new();
    for path in &cli.library {
        if let Err(e) = library.load_file(path) {
            eprintln!("sgc: error: {}", e);
            process::exit(2);
        }
    }
    tracing::debug!(types = library.len(), "library loaded");

    // ── Read graph ──
    let source = match std::fs::read_to_string(&cli.graph) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("sgc: error: {}: {}", cli.graph.display(), e);
            process::exit(2);
        }
    };
    let instances = match sgc::graph::parse_graph_str(&source, &cli.graph) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("sgc: error: {}", e);
            process::exit(1);
        }
    };

    let text = match cli.emit {
        EmitStage::Shader => emit_shader(&cli, &library, instances),
        EmitStage::Order => emit_order(&library, instances),
        EmitStage::Dot => emit_dot(&library, instances),
        EmitStage::BuildInfo => Ok(sgc::pipeline::compute_provenance(&source, &library).to_json()),
    };
    let text = match text {
        Ok(t) => t,
        Err(e) => {
            eprintln!("sgc: {}", e.to_diagnostic());
            process::exit(1);
        }
    };

    if let Err(e) = write_output(cli.output.as_deref(), &text) {
        eprintln!("sgc: error: {}", e);
        process::exit(2);
    }
}

fn emit_shader(
    cli: &Cli,
    library: &NodeLibrary,
    instances: Vec<NodeInstance>,
) -> Result<String, BuildError> {
    let options = CodegenOptions {
        entry_point: cli.entry.clone(),
        indent: " ".repeat(cli.indent),
        node_comments: !cli.no_comments,
    };
    let shader = sgc::pipeline::build_shader(library, instances, &TemplateCompiler, &options)?;
    for diag in &shader.diagnostics {
        eprintln!("sgc: {}", diag);
    }
    Ok(shader.source)
}

fn emit_order(library: &NodeLibrary, instances: Vec<NodeInstance>) -> Result<String, BuildError> {
    let graph = build_graph(instances)?;
    verify_edges(&graph, library)?;
    let order = sgc::schedule::sort(&graph)?;
    let mut text = String::new();
    for node in order {
        text.push_str(&node.id);
        text.push('\n');
    }
    Ok(text)
}

fn emit_dot(library: &NodeLibrary, instances: Vec<NodeInstance>) -> Result<String, BuildError> {
    let graph = build_graph(instances)?;
    verify_edges(&graph, library)?;
    Ok(sgc::dot::emit_dot(&graph))
}

fn write_output(path: Option<&Path>, text: &str) -> std::io::Result<()> {
    match path {
        Some(p) => std::fs::write(p, text).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", p.display(), e))
        }),
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(text.as_bytes())?;
            lock.flush()
        }
    }
}
