mod config;
mod test_runner;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use bbcode::{Document, NodeId, NodeKind, ParserOptions, Recovery};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use renderer::{HtmlRenderer, RenderMode};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const SUBCOMMANDS: &[&str] = &["render", "tags", "test", "help"];

#[derive(Parser)]
#[command(name = "bbcode", version, about = "BBCode parser and renderer")]
struct Cli {
    /// Disable colored diagnostic output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging (otherwise RUST_LOG, default warn)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a BBCode file and render it
    Render(RenderArgs),

    /// List the configured tag definitions
    Tags(TagsArgs),

    /// Run .test.bb conformance files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// BBCode source file, or - for stdin
    file: String,

    /// Configuration file (default: bbcode.toml in this or a parent directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render with preview templates
    #[arg(long, conflicts_with_all = ["text", "bbcode", "tree"])]
    preview: bool,

    /// Print the text content only
    #[arg(long, conflicts_with_all = ["bbcode", "tree"])]
    text: bool,

    /// Print the minimal BBCode form of the parsed tree
    #[arg(long, conflicts_with = "tree")]
    bbcode: bool,

    /// Dump the parsed tree
    #[arg(long)]
    tree: bool,

    /// Only output elements with this tag name, one per line
    #[arg(long, value_name = "TAG")]
    find: Option<String>,

    /// Parse only; exit 1 if any markup had to be kept as literal text
    #[arg(long)]
    check: bool,

    /// Don't report markup kept as literal text
    #[arg(short, long)]
    quiet: bool,

    /// Treat backslashes as plain text instead of bracket escapes
    #[arg(long)]
    no_escapes: bool,
}

#[derive(clap::Args)]
struct TagsArgs {
    /// Configuration file (default: bbcode.toml in this or a parent directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.bb file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `bbcode file.bb` is shorthand for `bbcode render file.bb`; a bare `-`
    // names stdin.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| a == "-" || !a.starts_with('-'))
    {
        let pos = pos + 1;
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.no_color),
        Command::Tags(tags_args) => do_tags(tags_args),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn load_definitions(config_path: Option<&Path>) -> bbcode::DefinitionSet {
    let built = Config::load(config_path).and_then(|config| {
        match &config.config_path {
            Some(path) => tracing::info!(path = %path.display(), "using configuration"),
            None => tracing::debug!("no configuration file, using the default tags"),
        }
        let validators = config.validators()?;
        config.definitions(&validators)
    });
    match built {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn read_source(file: &str) -> std::io::Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(file)
    }
}

fn do_render(args: RenderArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let definitions = load_definitions(args.config.as_deref());

    let source = match read_source(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let parser = bbcode::Parser::new(&definitions).with_options(ParserOptions {
        escapes: !args.no_escapes,
    });
    let (document, recoveries) = match parser.parse_with_recoveries(&source) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if !args.quiet || args.check {
        let writer = StandardStream::stderr(color_choice);
        emit_recoveries(&writer, &files, file_id, &recoveries);
    }

    if args.check {
        if recoveries.is_empty() {
            eprintln!("ok: {} parsed cleanly", args.file);
            return;
        }
        eprintln!(
            "error: {} kept {} bracket sequence(s) as literal text",
            args.file,
            recoveries.len()
        );
        process::exit(1);
    }

    let targets: Vec<NodeId> = match &args.find {
        Some(tag) => document.elements_matching(tag, &definitions),
        None => vec![document.root()],
    };

    for id in targets {
        let output = if args.tree {
            let mut out = String::new();
            dump_tree(&document, id, 0, &mut out);
            out
        } else if args.bbcode {
            document.to_bbcode(id)
        } else if args.text {
            document.text_content(id)
        } else {
            let mode = if args.preview {
                RenderMode::Preview
            } else {
                RenderMode::Html
            };
            HtmlRenderer::with_mode(mode).render_node(&document, id)
        };
        println!("{}", output.trim_end_matches('\n'));
    }
}

fn do_tags(args: TagsArgs) {
    let definitions = load_definitions(args.config.as_deref());
    for definition in definitions.iter() {
        let mut flags = Vec::new();
        if definition.use_option() {
            flags.push("option".to_string());
        }
        if !definition.parse_content() {
            flags.push("raw".to_string());
        }
        if let Some(limit) = definition.nest_limit() {
            flags.push(format!("nest<={}", limit));
        }
        println!("{:<10} {:<24} {}", definition.name(), flags.join(","), definition.html());
    }
}

fn emit_recoveries(
    writer: &StandardStream,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    recoveries: &[Recovery],
) {
    let config = term::Config::default();
    for recovery in recoveries {
        let diagnostic = recovery.to_diagnostic(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn dump_tree(document: &Document, id: NodeId, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match document.node(id).kind() {
        NodeKind::Root { children } => {
            out.push_str(&format!("{}root\n", pad));
            for &child in children {
                dump_tree(document, child, depth + 1, out);
            }
        }
        NodeKind::Text(text) => {
            out.push_str(&format!("{}#{} text {:?}\n", pad, id.index(), text));
        }
        NodeKind::Element(element) => {
            out.push_str(&format!("{}#{} [{}]", pad, id.index(), element.tag_name()));
            for (key, value) in element.options().iter() {
                out.push_str(&format!(" {}={:?}", key, value));
            }
            out.push('\n');
            for &child in element.children() {
                dump_tree(document, child, depth + 1, out);
            }
        }
    }
}
