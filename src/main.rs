//! Deckstamp CLI
//!
//! Usage:
//!   deckstamp [OPTIONS] <TEMPLATE> <CONFIG> <OUTPUT>
//!   deckstamp --list-layouts <TEMPLATE>
//!
//! CONFIG is a path to a JSON file, or the JSON itself.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use deckstamp::ooxml::pptx::Package;
use deckstamp::template::{ConfigSource, EngineOptions, TemplateError, run};

#[derive(Parser)]
#[command(name = "deckstamp", version)]
#[command(about = "Build a presentation from template slides with {{ placeholder }} substitution")]
struct Cli {
    /// Template presentation (.pptx)
    template: PathBuf,

    /// Configuration: JSON file path or inline JSON
    #[arg(required_unless_present = "list_layouts")]
    config: Option<String>,

    /// Output presentation path
    #[arg(required_unless_present = "list_layouts")]
    output: Option<PathBuf>,

    /// Print the template's masters, layouts and slide layouts, then exit
    #[arg(long)]
    list_layouts: bool,

    /// Keep runs without a typeface as they are
    #[arg(long)]
    no_font_normalization: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = if cli.list_layouts {
        list_layouts(&cli.template)
    } else {
        render(&cli)
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render(cli: &Cli) -> Result<(), TemplateError> {
    let (Some(config), Some(output)) = (cli.config.as_deref(), cli.output.as_deref()) else {
        return Err(TemplateError::Config("CONFIG and OUTPUT are required".to_string()));
    };
    let options = EngineOptions {
        normalize_fonts: !cli.no_font_normalization,
    };
    let report = run(&cli.template, config_source(config), output, options)?;
    println!(
        "Wrote {} slide(s) to {} ({} placeholder(s) filled, {} left unresolved)",
        report.slides,
        output.display(),
        report.resolved,
        report.unresolved
    );
    Ok(())
}

/// Inline JSON starts with `{`; anything else is a path.
fn config_source(arg: &str) -> ConfigSource {
    if arg.trim_start().starts_with('{') && !Path::new(arg).exists() {
        ConfigSource::Json(arg.to_string())
    } else {
        ConfigSource::Path(PathBuf::from(arg))
    }
}

fn list_layouts(template: &Path) -> Result<(), TemplateError> {
    let pkg = Package::open(template)?;

    println!("Slide masters:");
    for master in pkg.slide_masters()? {
        println!("  {} ({})", display_name(&master.name), master.partname);
        for layout in pkg.layouts_of(&master.partname)? {
            println!("    - {} ({})", display_name(&layout.name), layout.partname);
        }
    }

    println!("Slides:");
    for (i, slide) in pkg.slides()?.iter().enumerate() {
        let layout = pkg.layout_of(&slide.partname)?;
        let master = pkg.master_of(&layout.partname)?;
        println!(
            "  {}: layout '{}' (master '{}')",
            i + 1,
            layout.name,
            master.name
        );
    }
    Ok(())
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "<unnamed>" } else { name }
}
