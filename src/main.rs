//! ogcard CLI: serve, render and inspect share-image cards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use ogcard::params::{decode, QueryParams};
use ogcard::{ImageService, ServiceConfig, TemplateMode};

#[derive(Parser)]
#[command(name = "ogcard", version, about = "Open Graph share-image generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve cards over HTTP
    Serve {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listener address, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,

        /// Card served by this deployment
        #[arg(long, value_enum)]
        template: Option<TemplateMode>,

        /// Worker threads (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,

        /// Sans-serif face for themed cards
        #[arg(long)]
        fallback_font: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Render one card
    Render {
        /// Query string, e.g. "title=Hello&theme=blog"
        #[arg(short, long, default_value = "")]
        query: String,

        /// Output PNG path
        #[arg(short, long, default_value = "og.png")]
        output: PathBuf,

        /// Print a data URI instead of writing a file
        #[arg(long)]
        data_uri: bool,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        template: Option<TemplateMode>,

        #[arg(long)]
        fallback_font: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the layout tree of a card and its digest
    Layout {
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(long, value_enum, default_value_t = TemplateMode::Post)]
        template: TemplateMode,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the minimal shareable image URL for a query
    Url {
        /// Site origin the endpoint is served from
        #[arg(long)]
        base: String,

        #[arg(short, long, default_value = "")]
        query: String,

        /// JSON configuration file; supplies the endpoint path and template
        #[arg(long)]
        config: Option<PathBuf>,

        /// Endpoint path, overriding the configuration
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long, value_enum)]
        template: Option<TemplateMode>,

        /// Also print the og:image meta tag
        #[arg(long)]
        meta: bool,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            template,
            workers,
            fallback_font,
            verbose,
        } => {
            init_logger(verbose);
            let mut cfg = load_config(config.as_deref())?;
            if let Some(bind) = bind {
                cfg.bind_addr = bind;
            }
            if let Some(template) = template {
                cfg.template = template;
            }
            if let Some(workers) = workers {
                cfg.workers = workers;
            }
            if fallback_font.is_some() {
                cfg.fallback_font = fallback_font;
            }
            run_serve(cfg)?;
        }

        Commands::Render {
            query,
            output,
            data_uri,
            config,
            template,
            fallback_font,
            verbose,
        } => {
            init_logger(verbose);
            let mut cfg = load_config(config.as_deref())?;
            if let Some(template) = template {
                cfg.template = template;
            }
            if fallback_font.is_some() {
                cfg.fallback_font = fallback_font;
            }
            run_render(cfg, &query, &output, data_uri)?;
        }

        Commands::Layout {
            query,
            template,
            verbose,
        } => {
            init_logger(verbose);
            let tree = ogcard::rendering::render(&decode(&QueryParams::parse(&query), template));
            println!("{}", tree.to_canonical_json()?);
            println!("sha256 {}", tree.digest()?);
        }

        Commands::Url {
            base,
            query,
            config,
            endpoint,
            template,
            meta,
            verbose,
        } => {
            init_logger(verbose);
            let mut cfg = load_config(config.as_deref())?;
            if let Some(endpoint) = endpoint {
                cfg.endpoint_path = endpoint;
            }
            if let Some(template) = template {
                cfg.template = template;
            }
            cfg.validate().context("Invalid endpoint")?;
            let params = decode(&QueryParams::parse(&query), cfg.template).normalize();
            let url = cfg
                .share_url(&params, &base)
                .with_context(|| format!("Invalid base URL {}", base))?;
            println!("{}", url);
            if meta {
                println!("<meta property=\"og:image\" content=\"{}\" />", url);
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(ServiceConfig::default()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn run_serve(cfg: ServiceConfig) -> Result<()> {
    let rt = runtime()?;
    let service = ImageService::new(cfg).context("Failed to initialize image service")?;
    let server = ogcard::server::start(Arc::new(service), rt.handle().clone())
        .context("Failed to start server")?;
    eprintln!("listening on http://{}", server.addr());
    server.join();
    Ok(())
}

fn run_render(cfg: ServiceConfig, query: &str, output: &Path, data_uri: bool) -> Result<()> {
    let rt = runtime()?;
    let service = ImageService::new(cfg).context("Failed to initialize image service")?;
    let generated = rt
        .block_on(service.generate(query))
        .context("Failed to render card")?;

    if data_uri {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&generated.image.png_data);
        println!("data:image/png;base64,{}", encoded);
    } else {
        std::fs::write(output, &generated.image.png_data)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!(
            "wrote {} ({}x{}, etag {})",
            output.display(),
            generated.image.width,
            generated.image.height,
            generated.etag
        );
    }
    Ok(())
}
