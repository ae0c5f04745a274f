use std::io::{Read, Write};
use std::path::Path;
use anyhow::{Context, Result};
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use serde::Deserialize;
use serde_json::Value;
use hybrid_report::{DEFAULT_PAYLOAD_KEY, RenderOptions, Renderer, codec, crypto};

const SECRET_ENV: &str = "HYBRID_REPORT_SECRET";
const DEFAULT_CONFIG: &str = "HybridReport.toml";

#[derive(Clone, Copy, Debug, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum InputFormat { Auto, Json, Yaml }

#[derive(Clone, Copy, Debug, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "HybridReport",
    about = "Render log payload documents as HTML tables and trees",
    long_about = "Renders a JSON or YAML document into an HTML fragment. Items under dataPage sections carry base64 JSON payloads, optionally sealed in AES-256-CBC envelopes; flat sections become tables, everything else a key/value tree.",
    after_long_help = "Examples:\n  HybridReport pedido.json --html pedido.html --meta-charset\n  HybridReport log.yaml --secret segredo --html log.html\n  HybridReport evento.json --seal --secret segredo\n  HYBRID_REPORT_SECRET=segredo HybridReport log.json --decrypt-keys rawobj,payload",
    color = ColorChoice::Auto
)]
struct Args {
    /// Document to render; stdin when absent or `-`
    input: Option<String>,
    #[arg(long, short = 'o')]
    html: Option<String>,
    #[arg(long, value_enum, default_value = "auto")]
    format: InputFormat,
    /// Envelope passphrase (falls back to HYBRID_REPORT_SECRET)
    #[arg(long)]
    secret: Option<String>,
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    decrypt_keys: Vec<String>,
    #[arg(long)]
    payload_key: Option<String>,
    #[arg(long, default_value_t = false)]
    meta_charset: bool,
    #[arg(long, default_value_t = false, help = "Seal the input document into a payload envelope instead of rendering it")]
    seal: bool,
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            input: None,
            html: None,
            format: InputFormat::Auto,
            secret: None,
            decrypt_keys: vec![],
            payload_key: None,
            meta_charset: false,
            seal: false,
            config: None,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            completions: None,
            completions_out: None,
        }
    }
}

#[derive(Deserialize, Default)]
struct AppConfig {
    html: Option<String>,
    format: Option<InputFormat>,
    decrypt_keys: Option<Vec<String>>,
    payload_key: Option<String>,
    meta_charset: Option<bool>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "HybridReport", &mut f); } else { clap_complete::generate(sh, &mut cmd, "HybridReport", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "HybridReport", &mut std::io::stdout());
        }
        return;
    }
    let cfg_path = args.config.clone().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    if let Ok(s) = std::fs::read_to_string(&cfg_path) {
        match toml::from_str::<AppConfig>(&s) {
            Ok(cfg) => apply_config(&mut args, cfg),
            Err(e) => eprintln!("Ignoring config {}: {}", cfg_path, e),
        }
    } else if args.config.is_some() {
        eprintln!("Config not found: {}", cfg_path);
    }
    init_logging(&args);
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// `--quiet` beats `--log-level`, which beats `-v`. `None` leaves `RUST_LOG` in charge.
fn level_filter(args: &Args) -> Option<log::LevelFilter> {
    if args.quiet { return Some(log::LevelFilter::Error); }
    if let Some(l) = args.log_level { return Some(l.into()); }
    match args.verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

// Text output is env_logger's own format; json emits one object per line.
fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(f) = level_filter(args) { builder.filter_level(f); }
    if matches!(args.log_format, Some(LogFormat::Json)) {
        builder.format(|buf, record| {
            writeln!(buf, "{}", serde_json::json!({
                "ts": chrono::Utc::now().to_rfc3339(),
                "level": record.level().as_str(),
                "target": record.target(),
                "msg": record.args().to_string(),
            }))
        });
    }
    if let Some(path) = &args.log_path {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => eprintln!("cannot open log file {}: {}", path, e),
        }
    }
    builder.init();
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.html.is_none() && let Some(v) = cfg.html { args.html = Some(v); }
    if args.format == InputFormat::Auto && let Some(v) = cfg.format { args.format = v; }
    if args.decrypt_keys.is_empty() && let Some(v) = cfg.decrypt_keys { args.decrypt_keys = v; }
    if args.payload_key.is_none() && let Some(v) = cfg.payload_key { args.payload_key = Some(v); }
    if let Some(v) = cfg.meta_charset { args.meta_charset = args.meta_charset || v; }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn run(args: &Args) -> Result<()> {
    let raw = read_input(args.input.as_deref())?;
    let format = resolve_format(args.format, args.input.as_deref());
    let secret = resolve_secret(args);
    if args.seal {
        let secret = secret.with_context(|| format!("--seal needs --secret or {}", SECRET_ENV))?;
        let doc = parse_document(&raw, format)?;
        let envelope = crypto::seal_payload(&serde_json::to_vec(&doc)?, &secret, crypto::random_iv()?);
        return write_output(args.html.as_deref(), &format!("{}\n", envelope), "Envelope");
    }
    let renderer = Renderer::new(build_options(args, secret));
    let html = match format {
        InputFormat::Yaml => renderer.render(&parse_document(&raw, format)?),
        _ => renderer.render_slice(&raw),
    };
    write_output(args.html.as_deref(), &html, "HTML")
}

fn build_options(args: &Args, secret: Option<String>) -> RenderOptions {
    let mut opts = RenderOptions { emit_charset_meta: args.meta_charset, ..Default::default() };
    if !args.decrypt_keys.is_empty() { opts.decrypt_keys = args.decrypt_keys.clone(); }
    opts.payload_key = args.payload_key.clone().unwrap_or_else(|| DEFAULT_PAYLOAD_KEY.to_string());
    if let Some(s) = secret { opts = opts.with_secret(s); }
    opts
}

fn resolve_secret(args: &Args) -> Option<String> {
    args.secret.clone().or_else(|| std::env::var(SECRET_ENV).ok()).filter(|s| !s.is_empty())
}

fn resolve_format(format: InputFormat, input: Option<&str>) -> InputFormat {
    if format != InputFormat::Auto { return format; }
    let ext = input.and_then(|p| Path::new(p).extension()).map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() { Some("yaml") | Some("yml") => InputFormat::Yaml, _ => InputFormat::Json }
}

fn read_input(input: Option<&str>) -> Result<Vec<u8>> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
        Some(p) => std::fs::read(p).with_context(|| format!("reading {}", p)),
    }
}

fn parse_document(raw: &[u8], format: InputFormat) -> Result<Value> {
    let text = codec::normalize_text(raw);
    match format {
        InputFormat::Yaml => serde_yaml::from_str(&text).context("parsing YAML document"),
        _ => serde_json::from_str(&text).context("parsing JSON document"),
    }
}

fn write_output(path: Option<&str>, text: &str, what: &str) -> Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, text).with_context(|| format!("{} write failed for {}", what, p))?;
            log::info!("{} written: {}", what, p);
        }
        None => std::io::stdout().write_all(text.as_bytes()).context("writing stdout")?,
    }
    Ok(())
}
