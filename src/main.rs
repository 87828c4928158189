use anyhow::{bail, Context};
use cachefetch::table::{table_into_array, table_into_xml};
use cachefetch::{FetchRequest, Fetcher, FetcherConfig, FreshnessPolicy};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cachefetch")]
#[command(version)]
#[command(about = "Fetch a URL over raw HTTP/1.0, keeping a cached copy on disk")]
struct Args {
    /// URL to fetch; the scheme defaults to http
    url: String,

    /// Directory holding cache entries
    #[arg(short = 'd', long, env = "CACHEFETCH_CACHE_DIR", default_value = ".")]
    cache_dir: PathBuf,

    /// Freshness: seconds a copy stays usable, 0 for no caching, or "daily"
    #[arg(short = 't', long, default_value = "0")]
    ttl: FreshnessPolicy,

    /// Cache entry name instead of the MD5 of the URL
    #[arg(short = 'n', long, default_value = "")]
    name: String,

    /// Basic auth user
    #[arg(short = 'u', long, default_value = "")]
    user: String,

    /// Basic auth password
    #[arg(short = 'p', long, default_value = "")]
    password: String,

    /// Request verb, any token is sent as given
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Raw request body
    #[arg(long)]
    data: Option<String>,

    /// Content-Type of the raw body
    #[arg(long)]
    content_type: Option<String>,

    /// Form field as name=value; forces a POST
    #[arg(short = 'F', long = "form", value_parser = parse_pair)]
    form: Vec<(String, String)>,

    /// Extra header as "Name: value"
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 30)]
    connect_timeout: u64,

    /// Read timeout in seconds; reads wait forever when unset
    #[arg(long)]
    read_timeout: Option<u64>,

    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long)]
    referer: Option<String>,

    /// Skip certificate verification for https
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Print the header block before the body
    #[arg(short = 'i', long)]
    show_header: bool,

    /// Print the fetch log to stderr
    #[arg(short = 'v', long)]
    show_log: bool,

    /// Print one table of the page as tab-separated rows
    #[arg(long, conflicts_with = "table_xml")]
    table: bool,

    /// Print one table of the page as XML
    #[arg(long)]
    table_xml: bool,

    /// Text marking the table to extract
    #[arg(long, default_value = "")]
    needle: String,

    /// The needle is inside the table rather than before it
    #[arg(long)]
    needle_inside: bool,

    /// Tags kept in table cells, e.g. "<a><b>"
    #[arg(long, default_value = "")]
    allowed_tags: String,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{}`", s))?;
    Ok((name.to_string(), value.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got `{}`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in `{}`", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Args {
    fn config(&self) -> FetcherConfig {
        let mut builder = FetcherConfig::builder()
            .cache_dir(&self.cache_dir)
            .connect_timeout(Duration::from_secs(self.connect_timeout))
            .read_timeout(self.read_timeout.map(Duration::from_secs))
            .verify_tls(!self.insecure);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(referer) = &self.referer {
            builder = builder.referer(referer);
        }
        builder.build()
    }

    fn request(&self) -> FetchRequest {
        let mut builder = FetchRequest::builder(&self.url)
            .method(self.method.as_str())
            .credentials(&self.user, &self.password)
            .policy(self.ttl)
            .name(&self.name);
        for (name, value) in &self.form {
            builder = builder.form_field(name, value);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if let Some(data) = &self.data {
            builder = builder.raw_body(data.as_bytes());
        }
        if let Some(content_type) = &self.content_type {
            builder = builder.raw_content_type(content_type);
        }
        builder.build()
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(args.config());
    let request = args.request();
    debug!("fetching {} with ttl {}", request.url(), request.policy());

    let result = fetcher.fetch(&request);

    if args.show_log {
        for entry in &result.log {
            eprintln!("{}", entry);
        }
    }
    if let Some(e) = &result.cache_error {
        eprintln!("warning: {}", e);
    }
    if let Some(e) = &result.error {
        bail!("{}", e);
    }

    let mut out = std::io::stdout().lock();

    if args.table || args.table_xml {
        let html = result.body_text();
        if args.table_xml {
            let xml = table_into_xml(&html, &args.needle, args.needle_inside, &args.allowed_tags)
                .context("no table found")?;
            writeln!(out, "{}", xml)?;
        } else {
            let rows = table_into_array(&html, &args.needle, args.needle_inside, &args.allowed_tags)
                .context("no table found")?;
            for row in rows {
                writeln!(out, "{}", row.join("\t"))?;
            }
        }
        return Ok(());
    }

    if args.show_header {
        out.write_all(&result.header)?;
        out.write_all(b"\r\n")?;
    }
    out.write_all(&result.body)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cachefetch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
