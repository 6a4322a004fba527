//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::iex_adapter::IexAdapter;
use crate::adapters::memory_store::MemoryStore;
use crate::adapters::system_clock::SystemClock;
use crate::domain::error::QuoteCacheError;
use crate::domain::price::PricePoint;
use crate::domain::resolver::PriceResolver;
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::PriceStore;

#[derive(Parser, Debug)]
#[command(name = "quotecache", about = "Cached historical price lookups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve historical prices for a symbol
    Prices {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        range: Option<String>,
        /// Trading date as YYYYMMDD
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Fetch a whole range with one remote call and store what is missing
    Warm {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        range: String,
    },
    /// Print stored prices, one per symbol and date
    Cached {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// List symbols known to the quote source
    Symbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show last traded prices
    Last {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma separated, e.g. FB,AAPL
        #[arg(long)]
        symbols: String,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a command needs to build a [`PriceResolver`].
pub struct Services {
    pub store: Arc<dyn PriceStore>,
    pub quotes: Arc<dyn QuotePort>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuoteCacheError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            store: build_store(config)?,
            quotes: build_quote_source(config, clock.clone())?,
            clock,
        })
    }

    pub fn resolver(&self) -> PriceResolver<'_> {
        PriceResolver::new(&*self.store, &*self.quotes, &*self.clock)
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Prices {
            config,
            symbol,
            range,
            date,
        } => run_prices(&config, &symbol, range.as_deref(), date.as_deref()),
        Command::Warm {
            config,
            symbol,
            range,
        } => run_warm(&config, &symbol, &range),
        Command::Cached { config, symbol } => run_cached(&config, symbol.as_deref()),
        Command::Symbols { config } => run_symbols(&config),
        Command::Last { config, symbols } => run_last(&config, &symbols),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuoteCacheError> {
    FileConfigAdapter::from_file(path).map_err(|e| QuoteCacheError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_store(config: &dyn ConfigPort) -> Result<Arc<dyn PriceStore>, QuoteCacheError> {
    let backend = config
        .get_string("store", "backend")
        .unwrap_or_else(|| "sqlite".to_string());

    match backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(
            crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?,
        )),
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Arc::new(
            crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?,
        )),
        other => Err(QuoteCacheError::ConfigInvalid {
            section: "store".into(),
            key: "backend".into(),
            reason: format!("unsupported backend {other:?} (enabled: {})", enabled_backends()),
        }),
    }
}

fn enabled_backends() -> String {
    let mut names = vec!["memory"];
    if cfg!(feature = "sqlite") {
        names.push("sqlite");
    }
    if cfg!(feature = "postgres") {
        names.push("postgres");
    }
    names.join(", ")
}

pub fn build_quote_source(
    config: &dyn ConfigPort,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn QuotePort>, QuoteCacheError> {
    let source = config
        .get_string("quotes", "source")
        .unwrap_or_else(|| "iex".to_string());

    match source.as_str() {
        "iex" => Ok(Arc::new(IexAdapter::from_config(config)?)),
        "csv" => {
            let dir = config.get_string("quotes", "csv_dir").ok_or_else(|| {
                QuoteCacheError::ConfigMissing {
                    section: "quotes".into(),
                    key: "csv_dir".into(),
                }
            })?;
            Ok(Arc::new(CsvAdapter::new(PathBuf::from(dir), clock)))
        }
        other => Err(QuoteCacheError::ConfigInvalid {
            section: "quotes".into(),
            key: "source".into(),
            reason: format!("unknown source {other:?}"),
        }),
    }
}

/// `symbol,date,open,high,low,close,volume`
pub fn format_price_line(price: &PricePoint) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        price.symbol,
        price.date.format("%Y-%m-%d"),
        price.open,
        price.high,
        price.low,
        price.close,
        price.volume
    )
}

fn run_prices(
    config_path: &Path,
    symbol: &str,
    range: Option<&str>,
    date: Option<&str>,
) -> Result<(), QuoteCacheError> {
    let services = Services::from_config(&load_config(config_path)?)?;
    let prices = services.resolver().resolve(symbol, range, date)?;

    if prices.is_empty() {
        eprintln!("No prices found for {symbol}");
    }
    for price in &prices {
        println!("{}", format_price_line(price));
    }
    Ok(())
}

fn run_warm(config_path: &Path, symbol: &str, range: &str) -> Result<(), QuoteCacheError> {
    let services = Services::from_config(&load_config(config_path)?)?;
    let written = services.resolver().warm_range(symbol, range)?;
    eprintln!("{written} prices stored for {symbol}");
    Ok(())
}

fn run_cached(config_path: &Path, symbol: Option<&str>) -> Result<(), QuoteCacheError> {
    let services = Services::from_config(&load_config(config_path)?)?;
    let records = services.resolver().cached_prices(symbol)?;

    for record in &records {
        println!("{}", format_price_line(&record.price));
    }
    eprintln!("{} stored prices", records.len());
    Ok(())
}

fn run_symbols(config_path: &Path) -> Result<(), QuoteCacheError> {
    let services = Services::from_config(&load_config(config_path)?)?;
    let symbols = services.resolver().list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found");
    }
    for info in &symbols {
        match &info.name {
            Some(name) => println!("{},{}", info.symbol, name),
            None => println!("{}", info.symbol),
        }
    }
    Ok(())
}

fn run_last(config_path: &Path, symbols: &str) -> Result<(), QuoteCacheError> {
    let services = Services::from_config(&load_config(config_path)?)?;
    let symbols: Vec<String> = symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    for last in services.resolver().last_traded_prices(&symbols)? {
        println!("{},{},{},{}", last.symbol, last.price, last.size, last.time);
    }
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), QuoteCacheError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, DEFAULT_LISTEN, build_router};
        use std::net::SocketAddr;

        info!(config = %config_path.display(), "loading config");
        let config = load_config(config_path)?;
        let services = Services::from_config(&config)?;

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = listen.parse().map_err(|e: std::net::AddrParseError| {
            QuoteCacheError::ConfigInvalid {
                section: "web".into(),
                key: "listen".into(),
                reason: e.to_string(),
            }
        })?;

        let router = build_router(AppState {
            store: services.store,
            quotes: services.quotes,
            clock: services.clock,
        });

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "web server listening");
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        info!(config = %config_path.display(), "serve requested without web support");
        Err(QuoteCacheError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the web feature".into(),
        })
    }
}
