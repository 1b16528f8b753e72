use autoheal::adapters::outbound::console::{StderrProgressReporter, SummaryFormatter};
use autoheal::adapters::outbound::filesystem::{DiskCache, FileSystemReader, FileSystemWriter};
use autoheal::adapters::outbound::network::{
    CachedFetcher, CachingReleaseRegistry, DepsDevClient, DepsDevDependencySource,
    FallbackMetadataSource, OsvClient, PyPiClient, PyPiDependencySource, RetryingFetcher,
    RetryingReleaseRegistry, DEFAULT_TIMEOUT_SECS,
};
use autoheal::adapters::outbound::process::CommandVerifier;
use autoheal::application::dto::RemediationRequest;
use autoheal::application::factories::FixSelectorFactory;
use autoheal::application::use_cases::RemediateUseCase;
use autoheal::cli::Args;
use autoheal::config::{self, Settings};
use autoheal::remediation::services::{MarkerEnvironment, VersionResolver};
use autoheal::shared::error::ExitCode;
use autoheal::shared::Result;
use std::io::IsTerminal;
use std::process;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "AUTOHEAL_LOG";

#[tokio::main]
async fn main() {
    // Parse command-line arguments (clap exits with code 2 on usage errors)
    let args = Args::parse_args();
    init_tracing(&args);

    match run(args).await {
        Ok(code) => process::exit(code.as_i32()),
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

/// `-v` wins over the environment; otherwise AUTOHEAL_LOG, then RUST_LOG
fn init_tracing(args: &Args) {
    let filter = if args.verbose > 0 {
        EnvFilter::new(args.log_level())
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(args.log_level()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    // Load configuration: explicit path, or discovered next to the manifest
    let config = match &args.config {
        Some(path) => config::load_config_from_path(path)?,
        None => config::discover_config(&args.manifest_dir())?.unwrap_or_default(),
    };
    let settings = Settings::resolve(config, args.overrides());
    debug!(?settings, "Resolved settings");

    let environment = MarkerEnvironment::current().with_overrides(&settings.marker_overrides)?;
    let network_timeout = settings
        .network_timeout
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

    // Create adapters (Dependency Injection)
    let manifest_reader = FileSystemReader::new();
    let registry = CachingReleaseRegistry::new(RetryingReleaseRegistry::new(
        PyPiClient::with_base_url(PyPiClient::BASE_URL, network_timeout)?,
        settings.retry,
    ));

    // Both metadata sources fetch through the disk cache, so a warm cache
    // answers every lookup without a remote call
    let cache = DiskCache::new(settings.cache_dir.clone())?;
    info!(cache_dir = %cache.dir().display(), "Using metadata cache");
    let fallback = if settings.pypi_fallback {
        Some(PyPiDependencySource::new(
            CachedFetcher::new(
                RetryingFetcher::new(
                    PyPiClient::with_base_url(PyPiClient::BASE_URL, network_timeout)?,
                    settings.retry,
                ),
                cache.namespace(PyPiClient::CACHE_NAMESPACE)?,
            ),
            environment.clone(),
        ))
    } else {
        None
    };
    let primary = DepsDevDependencySource::new(CachedFetcher::new(
        RetryingFetcher::new(
            DepsDevClient::with_base_url(DepsDevClient::BASE_URL, network_timeout)?,
            settings.retry,
        ),
        cache,
    ));
    let metadata_source = FallbackMetadataSource::new(primary, fallback);

    let vulnerability_source = OsvClient::with_config(
        OsvClient::API_BASE,
        settings
            .network_timeout
            .unwrap_or(Duration::from_secs(OsvClient::TIMEOUT_SECONDS)),
        Duration::from_millis(OsvClient::RATE_LIMIT_MS),
        settings.retry,
    )?;

    let verifier = settings
        .verify_command
        .clone()
        .map(|argv| CommandVerifier::new(argv, settings.verify_timeout))
        .transpose()?;

    let artifact_writer = FileSystemWriter::new(args.output_dir.clone());
    let progress_reporter = StderrProgressReporter::new();

    // Create use case with injected dependencies
    let mut use_case = RemediateUseCase::new(
        manifest_reader,
        VersionResolver::new(registry),
        metadata_source,
        vulnerability_source,
        verifier,
        artifact_writer,
        progress_reporter,
    )
    .with_environment(environment)
    .with_scan_settings(settings.scan);

    // Create fix selector using factory; a scan-only run never selects
    if !args.scan_only {
        let fix_selector = FixSelectorFactory::create(settings.strategy, &settings.reasoning)?;
        eprintln!("{}", FixSelectorFactory::progress_message(settings.strategy));
        use_case = use_case.with_fix_selector(fix_selector);
    }

    // Create request and execute
    let request = RemediationRequest::new(
        args.manifest.clone(),
        args.scan_only,
        settings.ignore_vulns.clone(),
    );
    let report = use_case.execute(request).await?;

    // Present summary
    let color = !args.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    print!("{}", SummaryFormatter::new(color).render(&report));

    Ok(report.exit_code())
}
