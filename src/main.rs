use std::{path::PathBuf, process, sync::Arc};

use markdraft::{
    application::{
        compose::TemplateComposer,
        convert::ConversionService,
        error::AppError,
        export::{
            docx::HtmlDocxExporter,
            pdf::{ChromiumLauncher, EnginePdfExporter},
        },
        render::ComrakRenderService,
    },
    config::{self, ConvertArgs},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    let conversions = build_conversion_service(&settings)?;

    match command {
        config::Command::Serve(_) => run_serve(&settings, conversions).await,
        config::Command::Convert(args) => run_convert(conversions, args).await,
    }
}

fn build_conversion_service(settings: &config::Settings) -> Result<ConversionService, AppError> {
    let composer = TemplateComposer::load()?;
    let launcher = ChromiumLauncher::new(
        settings.pdf.chrome_executable.clone(),
        settings.pdf.step_timeout,
    );

    Ok(ConversionService::new(
        Arc::new(ComrakRenderService::default()),
        Arc::new(composer),
        Arc::new(HtmlDocxExporter::new()),
        Arc::new(EnginePdfExporter::new(Arc::new(launcher))),
    ))
}

async fn run_serve(
    settings: &config::Settings,
    conversions: ConversionService,
) -> Result<(), AppError> {
    let router = http::build_router(
        HttpState::new(conversions),
        settings.server.body_limit_bytes,
    );

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "markdraft::serve",
        addr = %settings.server.addr,
        body_limit_bytes = settings.server.body_limit_bytes,
        "MarkDraft listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = Arc::clone(&shutdown);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            wait_for_shutdown_signal().await;
            info!(target = "markdraft::serve", "shutdown signal received; draining");
            trigger.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::from(InfraError::server(err.to_string())))?;
        }
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "markdraft::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; exiting with requests in flight"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run_convert(conversions: ConversionService, args: ConvertArgs) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let result = conversions
        .convert(args.format, Some(markdown), args.orientation.as_deref())
        .await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&result.suggested_filename));
    tokio::fs::write(&output, &result.bytes)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "markdraft::convert",
        input = %args.input.display(),
        output = %output.display(),
        format = args.format.as_str(),
        bytes = result.bytes.len(),
        "Document written"
    );
    Ok(())
}
