use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use thumbnailer_core::{Config, InvocationEvent, ResultDescriptor};
use thumbnailer_infra::{init_telemetry, log_error, shutdown_telemetry};
use thumbnailer_lambda::{invocation_span, InvocationInfo, Thumbnailer};
use thumbnailer_processing::TransformOptions;
use thumbnailer_storage::create_storage;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    init_telemetry(config.log_format())?;

    // Built once per container and shared by every invocation it serves.
    let storage = create_storage(&config).await?;
    let thumbnailer = Arc::new(
        Thumbnailer::new(storage).with_options(TransformOptions::from_config(&config)),
    );

    tracing::info!(
        environment = %config.environment(),
        storage_backend = %config.storage_backend(),
        "Thumbnailer ready"
    );

    let result = run(service_fn(|event: LambdaEvent<InvocationEvent>| {
        let thumbnailer = thumbnailer.clone();
        async move { invoke(&thumbnailer, event).await }
    }))
    .await;

    shutdown_telemetry().await;
    result
}

async fn invoke(
    thumbnailer: &Thumbnailer,
    event: LambdaEvent<InvocationEvent>,
) -> Result<ResultDescriptor, Error> {
    let (payload, context) = event.into_parts();
    let info = InvocationInfo::begin(context.request_id);

    async {
        let result = thumbnailer.handle(payload).await;
        if let Err(e) = &result {
            log_error(e);
        }
        tracing::info!(
            duration_ms = info.elapsed_ms(),
            success = result.is_ok(),
            "Invocation finished"
        );
        result.map_err(Error::from)
    }
    .instrument(invocation_span(&info))
    .await
}
