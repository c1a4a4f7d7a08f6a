// AWS Lambda runtime adapter
//
// Receives SQS batches, stores each message as JSON in S3 and keeps the
// bucket's index.html current.
//
// The store handle is built once per execution environment and reused by
// every invocation.

use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use sqs2s3_batch::BatchDispatcher;
use sqs2s3_config::RuntimeConfig;
use sqs2s3_writer::{ObjectStore, OpenDalStore};
use std::sync::Arc;
use tracing::{info, Instrument};

mod handlers;
mod response;

pub use response::{InvocationResponse, ResponseBody};

/// State shared by all invocations of one execution environment
#[derive(Clone)]
pub(crate) struct LambdaState {
    pub dispatcher: BatchDispatcher,
}

impl LambdaState {
    fn from_config(config: &RuntimeConfig) -> Result<Self, Error> {
        let store: Arc<dyn ObjectStore> = Arc::new(
            OpenDalStore::from_config(&config.storage)
                .map_err(|e| Error::from(format!("Failed to initialize storage: {}", e)))?,
        );

        Ok(Self {
            dispatcher: BatchDispatcher::from_config(store, config),
        })
    }
}

/// Lambda handler for SQS batches
async fn handle_request(
    event: LambdaEvent<SqsEvent>,
    state: Arc<LambdaState>,
) -> Result<InvocationResponse, Error> {
    let (event, context) = event.into_parts();
    let span = tracing::info_span!(
        "batch",
        request_id = %context.request_id,
        records = event.records.len()
    );

    handlers::process_batch(event, &state)
        .instrument(span)
        .await
        // Failing the invocation hands the batch back to SQS for redelivery
        .map_err(Error::from)
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RuntimeConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;

    sqs2s3_config::init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("SQS2S3_GIT_HASH"),
        built_at = env!("SQS2S3_BUILD_TIMESTAMP"),
        backend = %config.storage.backend,
        dispatch_mode = %config.dispatch.mode,
        index_mode = %config.index.mode,
        "sqs2s3 Lambda starting"
    );

    let state = Arc::new(LambdaState::from_config(&config)?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let state = state.clone();
        async move { handle_request(event, state).await }
    }))
    .await
}
