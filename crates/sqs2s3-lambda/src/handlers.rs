// SQS batch handler for Lambda
//
// Converts the delivered SqsEvent into inbound records and hands them to the
// configured dispatcher.

use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use sqs2s3_batch::BatchError;
use sqs2s3_writer::InboundRecord;

use crate::{InvocationResponse, LambdaState};

/// Process one delivered batch
pub(crate) async fn process_batch(
    event: SqsEvent,
    state: &LambdaState,
) -> Result<InvocationResponse, BatchError> {
    let records: Vec<InboundRecord> = event.records.into_iter().map(inbound_record).collect();

    let report = state.dispatcher.dispatch(&records).await?;
    Ok(InvocationResponse::ok(report.summary()))
}

/// Missing ids become empty strings; a missing body fails JSON parsing downstream.
pub(crate) fn inbound_record(message: SqsMessage) -> InboundRecord {
    InboundRecord {
        message_id: message.message_id.unwrap_or_default(),
        body: message.body.unwrap_or_default(),
    }
}
