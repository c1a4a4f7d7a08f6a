// Invocation result returned to the Lambda runtime
//
// Only successful batches produce a response; failed batches are returned as
// errors so SQS redelivers them (or moves them to the dead-letter queue).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseBody {
    pub message: String,
}

impl InvocationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody {
                message: message.into(),
            },
        }
    }
}
