// AWS Lambda binary entry point
//
// Build with: cargo build -p sqs2s3-lambda --release
// Deploy the resulting `bootstrap` on a provided.al2023 runtime with an SQS trigger.

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    sqs2s3_lambda::run().await
}
