use crate::attributes::{DATE_ATTR, ID_ATTR};
use crate::config::Config;
use crate::errors::AppError;
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use tracing;

/// Creates a table keyed by a single string partition key if it doesn't exist.
///
/// For the daily picks table the partition key is the date, which is what keeps
/// one pick per day.
async fn create_table_if_not_exists(
    client: &DynamoDbClient,
    table_name: &str,
    partition_key: &str,
) -> Result<(), AppError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(partition_key)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(partition_key)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, e)))
                }
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Ensures both tables exist.
pub async fn init_resources(client: &DynamoDbClient, config: &Config) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing DynamoDB tables...");
    create_table_if_not_exists(client, &config.artifacts_table, ID_ATTR).await?;
    create_table_if_not_exists(client, &config.daily_picks_table, DATE_ATTR).await?;
    tracing::info!("Startup: DynamoDB table initialization complete.");
    Ok(())
}

/// Runs [`init_resources`] in the background so the server can start listening before
/// the store is reachable. Failures are logged and not retried.
pub fn spawn_init_resources(client: DynamoDbClient, config: Config) {
    tokio::spawn(async move {
        if let Err(e) = init_resources(&client, &config).await {
            tracing::error!(error = %e, "Startup: Store initialization failed; requests may fail until the store is reachable");
        }
    });
}
