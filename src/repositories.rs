use crate::{
    attributes::{
        artifact_to_item, item_to_artifact, item_to_pick, json_to_attr, pick_to_item, Item,
        DATE_ATTR, ID_ATTR, LIKED_BY_ATTR, TOTAL_LIKED_ATTR,
    },
    domain::{ArtifactRepository, DailyPickRepository},
    errors::RepoError,
    models::{Artifact, ArtifactFilter, ArtifactPatch, DailyPick, LikeAction, LikeWrite, PickInsert, SortKey},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::{put_item::PutItemError, update_item::UpdateItemError},
    types::{AttributeValue, ReturnValue, ReturnValuesOnConditionCheckFailure},
    Client as DynamoDbClient,
};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbArtifactRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbArtifactRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbArtifactRepository");
        Self { client, table_name }
    }

    fn key(id: Uuid) -> AttributeValue {
        AttributeValue::S(id.to_string())
    }

    fn decode(&self, item: &Item) -> Result<Artifact, RepoError> {
        item_to_artifact(item).ok_or_else(|| {
            let item_id = item.get(ID_ATTR).and_then(|v| v.as_s().ok());
            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item into Artifact");
            RepoError::DataCorruption(format!(
                "Failed to parse artifact {:?} from DynamoDB table '{}'",
                item_id, self.table_name
            ))
        })
    }

    /// Scans the whole table, following pagination, with an optional filter expression.
    async fn scan(
        &self,
        filter_expression: Option<&str>,
        values: &[(&str, AttributeValue)],
    ) -> Result<Vec<Artifact>, RepoError> {
        tracing::debug!(table_name = %self.table_name, filter = ?filter_expression, "DynamoDB: Scanning table");
        let mut artifacts = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            if let Some(expression) = filter_expression {
                request_builder = request_builder.filter_expression(expression);
                for (name, value) in values {
                    request_builder = request_builder.expression_attribute_values(*name, value.clone());
                }
            }

            // Apply ExclusiveStartKey if paginating from previous response
            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            for item in resp.items() {
                artifacts.push(self.decode(item)?);
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!(table_name = %self.table_name, "DynamoDB Scan: Continuing with LastEvaluatedKey...");
        }

        tracing::debug!(table_name = %self.table_name, count = artifacts.len(), "DynamoDB Scan: Complete");
        Ok(artifacts)
    }
}

#[async_trait]
impl ArtifactRepository for DynamoDbArtifactRepository {
    async fn list_all(&self, sort: Option<SortKey>) -> Result<Vec<Artifact>, RepoError> {
        let mut artifacts = self.scan(None, &[]).await?;
        if let Some(key) = sort {
            key.sort(&mut artifacts);
        }
        Ok(artifacts)
    }

    async fn list_where(&self, filter: &ArtifactFilter) -> Result<Vec<Artifact>, RepoError> {
        match filter {
            ArtifactFilter::LikedBy(email) => {
                self.scan(
                    Some("contains(likedBy, :email)"),
                    &[(":email", AttributeValue::S(email.clone()))],
                )
                .await
            }
            ArtifactFilter::OwnedBy(email) => {
                self.scan(
                    Some("ownerEmail = :email"),
                    &[(":email", AttributeValue::S(email.clone()))],
                )
                .await
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Artifact>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ID_ATTR, Self::key(id))
            .consistent_read(true)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get artifact (id: {})", self.table_name, id))
            .map_err(RepoError::BackendError)?;

        resp.item.as_ref().map(|item| self.decode(item)).transpose()
    }

    async fn sample_random(&self, n: usize) -> Result<Vec<Artifact>, RepoError> {
        let artifacts = self.scan(None, &[]).await?;
        let mut rng = rand::thread_rng();
        Ok(artifacts.choose_multiple(&mut rng, n).cloned().collect())
    }

    async fn insert(&self, artifact: &Artifact) -> Result<Uuid, RepoError> {
        let item = artifact_to_item(artifact)
            .map_err(|e| RepoError::DataCorruption(format!("Failed to encode artifact {}: {}", artifact.id, e)))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", ID_ATTR)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put artifact (id: {})", self.table_name, artifact.id))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(artifact_id = %artifact.id, table_name = %self.table_name, "DynamoDB: Artifact stored");
        Ok(artifact.id)
    }

    async fn update_fields(&self, id: Uuid, patch: &ArtifactPatch) -> Result<Option<Artifact>, RepoError> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut assignments = Vec::with_capacity(patch.fields.len());
        let mut request_builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ID_ATTR, Self::key(id))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", ID_ATTR)
            .return_values(ReturnValue::AllNew);

        for (i, (field, value)) in patch.fields.iter().enumerate() {
            assignments.push(format!("#f{i} = :v{i}"));
            request_builder = request_builder
                .expression_attribute_names(format!("#f{i}"), field)
                .expression_attribute_values(format!(":v{i}"), json_to_attr(value));
        }

        let result = request_builder
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await;

        match result {
            Ok(output) => match output.attributes() {
                Some(item) => Ok(Some(self.decode(item)?)),
                None => Err(RepoError::DataCorruption(format!(
                    "DynamoDB (table: {}): Update of artifact {} returned no attributes",
                    self.table_name, id
                ))),
            },
            Err(sdk_err) => match sdk_err.into_service_error() {
                UpdateItemError::ConditionalCheckFailedException(_) => Ok(None),
                other => Err(RepoError::BackendError(anyhow::Error::new(other).context(format!(
                    "DynamoDB (table: {}): Failed to update artifact (id: {})",
                    self.table_name, id
                )))),
            },
        }
    }

    /// Conditional `UpdateItem`: ADD/DELETE on the `likedBy` string set and the counter
    /// in the same write, guarded by the expected membership.
    async fn apply_like(&self, id: Uuid, identity: &str, action: LikeAction) -> Result<LikeWrite, RepoError> {
        let (update_expression, condition_expression, delta) = match action {
            LikeAction::Add => (
                "ADD #likedBy :who, #totalLiked :delta",
                "attribute_exists(#id) AND NOT contains(#likedBy, :email)",
                "1",
            ),
            LikeAction::Remove => (
                "DELETE #likedBy :who ADD #totalLiked :delta",
                "attribute_exists(#id) AND contains(#likedBy, :email)",
                "-1",
            ),
        };

        tracing::debug!(artifact_id = %id, ?action, table_name = %self.table_name, "DynamoDB: Applying like");

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ID_ATTR, Self::key(id))
            .update_expression(update_expression)
            .condition_expression(condition_expression)
            .expression_attribute_names("#id", ID_ATTR)
            .expression_attribute_names("#likedBy", LIKED_BY_ATTR)
            .expression_attribute_names("#totalLiked", TOTAL_LIKED_ATTR)
            .expression_attribute_values(":who", AttributeValue::Ss(vec![identity.to_string()]))
            .expression_attribute_values(":email", AttributeValue::S(identity.to_string()))
            .expression_attribute_values(":delta", AttributeValue::N(delta.to_string()))
            .return_values(ReturnValue::AllNew)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        match result {
            Ok(output) => match output.attributes() {
                Some(item) => Ok(LikeWrite::Applied(self.decode(item)?)),
                None => Err(RepoError::DataCorruption(format!(
                    "DynamoDB (table: {}): Like on artifact {} returned no attributes",
                    self.table_name, id
                ))),
            },
            Err(sdk_err) => refused_like(sdk_err.into_service_error()).map_err(|other| {
                RepoError::BackendError(anyhow::Error::new(other).context(format!(
                    "DynamoDB (table: {}): Failed to apply like to artifact (id: {})",
                    self.table_name, id
                )))
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
        tracing::debug!(artifact_id = %id, table_name = %self.table_name, "DynamoDB: Deleting item");

        let resp = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ID_ATTR, Self::key(id))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to delete artifact (id: {})", self.table_name, id))
            .map_err(RepoError::BackendError)?;

        Ok(u64::from(resp.attributes.is_some()))
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbDailyPickRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbDailyPickRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbDailyPickRepository");
        Self { client, table_name }
    }

    fn decode(&self, item: &Item) -> Result<DailyPick, RepoError> {
        item_to_pick(item).ok_or_else(|| {
            tracing::error!(table_name = %self.table_name, "DynamoDB: Failed to parse item into DailyPick");
            RepoError::DataCorruption(format!("Failed to parse daily pick from DynamoDB table '{}'", self.table_name))
        })
    }
}

#[async_trait]
impl DailyPickRepository for DynamoDbDailyPickRepository {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyPick>, RepoError> {
        let key = date.format("%Y-%m-%d").to_string();
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(DATE_ATTR, AttributeValue::S(key.clone()))
            .consistent_read(true)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get daily pick ({})", self.table_name, key))
            .map_err(RepoError::BackendError)?;

        resp.item.as_ref().map(|item| self.decode(item)).transpose()
    }

    /// `date` is the partition key, so a conditional put is the uniqueness constraint.
    async fn insert_if_absent(&self, pick: &DailyPick) -> Result<PickInsert, RepoError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(pick_to_item(pick)))
            .condition_expression("attribute_not_exists(#date)")
            .expression_attribute_names("#date", DATE_ATTR)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(date = %pick.date, artifact_id = %pick.artifact_id, "DynamoDB: Daily pick stored");
                Ok(PickInsert::Inserted)
            }
            Err(sdk_err) => {
                let winner = refused_pick(sdk_err.into_service_error()).map_err(|other| {
                    RepoError::BackendError(anyhow::Error::new(other).context(format!(
                        "DynamoDB (table: {}): Failed to put daily pick ({})",
                        self.table_name, pick.date
                    )))
                })?;
                tracing::info!(date = %pick.date, "DynamoDB: Daily pick already written by another request");
                match winner {
                    Some(item) => Ok(PickInsert::AlreadyExists(self.decode(&item)?)),
                    None => match self.get(pick.date).await? {
                        Some(existing) => Ok(PickInsert::AlreadyExists(existing)),
                        None => Err(RepoError::DataCorruption(format!(
                            "Daily pick for {} rejected as existing but not readable",
                            pick.date
                        ))),
                    },
                }
            }
        }
    }
}

/// Outcome of a like write whose condition failed. The old item comes back only if
/// the artifact exists; any other service error is handed back.
fn refused_like(err: UpdateItemError) -> Result<LikeWrite, UpdateItemError> {
    match err {
        UpdateItemError::ConditionalCheckFailedException(e) => match e.item() {
            Some(_) => Ok(LikeWrite::Stale),
            None => Ok(LikeWrite::Missing),
        },
        other => Err(other),
    }
}

/// The pick that won a refused conditional put, when the store returned it.
fn refused_pick(err: PutItemError) -> Result<Option<Item>, PutItemError> {
    match err {
        PutItemError::ConditionalCheckFailedException(e) => Ok(e.item),
        other => Err(other),
    }
}
