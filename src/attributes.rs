//! Conversions between artifact JSON and DynamoDB attribute maps.
//!
//! `likedBy` is stored as a string set so membership can be tested and changed
//! inside a single `UpdateItem`. DynamoDB does not allow empty sets, so an empty
//! `likedBy` is simply omitted and read back as empty.

use crate::models::{Artifact, DailyPick};
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

pub const ID_ATTR: &str = "_id";
pub const LIKED_BY_ATTR: &str = "likedBy";
pub const TOTAL_LIKED_ATTR: &str = "totalLiked";
pub const DATE_ATTR: &str = "date";
pub const ARTIFACT_ID_ATTR: &str = "artifactId";

pub type Item = HashMap<String, AttributeValue>;

pub fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter().map(|(k, v)| (k.clone(), json_to_attr(v))).collect(),
        ),
    }
}

/// Returns `None` for attribute types that have no JSON counterpart (binary).
pub fn attr_to_json(attr: &AttributeValue) -> Option<Value> {
    let value = match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(set) => Value::Array(
            set.iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Option<Vec<_>>>()?,
        ),
        AttributeValue::L(items) => Value::Array(items.iter().map(attr_to_json).collect::<Option<Vec<_>>>()?),
        AttributeValue::M(map) => Value::Object(item_to_json(map)?),
        _ => return None,
    };
    Some(value)
}

fn parse_number(n: &str) -> Option<Number> {
    if let Ok(i) = n.parse::<i64>() {
        return Some(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Some(u.into());
    }
    n.parse::<f64>().ok().and_then(Number::from_f64)
}

fn item_to_json(item: &Item) -> Option<Map<String, Value>> {
    item.iter()
        .map(|(k, v)| attr_to_json(v).map(|json| (k.clone(), json)))
        .collect()
}

pub fn artifact_to_item(artifact: &Artifact) -> Result<Item, serde_json::Error> {
    let Value::Object(fields) = serde_json::to_value(artifact)? else {
        return Err(serde::ser::Error::custom("artifact did not serialize to a JSON object"));
    };
    let mut item: Item = fields
        .iter()
        .filter(|(k, _)| k.as_str() != LIKED_BY_ATTR)
        .map(|(k, v)| (k.clone(), json_to_attr(v)))
        .collect();
    if !artifact.liked_by.is_empty() {
        item.insert(
            LIKED_BY_ATTR.to_string(),
            AttributeValue::Ss(artifact.liked_by.iter().cloned().collect()),
        );
    }
    Ok(item)
}

/// Returns `None` when the item does not describe a valid artifact.
pub fn item_to_artifact(item: &Item) -> Option<Artifact> {
    let fields = item_to_json(item)?;
    serde_json::from_value(Value::Object(fields)).ok()
}

pub fn pick_to_item(pick: &DailyPick) -> Item {
    HashMap::from([
        (DATE_ATTR.to_string(), AttributeValue::S(pick.date.format("%Y-%m-%d").to_string())),
        (ARTIFACT_ID_ATTR.to_string(), AttributeValue::S(pick.artifact_id.to_string())),
    ])
}

pub fn item_to_pick(item: &Item) -> Option<DailyPick> {
    let date = item.get(DATE_ATTR)?.as_s().ok()?.parse().ok()?;
    let artifact_id = item.get(ARTIFACT_ID_ATTR)?.as_s().ok()?.parse().ok()?;
    Some(DailyPick { date, artifact_id })
}
