//! JSON body assembly for the POST operations.

use serde_json::{json, Map, Value};

use crate::error::{KindwiseError, Result};
use crate::options::{AskOptions, IdentifyOptions};

/// Build the shared identification payload.
///
/// `images` and `similar_images` are always present, coordinates only as a
/// complete pair, and `datetime` normalized to ISO-8601. Caller extras are
/// merged last and win over the shared keys. A bare-string
/// `suggestion_filter` extra is wrapped into `{"classification": ...}`.
pub(crate) fn build_payload(images: Vec<String>, opts: &IdentifyOptions) -> Result<Map<String, Value>> {
    let mut payload = Map::new();
    payload.insert("images".to_string(), json!(images));
    payload.insert("similar_images".to_string(), json!(opts.similar_images));
    if let Some((latitude, longitude)) = opts.latitude_longitude {
        payload.insert("latitude".to_string(), json!(latitude));
        payload.insert("longitude".to_string(), json!(longitude));
    }
    if let Some(custom_id) = opts.custom_id {
        payload.insert("custom_id".to_string(), json!(custom_id));
    }
    if let Some(date_time) = &opts.date_time {
        payload.insert("datetime".to_string(), json!(date_time.to_iso8601()?));
    }
    if let Some(extra) = &opts.extra_post_params {
        merge_extra_post(&mut payload, extra);
    }
    Ok(payload)
}

fn merge_extra_post(payload: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        if key == "suggestion_filter" {
            if let Value::String(classification) = value {
                payload.insert(key.clone(), json!({ "classification": classification }));
                continue;
            }
        }
        payload.insert(key.clone(), value.clone());
    }
}

/// Merge generic and disease detail lists into one `details` value.
/// Comma-joined entries are split, the lists concatenated, and duplicates
/// dropped keeping first-seen order.
pub(crate) fn merge_details(
    details: Option<&[String]>,
    disease_details: Option<&[String]>,
) -> Option<Vec<String>> {
    let mut merged: Vec<String> = Vec::new();
    for item in details.into_iter().flatten().chain(disease_details.into_iter().flatten()) {
        for part in item.split(',') {
            if !merged.iter().any(|existing| existing == part) {
                merged.push(part.to_string());
            }
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

/// Body for the feedback endpoint: at least one of the fields must be set,
/// checked here before any network work.
pub(crate) fn feedback_body(comment: Option<&str>, rating: Option<i64>) -> Result<Value> {
    if comment.is_none() && rating.is_none() {
        return Err(KindwiseError::Validation(
            "either comment or rating must be provided".to_string(),
        ));
    }
    let mut body = Map::new();
    if let Some(comment) = comment {
        body.insert("comment".to_string(), json!(comment));
    }
    if let Some(rating) = rating {
        body.insert("rating".to_string(), json!(rating));
    }
    Ok(Value::Object(body))
}

/// Body for the conversation question endpoint; unset options stay absent.
pub(crate) fn ask_body(question: &str, opts: &AskOptions) -> Value {
    let mut body = Map::new();
    body.insert("question".to_string(), json!(question));
    if let Some(model) = &opts.model {
        body.insert("model".to_string(), json!(model));
    }
    if let Some(app_name) = &opts.app_name {
        body.insert("app_name".to_string(), json!(app_name));
    }
    if let Some(prompt) = &opts.prompt {
        body.insert("prompt".to_string(), json!(prompt));
    }
    if let Some(temperature) = opts.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> Vec<String> {
        vec!["base64data".to_string()]
    }

    #[test]
    fn test_minimal_payload_has_images_and_similar_images() {
        let payload = build_payload(images(), &IdentifyOptions::default()).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["images"], json!(["base64data"]));
        assert_eq!(payload["similar_images"], json!(true));
    }

    #[test]
    fn test_coordinates_are_sent_as_a_pair() {
        let opts = IdentifyOptions {
            latitude_longitude: Some((49.2034, 16.5732)),
            ..IdentifyOptions::default()
        };
        let payload = build_payload(images(), &opts).unwrap();
        assert_eq!(payload["latitude"], json!(49.2034));
        assert_eq!(payload["longitude"], json!(16.5732));
    }

    #[test]
    fn test_custom_id_and_datetime() {
        let opts = IdentifyOptions {
            custom_id: Some(123),
            date_time: Some("2023-11-28T08:38:48.538187".into()),
            ..IdentifyOptions::default()
        };
        let payload = build_payload(images(), &opts).unwrap();
        assert_eq!(payload["custom_id"], json!(123));
        assert_eq!(payload["datetime"], json!("2023-11-28T08:38:48.538187"));
    }

    #[test]
    fn test_extra_post_params_win_over_shared_keys() {
        let mut extra = Map::new();
        extra.insert("similar_images".to_string(), json!(false));
        extra.insert("test".to_string(), json!("test"));
        let opts = IdentifyOptions {
            extra_post_params: Some(extra),
            ..IdentifyOptions::default()
        };
        let payload = build_payload(images(), &opts).unwrap();
        assert_eq!(payload["similar_images"], json!(false));
        assert_eq!(payload["test"], json!("test"));
    }

    #[test]
    fn test_bare_string_suggestion_filter_is_wrapped() {
        let mut extra = Map::new();
        extra.insert("suggestion_filter".to_string(), json!("Aloe"));
        let opts = IdentifyOptions {
            extra_post_params: Some(extra),
            ..IdentifyOptions::default()
        };
        let payload = build_payload(images(), &opts).unwrap();
        assert_eq!(payload["suggestion_filter"], json!({"classification": "Aloe"}));
    }

    #[test]
    fn test_structured_suggestion_filter_passes_through() {
        let mut extra = Map::new();
        extra.insert("suggestion_filter".to_string(), json!({"classification": "Aloe"}));
        let opts = IdentifyOptions {
            extra_post_params: Some(extra),
            ..IdentifyOptions::default()
        };
        let payload = build_payload(images(), &opts).unwrap();
        assert_eq!(payload["suggestion_filter"], json!({"classification": "Aloe"}));
    }

    #[test]
    fn test_merge_details_splits_and_dedupes() {
        let details = vec!["common_names,description".to_string()];
        let disease_details = vec!["treatment".to_string(), "description".to_string()];
        let merged = merge_details(Some(&details), Some(&disease_details)).unwrap();
        assert_eq!(merged, vec!["common_names", "description", "treatment"]);
    }

    #[test]
    fn test_merge_details_with_nothing_is_none() {
        assert_eq!(merge_details(None, None), None);
    }

    #[test]
    fn test_feedback_body_requires_a_field() {
        let error = feedback_body(None, None).unwrap_err();
        assert!(matches!(error, KindwiseError::Validation(_)));
    }

    #[test]
    fn test_feedback_body_with_rating_only() {
        let body = feedback_body(None, Some(5)).unwrap();
        assert_eq!(body, json!({"rating": 5}));
    }

    #[test]
    fn test_ask_body_keeps_unset_options_absent() {
        let body = ask_body("Is it edible?", &AskOptions::default());
        assert_eq!(body, json!({"question": "Is it edible?"}));
    }

    #[test]
    fn test_ask_body_with_model_parameters() {
        let opts = AskOptions {
            model: Some("gpt-3.5-turbo".to_string()),
            temperature: Some(0.5),
            ..AskOptions::default()
        };
        let body = ask_body("Is it edible?", &opts);
        assert_eq!(
            body,
            json!({"question": "Is it edible?", "model": "gpt-3.5-turbo", "temperature": 0.5})
        );
    }
}
