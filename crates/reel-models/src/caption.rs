//! Word-level caption models.

use serde::{Deserialize, Serialize};

/// A single caption word with timing information, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Caption {
    /// Parse a caption list from a `captions` column value.
    ///
    /// The API service stores captions as a JSON-encoded string inside a jsonb
    /// column, so depending on the driver the value arrives either as a JSON
    /// string containing the array, or as the array itself. Both forms are
    /// accepted.
    pub fn parse_list(value: &serde_json::Value) -> Result<Vec<Caption>, serde_json::Error> {
        match value {
            serde_json::Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        }
    }
}

/// Total spoken duration covered by a caption list: the end time of the last
/// caption, or `None` when the list is empty.
pub fn captions_duration(captions: &[Caption]) -> Option<f64> {
    captions.last().map(|c| c.end_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list_from_array() {
        let value = json!([
            {"word": "hello", "start_time": 0.0, "end_time": 0.4},
            {"word": "world", "start_time": 0.4, "end_time": 0.9},
        ]);

        let captions = Caption::parse_list(&value).unwrap();
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].word, "hello");
        assert!((captions[1].end_time - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_list_from_double_encoded_string() {
        let inner = r#"[{"word":"hi","start_time":0.0,"end_time":0.5}]"#;
        let value = serde_json::Value::String(inner.to_string());

        let captions = Caption::parse_list(&value).unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].word, "hi");
    }

    #[test]
    fn test_parse_list_rejects_malformed() {
        let value = serde_json::Value::String("not json".to_string());
        assert!(Caption::parse_list(&value).is_err());

        let value = json!({"word": "lonely"});
        assert!(Caption::parse_list(&value).is_err());
    }

    #[test]
    fn test_captions_duration() {
        assert_eq!(captions_duration(&[]), None);

        let captions = vec![
            Caption {
                word: "one".to_string(),
                start_time: 0.0,
                end_time: 1.2,
            },
            Caption {
                word: "two".to_string(),
                start_time: 1.2,
                end_time: 2.8,
            },
        ];
        assert_eq!(captions_duration(&captions), Some(2.8));
    }
}
