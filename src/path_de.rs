use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize an already-parsed node with JSON-path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Bounds {
        min: u32,
        max: Option<u32>,
    }

    #[test]
    fn errors_name_the_offending_path() {
        let err = from_value_with_path::<Vec<Bounds>>(&json!([{"min": 1}, {"min": "x"}])).unwrap_err();
        assert!(err.starts_with("at JSON path [1].min"), "{err}");
    }

    #[test]
    fn parse_errors_keep_context() {
        let err = from_str_with_path::<Bounds>(r#"{"min": -1}"#).unwrap_err();
        assert!(err.contains("min"), "{err}");
    }
}
