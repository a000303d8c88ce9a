use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Training hyper-parameters as recorded in a run entry. Every field is
/// optional because run histories come from several script versions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(rename = "C", skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
    /// Either a number or a keyword such as `scale` / `auto`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ngram_range: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_features: Option<f64>,
}

impl RunParams {
    /// Lenient extraction from whatever a run record holds.
    ///
    /// Accepts a JSON string (parsed first), an object, or an object
    /// wrapping `params`. Numeric strings are coerced; `c` and
    /// `maxFeatures` are accepted as aliases. Returns `None` when no field
    /// is present.
    pub fn normalize(raw: &JsonValue) -> Option<Self> {
        let parsed;
        let mut obj = raw;
        if let JsonValue::String(s) = raw {
            parsed = serde_json::from_str::<JsonValue>(s).ok()?;
            obj = &parsed;
        }
        if let Some(inner) = obj.get("params").filter(|p| !p.is_null()) {
            obj = inner;
        }
        let map = obj.as_object()?;
        let field = move |keys: &[&str]| keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null());

        let params = RunParams {
            kernel: field(&["kernel"])
                .or_else(|| map.get("model_params").and_then(|m| m.get("kernel")))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            c: field(&["C", "c"]).and_then(to_num),
            gamma: field(&["gamma"]).cloned(),
            degree: field(&["degree"]).and_then(to_num),
            test_size: field(&["test_size"]).and_then(to_num),
            ngram_range: field(&["ngram_range"]).and_then(to_range),
            max_features: field(&["max_features", "maxFeatures"]).and_then(to_num),
        };
        (params != RunParams::default()).then_some(params)
    }
}

fn to_num(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_range(v: &JsonValue) -> Option<(f64, f64)> {
    let arr = v.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some((to_num(&arr[0])?, to_num(&arr[1])?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_params_and_coerces() {
        let raw = json!({
            "id": "1700000000",
            "params": { "kernel": "linear", "c": "1.5", "ngram_range": [1, 2], "maxFeatures": 5000 }
        });
        let p = RunParams::normalize(&raw).unwrap();
        assert_eq!(p.kernel.as_deref(), Some("linear"));
        assert_eq!(p.c, Some(1.5));
        assert_eq!(p.ngram_range, Some((1.0, 2.0)));
        assert_eq!(p.max_features, Some(5000.0));
        assert_eq!(p.gamma, None);
    }

    #[test]
    fn accepts_json_strings() {
        let raw = JsonValue::String(r#"{"kernel":"rbf","gamma":"scale","C":10}"#.into());
        let p = RunParams::normalize(&raw).unwrap();
        assert_eq!(p.gamma, Some(json!("scale")));
        assert_eq!(p.c, Some(10.0));
    }

    #[test]
    fn nothing_recognised_is_none() {
        assert_eq!(RunParams::normalize(&json!({"foo": 1})), None);
        assert_eq!(RunParams::normalize(&json!("not json")), None);
        assert_eq!(RunParams::normalize(&json!(null)), None);
    }

    #[test]
    fn serializes_with_capital_c() {
        let p = RunParams {
            c: Some(1.0),
            ..RunParams::default()
        };
        assert_eq!(serde_json::to_value(&p).unwrap(), json!({"C": 1.0}));
    }
}
