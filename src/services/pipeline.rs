use crate::errors::ToolError;
use std::future::Future;

/// Runs one named step of a composite tool, tagging any failure with the
/// step name so callers can tell which stage aborted the pipeline.
pub async fn step<T, F>(name: &str, fut: F) -> Result<T, ToolError>
where
    F: Future<Output = Result<T, ToolError>>,
{
    fut.await.map_err(|err| err.in_step(name))
}

/// Deserializes a step's JSON reply into a typed intermediate.
pub fn decode<T: serde::de::DeserializeOwned>(
    name: &str,
    value: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(value)
        .map_err(|err| ToolError::parse(format!("unexpected response shape: {}", err)).in_step(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_step_is_named() {
        let result: Result<(), ToolError> =
            step("fetch_lead", async { Err(ToolError::backend(404, "gone")) }).await;
        let err = result.expect_err("must fail");
        assert_eq!(err.step.as_deref(), Some("fetch_lead"));
        assert_eq!(err.to_string(), "API Error: 404 - gone (step: fetch_lead)");
    }

    #[test]
    fn decode_reports_shape_mismatch_in_step() {
        #[derive(serde::Deserialize, Debug)]
        struct Created {
            #[allow(dead_code)]
            id: u64,
        }
        let err = decode::<Created>("create_contact", serde_json::json!({"name": "x"}))
            .expect_err("must fail");
        assert_eq!(err.step.as_deref(), Some("create_contact"));
    }
}
