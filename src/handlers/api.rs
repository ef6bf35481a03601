use axum::Json;
use serde_json::{Value, json};

/// Liveness check.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_body() {
        let Json(body) = health_check().await;
        assert_eq!(body, json!({ "status": "OK" }));
    }
}
