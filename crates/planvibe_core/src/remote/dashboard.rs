use super::ApiClient;
use crate::error::AppError;
use crate::summary::DashboardSummary;

/// `GET /dashboard`; needs a client built with a session token.
pub fn fetch(client: &ApiClient) -> Result<DashboardSummary, AppError> {
    client.get_authenticated("/dashboard")
}

#[cfg(test)]
mod tests {
    use super::fetch;
    use crate::remote::ApiClient;
    use crate::remote::testing::ScriptedTransport;

    #[test]
    fn fetch_sends_bearer_token() {
        let transport = ScriptedTransport::new().respond_json(
            200,
            serde_json::json!({"completedTasks": 3, "upcomingTasks": [], "goalsProgress": 50, "goals": []}),
        );
        let client = ApiClient::with_transport("http://api.test", Box::new(transport.clone()))
            .with_token("jwt");

        let summary = fetch(&client).unwrap();

        assert_eq!(summary.completed_tasks, 3);
        assert_eq!(
            transport.requests()[0].header("Authorization"),
            Some("Bearer jwt")
        );
    }
}
