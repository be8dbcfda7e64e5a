use super::ApiClient;
use crate::error::AppError;
use crate::model::string_id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_id::deserialize")]
    pub id: String,
    pub username: String,
    pub email: String,
}

impl UserProfile {
    /// Numeric owner id used in `?user_id=` queries.
    pub fn owner_id(&self) -> Result<u64, AppError> {
        self.id
            .trim()
            .parse()
            .map_err(|_| AppError::invalid_data(format!("user id '{}' is not numeric", self.id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

pub fn register(client: &ApiClient, registration: &Registration) -> Result<String, AppError> {
    if registration.username.trim().is_empty() {
        return Err(AppError::invalid_input("username is required"));
    }
    if registration.email.trim().is_empty() {
        return Err(AppError::invalid_input("email is required"));
    }
    if registration.password.is_empty() {
        return Err(AppError::invalid_input("password is required"));
    }
    let body: MessageBody = client.post("/register", registration)?;
    Ok(body.message)
}

pub fn login(client: &ApiClient, credentials: &Credentials) -> Result<Session, AppError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::invalid_input("email and password are required"));
    }
    client.post("/login", credentials)
}

#[cfg(test)]
mod tests {
    use super::{Credentials, Registration, login, register};
    use crate::remote::ApiClient;
    use crate::remote::testing::ScriptedTransport;

    fn client(transport: &ScriptedTransport) -> ApiClient {
        ApiClient::with_transport("http://api.test", Box::new(transport.clone()))
    }

    #[test]
    fn login_returns_session() {
        let transport = ScriptedTransport::new().respond_json(
            200,
            serde_json::json!({
                "message": "Login successful",
                "token": "jwt-token",
                "user": {"id": 4, "username": "ada", "email": "ada@example.com"}
            }),
        );
        let credentials = Credentials {
            email: "ada@example.com".into(),
            password: "secret1".into(),
        };

        let session = login(&client(&transport), &credentials).unwrap();

        assert_eq!(transport.requests()[0].url, "http://api.test/login");
        assert_eq!(transport.body_json(0)["email"], "ada@example.com");
        assert_eq!(session.token, "jwt-token");
        assert_eq!(session.user.owner_id().unwrap(), 4);
    }

    #[test]
    fn login_failure_surfaces_server_text() {
        let transport = ScriptedTransport::new()
            .respond_json(401, serde_json::json!({"error": "Invalid email or password"}));
        let credentials = Credentials {
            email: "ada@example.com".into(),
            password: "wrong".into(),
        };

        let err = login(&client(&transport), &credentials).unwrap_err();
        assert_eq!(err.message(), "Invalid email or password");
    }

    #[test]
    fn register_returns_message() {
        let transport = ScriptedTransport::new()
            .respond_json(201, serde_json::json!({"message": "User registered successfully"}));
        let registration = Registration {
            username: "ada".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
        };

        let message = register(&client(&transport), &registration).unwrap();
        assert_eq!(message, "User registered successfully");
    }

    #[test]
    fn register_requires_fields() {
        let transport = ScriptedTransport::new();
        let registration = Registration {
            username: " ".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
        };

        assert!(register(&client(&transport), &registration).is_err());
        assert!(transport.requests().is_empty());
    }
}
