use crate::client::{ApiClient, ClientError, record};
use crate::model::user::{ProfessorEntry, PublicUser};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest};

/// Current session: who is signed in and with which token.
pub struct AuthStore {
    client: ApiClient,
    pub user: Option<PublicUser>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        let token = client.token();
        Self {
            client,
            user: None,
            token,
            error: None,
        }
    }

    fn sign_in(&mut self, auth: AuthResponse) -> PublicUser {
        self.client.set_token(Some(auth.token.clone()));
        self.token = Some(auth.token);
        self.user = Some(auth.user.clone());
        auth.user
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let result = self.client.post::<_, AuthResponse>("/users/login", &body).await;
        let auth = record(&mut self.error, result)?;
        Ok(self.sign_in(auth))
    }

    pub async fn register(&mut self, body: &RegisterRequest) -> Result<PublicUser, ClientError> {
        let result = self.client.post::<_, AuthResponse>("/users/register", body).await;
        let auth = record(&mut self.error, result)?;
        Ok(self.sign_in(auth))
    }

    pub async fn update_user(&mut self, body: &UpdateUserRequest) -> Result<PublicUser, ClientError> {
        let result = self.client.put::<_, PublicUser>("/users/update", body).await;
        let user = record(&mut self.error, result)?;
        self.user = Some(user.clone());
        Ok(user)
    }

    pub async fn professors(&mut self) -> Result<Vec<ProfessorEntry>, ClientError> {
        let result = self.client.get("/users/professors").await;
        record(&mut self.error, result)
    }

    pub fn logout(&mut self) {
        self.client.set_token(None);
        self.token = None;
        self.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
