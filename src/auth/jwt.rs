use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{model::user::User, models::Claims};

pub fn generate_token(user: &User, secret: &str, ttl: u64) -> Result<String, Error> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        user_id: user.id,
        sub: user.email.clone(),
        role: user.role,
        exp: now + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
