use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

fn set_env_vars() {
    unsafe {
        env::set_var("AUTH_JWT_SECRET", "supersecretjwtsecretforunittesting123");
    }
}

fn token_for(claims: &SessionClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_session_jwt_success() {
    set_env_vars();
    let my_claims = SessionClaims {
        sub: "user_2unmpymSS0WRkqHBOxzDvEwZ28x".to_string(),
        email: Some("test@example.com".to_string()),
        first_name: Some("Test".to_string()),
        last_name: Some("Student".to_string()),
        exp: 9999999999, // far future
    };

    let token = token_for(&my_claims, "supersecretjwtsecretforunittesting123");

    let claims = validate_session_jwt(&token).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_session_jwt_expired() {
    set_env_vars();
    let my_claims = SessionClaims {
        sub: "user_2unmpymSS0WRkqHBOxzDvEwZ28x".to_string(),
        email: Some("test@example.com".to_string()),
        first_name: None,
        last_name: None,
        exp: 1, // past
    };

    let token = token_for(&my_claims, "supersecretjwtsecretforunittesting123");

    let result = validate_session_jwt(&token);
    assert!(result.is_err());
}

#[test]
fn test_validate_session_jwt_invalid_signature() {
    set_env_vars();
    let my_claims = SessionClaims {
        sub: "user_2unmpymSS0WRkqHBOxzDvEwZ28x".to_string(),
        email: Some("test@example.com".to_string()),
        first_name: None,
        last_name: None,
        exp: 9999999999,
    };

    let token = token_for(&my_claims, "wrongsecret");

    let result = validate_session_jwt(&token);
    assert!(result.is_err());
}
