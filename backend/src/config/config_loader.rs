use anyhow::{Ok, Result};

use super::config_model::{
    AuthSecret, BackendServer, Calendar, Checkout, DotEnvyConfig, Email, IntaSend, Sanity, Stripe,
};

/// Reads the whole configuration up front. Anything missing is a startup
/// failure: provider clients are constructed from this once and passed
/// around, so a bad credential can never surface later as a null client.
pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
        outbound_timeout: std::env::var("OUTBOUND_TIMEOUT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
    };

    let sanity = Sanity {
        project_id: std::env::var("SANITY_PROJECT_ID").expect("SANITY_PROJECT_ID is invalid"),
        dataset: std::env::var("SANITY_DATASET").unwrap_or_else(|_| "production".to_string()),
        token: std::env::var("SANITY_API_TOKEN").expect("SANITY_API_TOKEN is invalid"),
    };

    let calendar = Calendar {
        calendar_id: std::env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
        service_account_email: std::env::var("GOOGLE_SERVICE_ACCOUNT_EMAIL")
            .expect("GOOGLE_SERVICE_ACCOUNT_EMAIL is invalid"),
        // Deployment tooling stores the PEM with escaped newlines.
        private_key: std::env::var("GOOGLE_PRIVATE_KEY")
            .expect("GOOGLE_PRIVATE_KEY is invalid")
            .replace("\\n", "\n"),
    };

    let intasend = IntaSend {
        api_base: std::env::var("INTASEND_API_BASE")
            .unwrap_or_else(|_| "https://payment.intasend.com".to_string()),
        publishable_key: std::env::var("INTASEND_PUBLISHABLE_KEY")
            .expect("INTASEND_PUBLISHABLE_KEY is invalid"),
        secret_key: std::env::var("INTASEND_SECRET_KEY").expect("INTASEND_SECRET_KEY is invalid"),
        webhook_challenge: std::env::var("INTASEND_WEBHOOK_CHALLENGE")
            .expect("INTASEND_WEBHOOK_CHALLENGE is invalid"),
    };

    let stripe = Stripe {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
    };

    let email = Email {
        api_key: std::env::var("EMAIL_API_KEY").expect("EMAIL_API_KEY is invalid"),
        from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "MasterClasses".to_string()),
        from_email: std::env::var("EMAIL_FROM_ADDRESS").expect("EMAIL_FROM_ADDRESS is invalid"),
    };

    let checkout = Checkout {
        base_url: std::env::var("CHECKOUT_BASE_URL").expect("CHECKOUT_BASE_URL is invalid"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        sanity,
        calendar,
        intasend,
        stripe,
        email,
        checkout,
    })
}

pub fn get_auth_secret() -> Result<AuthSecret> {
    dotenvy::dotenv().ok();

    Ok(AuthSecret {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    })
}
