#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub sanity: Sanity,
    pub calendar: Calendar,
    pub intasend: IntaSend,
    pub stripe: Stripe,
    pub email: Email,
    pub checkout: Checkout,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
    /// Ceiling for every outbound call made inside a request cycle.
    pub outbound_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Sanity {
    pub project_id: String,
    pub dataset: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Calendar {
    pub calendar_id: String,
    pub service_account_email: String,
    pub private_key: String,
}

#[derive(Debug, Clone)]
pub struct IntaSend {
    pub api_base: String,
    pub publishable_key: String,
    pub secret_key: String,
    pub webhook_challenge: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Email {
    pub api_key: String,
    pub from_name: String,
    pub from_email: String,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    /// Public site base used for provider redirect/success URLs.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthSecret {
    pub jwt_secret: String,
}
