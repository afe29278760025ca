use std::env;

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use sok_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_SOK_HOST: &str = "127.0.0.1";
const DEFAULT_SOK_PORT: u16 = 8460;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared key fencing the admin-only endpoints (dispute review and
    /// resolution). Role adjudication proper lives in the upstream gateway;
    /// this key just keeps the override paths off the open internet.
    pub admin_api_key: Secret<String>,
    /// HMAC key for verifying payment collaborator webhooks.
    pub payment_webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**: only for
    /// local development.
    pub webhook_signature_checks: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SOK_HOST.to_string(),
            port: DEFAULT_SOK_PORT,
            database_url: String::default(),
            admin_api_key: Secret::default(),
            payment_webhook_secret: Secret::default(),
            webhook_signature_checks: true,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SOK_HOST").ok().unwrap_or_else(|| DEFAULT_SOK_HOST.into());
        let port = env::var("SOK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SOK_PORT. {e} Using the default, {DEFAULT_SOK_PORT}, instead."
                    );
                    DEFAULT_SOK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SOK_PORT);
        let database_url = env::var("SOK_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SOK_DATABASE_URL is not set. Please set it to the URL for the Sokoni database.");
            String::default()
        });
        let admin_api_key = env::var("SOK_ADMIN_API_KEY").map(Secret::new).unwrap_or_else(|_| {
            let key = random_key();
            warn!(
                "🚨️🚨️🚨️ SOK_ADMIN_API_KEY is not set. I'm using a random value for this session: {key}. Admin \
                 endpoints will be unusable by anyone who does not have it. Do NOT operate a production instance \
                 like this. 🚨️🚨️🚨️"
            );
            Secret::new(key)
        });
        let payment_webhook_secret = env::var("SOK_PAYMENT_WEBHOOK_SECRET").map(Secret::new).unwrap_or_else(|_| {
            error!(
                "🪛️ SOK_PAYMENT_WEBHOOK_SECRET is not set. Payment webhook signatures cannot be verified and all \
                 webhook calls will be rejected."
            );
            Secret::default()
        });
        let webhook_signature_checks = parse_boolean_flag(env::var("SOK_PAYMENT_HMAC_CHECKS").ok(), true);
        if !webhook_signature_checks {
            warn!("🚨️ Payment webhook signature checks are DISABLED. Never run production like this.");
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("SOK_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SOK_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            admin_api_key,
            payment_webhook_secret,
            webhook_signature_checks,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

fn random_key() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the configuration that request handlers need. Kept small and
/// free of secrets so it can be cloned into the app data freely.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
