// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    // Payment gateway configuration
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    // Money-flow parameters
    pub platform_fee_percent: f64,
    pub tip_commission_percent: f64,
    pub payout_hold_days: i64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");
        let redis_url = std::env::var("REDIS_URL").ok();

        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .unwrap_or_else(|_| "sk_test_secret_key".to_string());
        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "whsec_test_secret".to_string());

        let platform_fee_percent = std::env::var("PLATFORM_FEE_PERCENT")
            .unwrap_or_else(|_| "6.8".to_string())
            .parse::<f64>()
            .expect("PLATFORM_FEE_PERCENT must be a number");
        let tip_commission_percent = std::env::var("TIP_COMMISSION_PERCENT")
            .unwrap_or_else(|_| "20.0".to_string())
            .parse::<f64>()
            .expect("TIP_COMMISSION_PERCENT must be a number");
        let payout_hold_days = std::env::var("PAYOUT_HOLD_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()
            .expect("PAYOUT_HOLD_DAYS must be a number");

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .expect("PORT must be a number");

        Config {
            database_url,
            redis_url,
            app_url,
            jwt_secret,
            port,
            stripe_secret_key,
            stripe_webhook_secret,
            platform_fee_percent,
            tip_commission_percent,
            payout_hold_days,
        }
    }
}
