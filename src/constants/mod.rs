pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;
pub const PUSH_PREVIEW_LENGTH: usize = 50;

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub workers: usize,
    pub db_max_connections: u32,
    pub fanout_queue_capacity: usize,
    pub participant_cache_ttl: usize,
    pub push_api_url: String,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");
        let workers = std::env::var("WORKERS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<usize>()
            .expect("WORKERS must be a valid usize integer");

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .expect("DB_MAX_CONNECTIONS must be a valid u32 integer");

        let fanout_queue_capacity = std::env::var("FANOUT_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "1024".to_string())
            .parse::<usize>()
            .expect("FANOUT_QUEUE_CAPACITY must be a valid usize integer");
        let participant_cache_ttl = std::env::var("PARTICIPANT_CACHE_TTL")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<usize>()
            .expect("PARTICIPANT_CACHE_TTL must be a valid usize integer");
        let push_api_url = std::env::var("PUSH_API_URL")
            .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".to_string());

        Env {
            jwt_secret,
            database_url,
            redis_url,
            frontend_url,
            ip,
            port,
            workers,
            db_max_connections,
            fanout_queue_capacity,
            participant_cache_ttl,
            push_api_url,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
