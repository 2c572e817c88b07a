use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database, run_migrations},
    middlewares::authentication,
    modules::{
        conversation::{
            cache::CachedParticipantRepository,
            handle::ConversationSvc,
            repository_pg::{ConversationPgRepository, ParticipantPgRepository},
        },
        fanout::FanoutQueue,
        message::{handle::MessageSvc, repository_pg::MessagePgRepository},
        notification::{
            push::ExpoPushGateway,
            repository_pg::{DevicePgRepository, NotificationPgRepository},
            service::NotificationService,
        },
        receipt::{handle::ReceiptSvc, repository_pg::ReceiptPgRepository},
        websocket::{handler::websocket_handler, server::WebSocketServer},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("A tracing subscriber was already installed");
    }

    let db_pool = connect_database(&ENV.database_url, ENV.db_max_connections)
        .await
        .map_err(|_| std::io::Error::other("Database connection error"))?;

    run_migrations(&db_pool).await.map_err(|_| std::io::Error::other("Database migration error"))?;

    let redis_pool = RedisCache::new(&ENV.redis_url)
        .map_err(|_| std::io::Error::other("Redis connection error"))?;
    let redis_pool = Arc::new(redis_pool);

    let conversation_repo = Arc::new(ConversationPgRepository::new(db_pool.clone()));
    let participant_repo = Arc::new(CachedParticipantRepository::new(
        ParticipantPgRepository::new(db_pool.clone()),
        redis_pool.clone(),
        ENV.participant_cache_ttl,
    ));
    let message_repo = Arc::new(MessagePgRepository::new(db_pool.clone()));
    let receipt_repo = Arc::new(ReceiptPgRepository::new(db_pool.clone()));

    let (fanout, workers) = FanoutQueue::new(ENV.fanout_queue_capacity);

    let ws_server = WebSocketServer::with_mailbox_capacity(ENV.fanout_queue_capacity).start();

    let notification_service = NotificationService::with_dependencies(
        Arc::new(NotificationPgRepository::new(db_pool.clone())),
        Arc::new(ExpoPushGateway::new(
            ENV.push_api_url.as_str(),
            Arc::new(DevicePgRepository::new(db_pool.clone())),
        )),
    );

    workers.spawn(Arc::new(ws_server.clone()), Arc::new(notification_service));

    let conversation_service: ConversationSvc = ConversationSvc::with_dependencies(
        conversation_repo.clone(),
        participant_repo.clone(),
        message_repo.clone(),
    );
    let message_service: MessageSvc = MessageSvc::with_dependencies(
        message_repo.clone(),
        conversation_repo.clone(),
        participant_repo.clone(),
        fanout.clone(),
    );
    let receipt_service: ReceiptSvc = ReceiptSvc::with_dependencies(
        receipt_repo,
        message_repo,
        conversation_repo,
        participant_repo,
        fanout,
    );

    tracing::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(receipt_service.clone()))
            .app_data(web::Data::new(ws_server.clone()))
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
            .service(
                web::scope("/api")
                    .wrap(from_fn(authentication))
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(ENV.workers)
    .run()
    .await
}
