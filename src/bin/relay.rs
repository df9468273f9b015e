use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use warp::Filter;

use chat_mirror::config::{FileConfigStore, Settings};
use chat_mirror::constants::{
    DEFAULT_ADMIN_HOST, DEFAULT_ADMIN_PORT, DEFAULT_MAX_QUEUED_TASKS,
};
use chat_mirror::core::recent_ids::RecentIdCache;
use chat_mirror::core::worker_pool::create_worker_pool;
use chat_mirror::core::{CommandDispatcher, CommandEvent, CommandPermission, MessageRouter, RelayEngine};
use chat_mirror::platform::traits::Transport;
use chat_mirror::platform::{BotContext, RestChatClient, SiteTransport, StaticPronouns};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load and validate config
    let config_path = Settings::resolve_path();
    let settings = match Settings::read_from(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Exiting due to unreadable configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = settings.validate() {
        error!("Exiting due to invalid configuration: {}", e);
        std::process::exit(1);
    }
    let api_base_url = match settings.api_base_url.clone() {
        Some(url) => url,
        None => {
            error!("Exiting due to invalid configuration: api_base_url must be set");
            std::process::exit(1);
        }
    };

    info!("Starting bot for channel {}", settings.channel_name);

    // Wire collaborators into a single context
    let client = Arc::new(RestChatClient::new(
        api_base_url,
        settings.client_id.clone(),
        settings.auth_token.clone().unwrap_or_default(),
        settings.first_party_token.clone(),
        settings.broadcaster_id.clone(),
    ));
    let transport = Arc::new(SiteTransport::new(settings.chat_socket_url.clone()));
    let ctx = Arc::new(BotContext::new(
        settings,
        Arc::new(RecentIdCache::new()),
        client.clone(),
        transport.clone(),
        client,
        Arc::new(StaticPronouns::new()),
        Arc::new(FileConfigStore::new(config_path)),
        create_worker_pool(DEFAULT_MAX_QUEUED_TASKS),
    ));
    let relay = Arc::new(RelayEngine::new(ctx.clone()));
    let router = Arc::new(MessageRouter::new(ctx.clone(), relay.clone()));
    let dispatcher = Arc::new(CommandDispatcher::new(ctx.clone(), relay));

    // Start the site chat connection
    if let Err(e) = transport.spawn(router) {
        error!("Failed to start transport loop: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = transport.connect().await {
        error!("Failed to request initial connect: {}", e);
        std::process::exit(1);
    }

    // Periodic sweep of expired recent-id entries
    {
        let recent_ids = ctx.recent_ids.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = recent_ids.evict_expired();
                if evicted > 0 {
                    log::debug!("Evicted {} idle recent-id entries", evicted);
                }
            }
        });
    }

    // Local admin surface: health check plus a command endpoint that feeds
    // the dispatcher with broadcaster privilege. The platform chat command
    // source is an external collaborator; this route stands in for it.
    let health_route = warp::path("health").map(|| "OK");

    let command_route = warp::path("command")
        .and(warp::post())
        .and(warp::body::content_length_limit(1024))
        .and(warp::body::bytes())
        .and(with_dispatcher(dispatcher))
        .then(
            |body: warp::hyper::body::Bytes, dispatcher: Arc<CommandDispatcher>| async move {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                dispatcher
                    .accept(CommandEvent::new(
                        text,
                        HashSet::from([CommandPermission::Broadcaster]),
                    ))
                    .await;
                warp::reply()
            },
        );

    let routes = health_route.or(command_route);

    let host = std::env::var("CHAT_MIRROR_HOST").unwrap_or_else(|_| DEFAULT_ADMIN_HOST.to_string());
    let port = std::env::var("CHAT_MIRROR_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_ADMIN_PORT);
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse admin address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting admin server on {}", addr);
    warp::serve(routes).run(addr).await;
}

// Helper function to include the dispatcher in request handling
fn with_dispatcher(
    dispatcher: Arc<CommandDispatcher>,
) -> impl Filter<Extract = (Arc<CommandDispatcher>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || dispatcher.clone())
}
