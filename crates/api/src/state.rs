//! Shared application state

use std::sync::Arc;

use crate::auth::{IdentityLinker, JwtManager, MagicLinkService, SessionManager};
use crate::config::Config;
use crate::email::Mailer;
use crate::store::RecordStore;
use crate::tickets::TicketEngine;
use crate::websocket::WebSocketState;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub jwt: Arc<JwtManager>,
    pub sessions: Arc<SessionManager>,
    pub magic_links: Arc<MagicLinkService>,
    pub identity: Arc<IdentityLinker>,
    pub tickets: Arc<TicketEngine>,
    pub ws: WebSocketState,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Self {
        let config = Arc::new(config);
        let jwt = Arc::new(JwtManager::new(
            &config.access_token_secret,
            &config.refresh_token_secret,
            config.access_token_ttl_minutes,
            config.refresh_token_ttl_days,
        ));
        let sessions = Arc::new(SessionManager::new(jwt.clone(), store.clone()));
        let magic_links = Arc::new(MagicLinkService::new(
            &config.session_secret,
            config.magic_link_ttl_minutes,
            store.clone(),
            mailer,
        ));
        let identity = Arc::new(IdentityLinker::new(store.clone()));
        let tickets = Arc::new(TicketEngine::new(store.clone()));

        Self {
            config,
            store,
            jwt,
            sessions,
            magic_links,
            identity,
            tickets,
            ws: WebSocketState::new(),
        }
    }
}
