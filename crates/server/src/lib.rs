use db::DBService;
use insights::InsightsService;
use utils_jwt::TokenService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod password;
pub mod routes;

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    tokens: TokenService,
    insights: InsightsService,
}

impl AppState {
    pub fn new(db: DBService, tokens: TokenService, insights: InsightsService) -> Self {
        Self {
            db,
            tokens,
            insights,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn insights(&self) -> &InsightsService {
        &self.insights
    }
}
