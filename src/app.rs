use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, PromotionConfig};
use crate::database::SchoolStore;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::promotion::{CalendarWindowGuard, Clock, PromotionGuard, PromotionOrchestrator, SystemClock};
use crate::services::{ClassService, ExamService, LevelService, PromotionBatchService};

/// Shared dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SchoolStore>,
    pub clock: Arc<dyn Clock>,
    pub guard: Arc<dyn PromotionGuard>,
    pub jwt_secret: String,
    pub promotion: PromotionConfig,
    pub enable_cors: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn SchoolStore>, config: &AppConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            guard: Arc::new(CalendarWindowGuard::from_config(&config.promotion)),
            jwt_secret: config.security.jwt_secret.clone(),
            promotion: config.promotion.clone(),
            enable_cors: config.security.enable_cors,
        }
    }

    /// State with default promotion settings, used by tests and tooling
    pub fn with_parts(store: Arc<dyn SchoolStore>, clock: Arc<dyn Clock>, jwt_secret: impl Into<String>) -> Self {
        let promotion = PromotionConfig::default();
        Self {
            store,
            clock,
            guard: Arc::new(CalendarWindowGuard::from_config(&promotion)),
            jwt_secret: jwt_secret.into(),
            promotion,
            enable_cors: true,
        }
    }

    pub fn elevated_roles(&self) -> &[String] {
        &self.promotion.elevated_roles
    }

    pub fn orchestrator(&self) -> PromotionOrchestrator {
        PromotionOrchestrator::new(self.store.clone(), self.clock.clone(), self.promotion.selector_limit)
    }

    pub fn classes(&self) -> ClassService {
        ClassService::new(self.store.clone(), self.clock.clone())
    }

    pub fn levels(&self) -> LevelService {
        LevelService::new(self.store.clone())
    }

    pub fn exams(&self) -> ExamService {
        ExamService::new(self.store.clone())
    }

    pub fn batches(&self) -> PromotionBatchService {
        PromotionBatchService::new(self.store.clone(), self.clock.clone())
    }
}

pub fn app(state: AppState) -> Router {
    let cors = if state.enable_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let protected = Router::new()
        .merge(promotion_routes())
        .merge(record_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Bearer token required
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn promotion_routes() -> Router<AppState> {
    use handlers::promotion;

    Router::new()
        .route("/annual-promotion", post(promotion::annual_promotion))
        .route("/promote-class/:id", post(promotion::promote_class))
        .route("/promotion-preview", get(promotion::promotion_preview))
        .route("/promotion-readiness", post(promotion::promotion_readiness))
}

fn record_routes() -> Router<AppState> {
    use handlers::{classes, exams, levels, promotion_batches, students};

    Router::new()
        .route("/api/academic-levels", post(levels::level_create))
        .route("/api/academic-levels/:id", get(levels::level_get))
        .route("/api/streams", post(levels::stream_create))
        .route("/api/classes", post(classes::class_create))
        .route(
            "/api/classes/:id",
            get(classes::class_get)
                .patch(classes::class_update)
                .delete(classes::class_delete),
        )
        .route("/api/classes/:id/recount", post(classes::class_recount))
        .route("/api/classes/:id/lineage", get(classes::class_lineage))
        .route("/api/students", post(students::student_create))
        .route("/api/exams", post(exams::exam_create))
        .route("/api/exam-results", post(exams::result_save))
        .route("/api/exam-results/:id", get(exams::result_get))
        .route("/api/promotion-batches", post(promotion_batches::batch_create))
        .route("/api/promotion-batches/:id", get(promotion_batches::batch_get))
}
