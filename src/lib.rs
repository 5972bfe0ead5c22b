//! Lead list and follow-up reminders backed by a remote planner.

pub mod domain;

#[cfg(feature = "server")]
pub mod dto;
#[cfg(feature = "server")]
pub mod error_conversions;
#[cfg(feature = "server")]
pub mod lead_source;
#[cfg(feature = "server")]
pub mod models;
#[cfg(feature = "server")]
pub mod planner;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod services;

#[cfg(feature = "server")]
pub use server::{AppState, configure, run};

#[cfg(feature = "server")]
mod server {
    use std::sync::Arc;

    use actix_cors::Cors;
    use actix_web::{App, HttpServer, middleware, web};

    use crate::lead_source::{HttpLeadSource, LeadSource, SampleLeadSource};
    use crate::models::config::ServerConfig;
    use crate::planner::PlannerGateway;
    use crate::planner::graph::GraphPlanner;
    use crate::planner::memory::InMemoryPlanner;
    use crate::routes::api::{api_v1_leads, api_v1_reminders};

    /// Collaborators shared by every handler.
    #[derive(Clone)]
    pub struct AppState {
        pub planner: Arc<dyn PlannerGateway>,
        /// `None` when neither demo mode nor a lead feed is configured.
        pub leads: Option<Arc<dyn LeadSource>>,
        pub leads_page_url: String,
    }

    impl AppState {
        pub fn from_config(config: &ServerConfig) -> Self {
            if config.demo {
                log::info!("Running in demo mode with sample leads and an in-memory planner");
                return Self {
                    planner: Arc::new(InMemoryPlanner::new()),
                    leads: Some(Arc::new(SampleLeadSource)),
                    leads_page_url: config.leads_page_url.clone(),
                };
            }

            let leads: Option<Arc<dyn LeadSource>> = match &config.leads_api_url {
                Some(url) => Some(Arc::new(HttpLeadSource::new(url.clone()))),
                None => {
                    log::warn!("leads_api_url is not set; listing leads needs configuration");
                    None
                }
            };

            Self {
                planner: Arc::new(GraphPlanner::new(
                    config.graph_base_url.clone(),
                    config.graph_access_token.clone(),
                )),
                leads,
                leads_page_url: config.leads_page_url.clone(),
            }
        }
    }

    /// Registers the API routes; shared by [`run`] and the integration tests.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope("/api")
                .service(api_v1_leads)
                .service(api_v1_reminders),
        );
    }

    /// Builds and runs the Actix-Web HTTP server using the provided configuration.
    pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
        let state = AppState::from_config(&server_config);
        let bind_address = (server_config.address.clone(), server_config.port);

        log::info!("Listening on {}:{}", bind_address.0, bind_address.1);

        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .wrap(middleware::Compress::default())
                .wrap(middleware::Logger::default())
                .app_data(web::Data::new(state.clone()))
                .configure(configure)
        })
        .bind(bind_address)?
        .run()
        .await
    }
}
