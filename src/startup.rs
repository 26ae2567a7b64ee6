use std::net::TcpListener;

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::PgPool;

use crate::{
    routes::{default_route, search_route},
    services::{DeduplicationGate, LeadScraper},
};

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    lead_scraper: LeadScraper,
) -> Result<Server, std::io::Error> {
    let gate = Data::new(DeduplicationGate::new(db_pool.clone()));
    let db_pool = web::Data::new(db_pool);
    let lead_scraper = Data::new(lead_scraper);
    let active_run = Data::new(search_route::ActiveRun::default());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(
                web::scope("/search")
                    .service(search_route::start_search)
                    .service(search_route::stop_search),
            )
            .app_data(db_pool.clone())
            .app_data(gate.clone())
            .app_data(lead_scraper.clone())
            .app_data(active_run.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
