use crate::{
    api::{anomaly, employee, leave, punch, reconcile, report, shift},
    config::Config,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let read_limiter = build_limiter(config.rate_read_per_min);
    let write_limiter = build_limiter(config.rate_write_per_min);
    let recon_limiter = build_limiter(config.rate_recon_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(read_limiter)
            .service(
                web::scope("/employee")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(employee::get_employee))),
            )
            .service(
                web::scope("/shift")
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::create_shift))
                            .route(web::get().to(shift::list_shifts)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(shift::get_shift))),
            )
            .service(
                web::scope("/punch").service(
                    web::resource("")
                        .route(web::post().to(punch::create_punch))
                        .route(web::get().to(punch::list_punches)),
                ),
            )
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    ),
            )
            .service(
                web::scope("/anomaly")
                    .service(web::resource("").route(web::get().to(anomaly::list_anomalies)))
                    .service(web::resource("/{id}").route(web::get().to(anomaly::get_anomaly)))
                    .service(
                        web::resource("/{id}/treat")
                            .wrap(write_limiter)
                            .route(web::post().to(anomaly::treat_anomaly)),
                    ),
            )
            .service(
                // Batch passes are heavier than interactive calls.
                web::scope("/recon").service(
                    web::resource("/run")
                        .wrap(recon_limiter)
                        .route(web::post().to(reconcile::run)),
                ),
            )
            .service(
                web::scope("/report")
                    .service(web::resource("/summary").route(web::get().to(report::summary))),
            ),
    );
}
