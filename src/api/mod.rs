mod chain;
mod health;
pub mod models;

use actix_web::web::ServiceConfig;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health_check)
        .service(chain::get_chain)
        .service(chain::write_block)
        .service(chain::validate_chain)
        .service(chain::replace_chain);
}
