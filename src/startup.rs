use std::net::TcpListener;

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    routes::{check_route, default_route},
    services::IndexChecker,
};

pub fn run(listener: TcpListener, checker: IndexChecker) -> Result<Server, std::io::Error> {
    let checker = web::Data::new(checker);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(check_route::check_indexing)
            .app_data(checker.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
