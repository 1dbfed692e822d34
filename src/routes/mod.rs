pub mod check_route;
pub mod default_route;
