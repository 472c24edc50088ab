pub mod info_routes;
pub mod predict_routes;
