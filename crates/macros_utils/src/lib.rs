//! Small macros shared by the HTTP binaries.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub mod __private {
    pub use actix_web;
}

/// Generates a `routes` function registering every listed actix-web handler.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     route list_monitors,
/// }
///
/// App::new().configure(routes);
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $handler:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__private::actix_web::web::ServiceConfig) {
            $( cfg.service($handler); )*
        }
    };
}
