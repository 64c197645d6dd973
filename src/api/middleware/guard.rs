use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use crate::guard::{resolve_client_ip, Decision, GuardState};

/// Gate a request on its client address.
///
/// The peer address comes from `ConnectInfo`, so the server must be started
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn ip_guard(
    State(guard): State<Arc<GuardState>>,
    request: Request,
    next: Next,
) -> Response {
    if !guard.settings.enabled {
        return next.run(request).await;
    }

    let peer = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        None => {
            tracing::warn!("No peer address on request; judging it as 0.0.0.0");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    };

    let client_ip = resolve_client_ip(
        request.headers(),
        guard.settings.ip_header.as_deref(),
        peer,
    );

    let acl = guard.rules.acl().await;
    let (decision, reason) = acl.evaluate(&client_ip);

    match decision {
        Decision::Admit => {
            tracing::debug!("{} {} {}: {}", decision.as_str(), client_ip, request.uri().path(), reason.as_str());
            next.run(request).await
        }
        Decision::Reject => {
            tracing::warn!("{} {} {}: {}", decision.as_str(), client_ip, request.uri().path(), reason.as_str());
            (&guard.settings.deny).into_response()
        }
    }
}

/// Put every route of `router` behind the gate.
pub fn protect<S>(router: Router<S>, guard: Arc<GuardState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(guard, ip_guard))
}
