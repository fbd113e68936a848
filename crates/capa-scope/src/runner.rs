use futures_util::future::BoxFuture;
use tracing::warn;

use crate::error::ScopeError;
use crate::scope::RosaControlPlaneScope;

/// Runs `body` against `scope`, then closes the scope on every exit path.
///
/// If the body fails, its error is returned and a close failure is only
/// logged. If the body succeeds, a close failure is returned.
///
/// ```ignore
/// with_scope(scope, |scope| Box::pin(async move {
///     scope.control_plane_mut().status.ready = true;
///     Ok::<_, ScopeError>(())
/// }))
/// .await?;
/// ```
pub async fn with_scope<F, R, E>(mut scope: RosaControlPlaneScope, body: F) -> Result<R, E>
where
    F: for<'s> FnOnce(&'s mut RosaControlPlaneScope) -> BoxFuture<'s, Result<R, E>>,
    E: From<ScopeError> + std::fmt::Display,
{
    let outcome = body(&mut scope).await;
    let closed = scope.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(E::from(close_err)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(
                error = %close_err,
                reconcile_error = %err,
                "Failed to close scope after reconcile error"
            );
            Err(err)
        }
    }
}
