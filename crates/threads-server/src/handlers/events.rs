use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::{stream, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::auth::AuthUser;
use crate::routes::AppState;

/// GET /api/v1/me/events
///
/// Streams `invalidate` events for views the caller should re-fetch.
pub async fn invalidations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.directory.subscribe();
    let external_id = user.external_id;

    let events = stream::unfold(rx, move |mut rx| {
        let external_id = external_id.clone();
        async move {
            loop {
                match rx.recv().await {
                    Ok(inv) if inv.external_id == external_id => {
                        let event = Event::default().event("invalidate").data(inv.path);
                        return Some((Ok::<_, Infallible>(event), rx));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "invalidation subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
