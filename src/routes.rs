// Route definitions

use crate::handlers;
use crate::state::AppState;
use std::convert::Infallible;
use warp::Filter;

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn configure_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = warp::path("api");

    // POST /api/chat
    let chat = api
        .and(warp::path("chat"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(handlers::chat_handler);

    // POST /api/completions
    let completions = api
        .and(warp::path("completions"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(handlers::completions_handler);

    chat.or(completions)
}
