use crate::error::{Error, Result};
use crate::report::{self, DotOptions, GraphLayout, ReportItem, TextOptions, compile_filter};
use crate::store::Registry;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

pub struct AppState {
    pub registry: Arc<Registry>,
    pub layout: Box<dyn GraphLayout>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    profile: Option<String>,
    filter: Option<String>,
    cumsort: Option<String>,
    force: Option<String>,
    img: Option<String>,
    text: Option<String>,
}

enum Rendered {
    Items(Vec<ReportItem>),
    Text(String),
    Image(Vec<u8>, &'static str),
}

/// `1`, `t`, `true` in any of the usual casings; anything else is false
pub fn parse_bool(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "t" | "T" | "true" | "TRUE" | "True"))
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnknownKind(_) => StatusCode::NOT_FOUND,
        Error::InvalidFilter { .. } | Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Error) -> Response {
    (status_for(err), err.to_string()).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/p", get(report_handler))
        .route("/stats", get(stats_handler))
        .route("/kinds", get(kinds_handler))
        .with_state(state)
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let kind = query.profile.unwrap_or_default();
    if let Err(e) = state.registry.require(&kind) {
        return error_response(&e);
    }
    let filter = match compile_filter(query.filter.as_deref().unwrap_or("")) {
        Ok(filter) => filter,
        Err(e) => return error_response(&e),
    };
    let cumulative = parse_bool(query.cumsort.as_deref());
    let force = parse_bool(query.force.as_deref());
    let img = parse_bool(query.img.as_deref());
    let text = parse_bool(query.text.as_deref());

    let result = tokio::task::spawn_blocking(move || {
        build_report(&state, &kind, filter.as_ref(), cumulative, force, img, text)
    })
    .await;

    match result {
        Ok(Ok(Rendered::Items(items))) => Json(items).into_response(),
        Ok(Ok(Rendered::Text(body))) => {
            ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
        }
        Ok(Ok(Rendered::Image(bytes, content_type))) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(Err(e)) => {
            log::warn!("/p failed: {}", e);
            error_response(&e)
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn build_report(
    state: &AppState,
    kind: &str,
    filter: Option<&Regex>,
    cumulative: bool,
    force: bool,
    img: bool,
    text: bool,
) -> Result<Rendered> {
    let profile = state.registry.require(kind)?.fetch(force, 0)?;
    let tree = report::apply(&profile, filter, cumulative);

    if img {
        let bytes = report::render_image(&tree, &DotOptions::default(), state.layout.as_ref())?;
        return Ok(Rendered::Image(bytes, state.layout.content_type()));
    }
    if text {
        let rendered = report::render_text(
            &tree,
            &TextOptions {
                print_addresses: true,
            },
        );
        let mut body = rendered.header.join("\n");
        for line in &rendered.lines {
            body.push('\n');
            body.push_str(line);
        }
        body.push('\n');
        return Ok(Rendered::Text(body));
    }
    Ok(Rendered::Items(report::render_json(&tree)))
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    let fetcher = state.registry.fetcher().clone();
    match tokio::task::spawn_blocking(move || fetcher.stats()).await {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Ok(Err(e)) => {
            log::debug!("/stats failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn kinds_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.kinds().map(str::to_string).collect())
}

/// Serve until Ctrl-C
pub async fn serve(listen: &str, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    eprintln!("Point your browser to http://{}", listen);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for v in ["1", "t", "T", "true", "TRUE", "True"] {
            assert!(parse_bool(Some(v)), "{}", v);
        }
        for v in ["", "0", "yes", "on", "false", "tru"] {
            assert!(!parse_bool(Some(v)), "{}", v);
        }
        assert!(!parse_bool(None));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::UnknownKind("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::InvalidFilter {
                pattern: "([".into(),
                reason: "unclosed".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::Render("dot missing".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
