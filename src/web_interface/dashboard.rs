use rust_embed::RustEmbed;
use warp::filters::path::Tail;
use warp::{reply, Filter, Rejection, Reply};

/// Static dashboard assets, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/static/"]
struct DashboardAssets;

const INDEX: &str = "index.html";

/// GET /dashboard and GET /dashboard/<asset>
pub fn dashboard_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("dashboard")
        .and(warp::get())
        .and(warp::path::tail())
        .and_then(|tail: Tail| serve_asset(tail.as_str().to_string()))
}

async fn serve_asset(path: String) -> Result<reply::Response, Rejection> {
    let path = if path.is_empty() { INDEX.to_string() } else { path };
    let asset = DashboardAssets::get(&path).ok_or_else(warp::reject::not_found)?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(reply::with_header(asset.data.into_owned(), "content-type", mime.as_ref()).into_response())
}
