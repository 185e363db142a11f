use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Illust Sync API",
        description = "Local viewer API over a synced illustration archive.",
        version = "0.2.0"
    ),
    servers(
        (url = "http://localhost:7830", description = "Local viewer")
    ),
    paths(
        handlers::illust::list_illusts,
        handlers::illust::get_illust,
        handlers::illust::delete_illust,
        handlers::image::get_page_image,
        handlers::tag::list_tags,
        handlers::stats::get_stats,
    ),
    components(
        schemas(
            models::Illust,
            models::Author,
            models::Tag,
            models::Page,
            handlers::illust::IllustQuery,
            handlers::illust::IllustListItem,
            handlers::illust::IllustRow,
            handlers::illust::IllustDetail,
            handlers::tag::TagQuery,
            handlers::tag::TagWithCount,
            handlers::stats::Stats,
        )
    )
)]
pub struct ApiDoc;
