use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::habits::create_habit,
        api::habits::toggle_habit,
        api::shop::purchase_item,
    ),
    tags(
        (name = "habit-tracker", description = "Habit tracker API")
    )
)]
pub struct ApiDoc;
