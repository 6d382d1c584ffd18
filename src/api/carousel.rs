//! Promotional carousel endpoints.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::ApiError;
use crate::gateway::{ApiResponse, Gateway, RequestOptions};
use crate::model::CarouselItem;

pub const DEFAULT_PLATFORM: &str = "all";
pub const DEFAULT_LIMIT: u32 = 5;

#[derive(Clone)]
pub struct CarouselApi {
    gateway: Arc<Gateway>,
}

impl CarouselApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Active banners for a platform (`all`, `web`, `app` or `mini`).
    pub async fn query_active_carousel(
        &self,
        platform: &str,
        limit: u32,
    ) -> Result<ApiResponse<Vec<CarouselItem>>, ApiError> {
        let response = self
            .gateway
            .get::<Vec<CarouselItem>>(
                "/carousel/queryActiveCarousel",
                Some(json!({ "platform": platform, "limit": limit })),
                RequestOptions::default(),
            )
            .await?;
        tracing::debug!(
            items = response.data.as_ref().map(Vec::len).unwrap_or(0),
            "Carousel loaded"
        );
        Ok(response)
    }

    pub async fn increment_click_count(&self, id: i64) -> Result<ApiResponse<Value>, ApiError> {
        self.gateway
            .post("/carousel/click", Some(json!({ "id": id })), RequestOptions::default())
            .await
    }
}
