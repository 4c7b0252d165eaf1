// Photo to full workflow: OCR the product name, then analyze and improve it

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::{UserPreferences, WorkflowResult};
use crate::services::{AnalyzeWorkflow, ProductNameExtractor};
use crate::types::{AppError, AppResult};
use crate::vision::DEFAULT_IMAGE_MIME_TYPE;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    pub product_name: String,
    pub result: WorkflowResult,
}

pub struct AnalyzeService {
    extractor: Arc<dyn ProductNameExtractor>,
    workflow: Arc<dyn AnalyzeWorkflow>,
}

impl AnalyzeService {
    pub fn new(extractor: Arc<dyn ProductNameExtractor>, workflow: Arc<dyn AnalyzeWorkflow>) -> Self {
        Self { extractor, workflow }
    }

    pub async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<AnalyzeOutcome> {
        if image.is_empty() {
            return Err(AppError::InvalidArgument("image bytes are required".to_string()));
        }
        let mime_type = match mime_type.trim() {
            "" => DEFAULT_IMAGE_MIME_TYPE,
            other => other,
        };

        let product_name = self
            .extractor
            .extract_product_name(image, mime_type, cancel)
            .await
            .map_err(|e| AppError::in_phase("extract product name", e))?;
        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(AppError::in_phase(
                "extract product name",
                AppError::InvalidArgument("product name is required".to_string()),
            ));
        }

        info!(product = %product_name, "Running analyze workflow for scanned product");
        let result = self
            .workflow
            .analyze_and_improve(product_name, prefs, cancel)
            .await
            .map_err(|e| AppError::in_phase("run analyze workflow", e))?;

        Ok(AnalyzeOutcome {
            product_name: product_name.to_string(),
            result,
        })
    }
}
