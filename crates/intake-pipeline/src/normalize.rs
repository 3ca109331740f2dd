//! Post-processing of classifier output

use crate::config::PipelineConfig;
use intake_domain::Classification;
use tracing::info;

/// Apply the confidence and taxonomy rules to a classification
///
/// A classification that fails validation (empty names, confidence outside
/// [0, 1]) is rejected with the reason; it is never silently defaulted.
/// Otherwise:
///
/// - confidence below `confidence_threshold` forces the fallback pair
/// - with `enforce_taxonomy`, a pair outside the taxonomy becomes the
///   fallback pair
///
/// The score is kept in both cases.
pub fn normalize(
    classification: Classification,
    config: &PipelineConfig,
) -> Result<Classification, String> {
    classification.validate()?;
    let score = classification.confidence_score.clamp(0.0, 1.0);

    if score < config.confidence_threshold {
        if !classification.is_fallback() {
            info!(
                score,
                threshold = config.confidence_threshold,
                "Low confidence, using fallback classification"
            );
        }
        return Ok(Classification::fallback(score));
    }

    if config.enforce_taxonomy
        && !config
            .taxonomy
            .accepts(&classification.request_type, &classification.sub_request_type)
    {
        info!(
            request_type = %classification.request_type,
            sub_request_type = %classification.sub_request_type,
            "Classification outside taxonomy, using fallback classification"
        );
        return Ok(Classification::fallback(score));
    }

    Ok(Classification {
        confidence_score: score,
        ..classification
    })
}
