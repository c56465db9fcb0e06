use std::collections::HashMap;

use super::*;

#[test]
fn defaults_match_reference_layout() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.reference_design_width, 1280.0);
    assert_eq!(cfg.render_scale, 2.0);
    assert_eq!(cfg.sync_retry.delay_ms, 100);
    assert_eq!(cfg.sync_retry.max_retries, 50);
    assert_eq!(cfg.fallback_box, Size::new(180.0, 70.0));
    cfg.validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg: PipelineConfig =
        serde_json::from_str(r#"{ "render_scale": 1.5, "finalize_policy": "require_all" }"#)
            .unwrap();
    assert_eq!(cfg.render_scale, 1.5);
    assert_eq!(cfg.finalize_policy, FinalizePolicy::RequireAll);
    assert_eq!(cfg.reference_design_width, 1280.0);
}

#[test]
fn overrides_ignore_garbage() {
    let env: HashMap<&str, &str> = [
        ("DOCSEAL_RENDER_SCALE", "3"),
        ("DOCSEAL_REFERENCE_WIDTH", "-4"),
        ("DOCSEAL_SYNC_MAX_RETRIES", "7"),
        ("DOCSEAL_SYNC_RETRY_DELAY_MS", "soon"),
    ]
    .into_iter()
    .collect();

    let mut cfg = PipelineConfig::default();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.render_scale, 3.0);
    assert_eq!(cfg.reference_design_width, 1280.0);
    assert_eq!(cfg.sync_retry.max_retries, 7);
    assert_eq!(cfg.sync_retry.delay_ms, 100);
}

#[test]
fn validate_rejects_zero_scale() {
    let cfg = PipelineConfig {
        render_scale: 0.0,
        ..PipelineConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(DocsealError::Validation(_))));
}
