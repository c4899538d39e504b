use rasterview_core::config::{DerivationKind, PyramidConfig, ViewerConfig};
use rasterview_core::consts::{MAX_SCROLL_VALUE, MODEL_BOUNDS_EXTENSION};
use rasterview_core::pyramid::from_kind;

#[test]
fn test_defaults() {
    let config = ViewerConfig::default();
    assert_eq!(config.scroll.margin, MODEL_BOUNDS_EXTENSION);
    assert_eq!(config.scroll.max_value, MAX_SCROLL_VALUE);
    assert_eq!(config.pyramid.levels, None);
    assert_eq!(config.pyramid.derivation, DerivationKind::Downsample);
    assert!(config.zoom.wheel_step > 1.0);
    assert!(config.view.width > 0.0 && config.view.height > 0.0);
}

#[test]
fn test_derivation_kind_display() {
    assert_eq!(DerivationKind::Downsample.to_string(), "Downsample");
    assert_eq!(
        DerivationKind::Rescale {
            factor: 2.5,
            offset: -1.0
        }
        .to_string(),
        "Rescale (x2.5, -1)"
    );
    assert_eq!(
        DerivationKind::Rescale {
            factor: 1.0,
            offset: 0.5
        }
        .to_string(),
        "Rescale (x1, +0.5)"
    );
    assert_eq!(
        DerivationKind::Stretch {
            low: 0.0,
            high: 1.0
        }
        .to_string(),
        "Stretch (0..1)"
    );
    assert_eq!(DerivationKind::NoData.to_string(), "No Data");
}

#[test]
fn test_toml_round_trip() {
    let config = ViewerConfig {
        pyramid: PyramidConfig {
            levels: Some(6),
            derivation: DerivationKind::Stretch {
                low: 0.1,
                high: 0.9,
            },
        },
        ..Default::default()
    };
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: ViewerConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let text = r#"
[scroll]
margin = 4.0
max_value = 500
"#;
    let config: ViewerConfig = toml::from_str(text).unwrap();
    assert_eq!(config.scroll.margin, 4.0);
    assert_eq!(config.scroll.max_value, 500);
    assert_eq!(config.pyramid, PyramidConfig::default());
    assert_eq!(config.view, ViewerConfig::default().view);
}

#[test]
fn test_json_round_trip() {
    let config = ViewerConfig {
        pyramid: PyramidConfig {
            levels: None,
            derivation: DerivationKind::Rescale {
                factor: 0.5,
                offset: 1.0,
            },
        },
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: ViewerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_from_kind_names() {
    assert_eq!(from_kind(&DerivationKind::Downsample).name(), "downsample");
    assert_eq!(
        from_kind(&DerivationKind::Rescale {
            factor: 1.0,
            offset: 0.0
        })
        .name(),
        "rescale"
    );
    assert_eq!(
        from_kind(&DerivationKind::Stretch {
            low: 0.0,
            high: 1.0
        })
        .name(),
        "stretch"
    );
    assert_eq!(from_kind(&DerivationKind::NoData).name(), "no-data");
}
