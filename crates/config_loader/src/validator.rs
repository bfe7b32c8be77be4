//! Configuration validation
//!
//! Rules:
//! - stream resolutions and rates > 0
//! - registration `depth_to_color` requires matching depth/color resolution
//! - channel and queue capacities > 0
//! - field of view within (0, 180) degrees, depth unit > 0
//! - reader fps finite and within (0, MAX_READER_FPS]

use contracts::{ContractError, EngineConfig, RegistrationMode, VideoMode};

/// Highest reader polling rate accepted, in Hz
pub const MAX_READER_FPS: f64 = 1000.0;

/// Whether `fps` is a usable reader polling rate
///
/// NaN, infinities and rates outside (0, MAX_READER_FPS] are rejected.
pub fn is_valid_reader_fps(fps: f64) -> bool {
    fps.is_finite() && fps > 0.0 && fps <= MAX_READER_FPS
}

/// Validate an EngineConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &EngineConfig) -> Result<(), ContractError> {
    validate_video_mode("device.depth", &config.device.depth)?;
    validate_video_mode("device.color", &config.device.color)?;
    validate_registration(config)?;
    validate_capacities(config)?;
    validate_converter(config)?;
    validate_reader(config)?;
    Ok(())
}

/// Collect non-fatal configuration warnings
pub fn collect_warnings(config: &EngineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.device.depth_color_sync {
        warnings.push(
            "device.depth_color_sync is disabled - depth and color indices may never match"
                .to_string(),
        );
    }

    if config.device.depth.fps != config.device.color.fps {
        warnings.push(format!(
            "depth runs at {} fps and color at {} fps - surplus frames of the faster stream are discarded",
            config.device.depth.fps, config.device.color.fps
        ));
    }

    if config.reader.fps > f64::from(config.device.depth.fps.max(config.device.color.fps)) {
        warnings.push(format!(
            "reader.fps ({}) exceeds the stream rate - the reader will observe the same pair repeatedly",
            config.reader.fps
        ));
    }

    warnings
}

fn validate_video_mode(field: &str, mode: &VideoMode) -> Result<(), ContractError> {
    if mode.width == 0 || mode.height == 0 {
        return Err(ContractError::config_validation(
            field,
            format!("resolution must be > 0, got {}x{}", mode.width, mode.height),
        ));
    }
    if mode.fps == 0 {
        return Err(ContractError::config_validation(
            format!("{field}.fps"),
            "fps must be > 0",
        ));
    }
    Ok(())
}

fn validate_registration(config: &EngineConfig) -> Result<(), ContractError> {
    let depth = &config.device.depth;
    let color = &config.device.color;
    if config.device.registration == RegistrationMode::DepthToColor
        && (depth.width, depth.height) != (color.width, color.height)
    {
        return Err(ContractError::config_validation(
            "device.registration",
            format!(
                "depth_to_color requires matching resolutions, got depth {}x{} and color {}x{}",
                depth.width, depth.height, color.width, color.height
            ),
        ));
    }
    Ok(())
}

fn validate_capacities(config: &EngineConfig) -> Result<(), ContractError> {
    if config.ingestion.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "ingestion.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    if config.sync.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "sync.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_converter(config: &EngineConfig) -> Result<(), ContractError> {
    let converter = &config.converter;
    for (field, fov) in [
        ("converter.horizontal_fov_deg", converter.horizontal_fov_deg),
        ("converter.vertical_fov_deg", converter.vertical_fov_deg),
    ] {
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ContractError::config_validation(
                field,
                format!("field of view must be within (0, 180) degrees, got {fov}"),
            ));
        }
    }
    if !(converter.depth_unit_m > 0.0) {
        return Err(ContractError::config_validation(
            "converter.depth_unit_m",
            format!("depth_unit_m must be > 0, got {}", converter.depth_unit_m),
        ));
    }
    Ok(())
}

fn validate_reader(config: &EngineConfig) -> Result<(), ContractError> {
    if !is_valid_reader_fps(config.reader.fps) {
        return Err(ContractError::config_validation(
            "reader.fps",
            format!(
                "fps must be within (0, {MAX_READER_FPS}], got {}",
                config.reader.fps
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&EngineConfig::default()).is_ok());
        assert!(collect_warnings(&EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut config = EngineConfig::default();
        config.device.depth.width = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("device.depth"));
    }

    #[test]
    fn test_registration_requires_matching_resolution() {
        let mut config = EngineConfig::default();
        config.device.color = VideoMode::new(1280, 1024, 30);
        assert!(validate(&config).is_err());

        config.device.registration = RegistrationMode::Off;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_fov_bounds() {
        let mut config = EngineConfig::default();
        config.converter.vertical_fov_deg = 180.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("converter.vertical_fov_deg"));
    }

    #[test]
    fn test_rate_mismatch_warning() {
        let mut config = EngineConfig::default();
        config.device.color.fps = 15;
        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("surplus frames"));
    }

    #[test]
    fn test_reader_fps_bounds() {
        let mut config = EngineConfig::default();
        for fps in [0.0, -5.0, 1e-30, 1000.5, f64::INFINITY, f64::NAN] {
            config.reader.fps = fps;
            let err = validate(&config).unwrap_err();
            assert!(err.to_string().contains("reader.fps"), "fps {fps} accepted");
        }

        config.reader.fps = MAX_READER_FPS;
        assert!(validate(&config).is_ok());
        config.reader.fps = 0.5;
        assert!(validate(&config).is_ok());
    }
}
