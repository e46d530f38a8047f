// ABOUTME: Volume slider mapping and time display helpers.
// ABOUTME: Maps a 0-100 slider onto a logarithmic volume curve.

pub const SLIDER_MIN: u8 = 0;
pub const SLIDER_MAX: u8 = 100;

/// Quietest audible volume, at slider position 1
const VOLUME_FLOOR: f32 = 0.01;
const VOLUME_CEIL: f32 = 1.0;

/// Map slider 0-100 to volume 0.0-1.0 logarithmically.
/// Slider 0 is exact silence.
pub fn slider_to_volume(slider: u8) -> f32 {
    if slider <= SLIDER_MIN {
        return 0.0;
    }
    let slider = slider.min(SLIDER_MAX);
    let t = f32::from(slider - 1) / f32::from(SLIDER_MAX - 1);
    let (lo, hi) = (VOLUME_FLOOR.ln(), VOLUME_CEIL.ln());
    (lo + t * (hi - lo)).exp()
}

/// Inverse of [`slider_to_volume`]
pub fn volume_to_slider(volume: f32) -> u8 {
    if volume.is_nan() || volume <= 0.0 {
        return SLIDER_MIN;
    }
    let (lo, hi) = (VOLUME_FLOOR.ln(), VOLUME_CEIL.ln());
    let t = ((volume.min(VOLUME_CEIL).ln() - lo) / (hi - lo)).max(0.0);
    (1.0 + t * f32::from(SLIDER_MAX - 1)).round() as u8
}

/// Format milliseconds as `h:mm:ss`
pub fn format_time(millis: u64) -> String {
    let secs = millis / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    format!("{}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_endpoints() {
        assert_eq!(slider_to_volume(0), 0.0);
        assert!((slider_to_volume(1) - 0.01).abs() < 1e-6);
        assert!((slider_to_volume(100) - 1.0).abs() < 1e-6);
        assert_eq!(slider_to_volume(250), slider_to_volume(100));
    }

    #[test]
    fn slider_is_monotonic_and_invertible() {
        let mut last = -1.0;
        for pos in 0..=SLIDER_MAX {
            let volume = slider_to_volume(pos);
            assert!(volume > last);
            assert_eq!(volume_to_slider(volume), pos);
            last = volume;
        }
    }

    #[test]
    fn tiny_volumes_map_to_lowest_audible_step() {
        assert_eq!(volume_to_slider(0.0001), 1);
        assert_eq!(volume_to_slider(-1.0), 0);
    }

    #[test]
    fn time_format() {
        assert_eq!(format_time(0), "0:00:00");
        assert_eq!(format_time(61_999), "0:01:01");
        assert_eq!(format_time(3_723_000), "1:02:03");
    }
}
