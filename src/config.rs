//! Viewer and loader settings.

use log::warn;

use crate::data_structures::frame::{MAX_FRAMES_IN_FLIGHT, MAX_LIGHTS};

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    /// Number of per-frame slots the CPU cycles through.
    pub frames_in_flight: usize,
    pub background_color: [f32; 3],
    pub display_bounding_boxes: bool,
    /// Center the scene at the origin and scale its longest axis to 1.
    pub normalize_scene: bool,
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub camera_translation: [f32; 3],
    pub light_count: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            background_color: [0.25, 0.25, 0.25],
            display_bounding_boxes: false,
            normalize_scene: true,
            fovy_degrees: 45.0,
            znear: 1.0 / 256.0,
            zfar: 256.0,
            camera_translation: [0.0, -0.25, -1.5],
            light_count: 1,
        }
    }
}

impl ViewerConfig {
    /// Clamps out-of-range values, logging every change.
    pub fn validated(mut self) -> Self {
        let frames = self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT);
        if frames != self.frames_in_flight {
            warn!(
                "frames in flight {} out of range, using {frames}",
                self.frames_in_flight
            );
            self.frames_in_flight = frames;
        }
        let lights = self.light_count.clamp(1, MAX_LIGHTS);
        if lights != self.light_count {
            warn!("light count {} out of range, using {lights}", self.light_count);
            self.light_count = lights;
        }
        if !(self.fovy_degrees > 0.0 && self.fovy_degrees < 180.0) {
            warn!("field of view {} out of range, using 45", self.fovy_degrees);
            self.fovy_degrees = 45.0;
        }
        if !(self.znear > 0.0 && self.zfar > self.znear) {
            let defaults = Self::default();
            warn!(
                "clip planes {}..{} invalid, using {}..{}",
                self.znear, self.zfar, defaults.znear, defaults.zfar
            );
            self.znear = defaults.znear;
            self.zfar = defaults.zfar;
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// OBJ texture coordinates have their origin at the bottom left.
    pub flip_obj_v: bool,
    /// Fail the build when a referenced texture cannot be read. When off,
    /// the slot falls back to its default texture.
    pub strict_textures: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            flip_obj_v: true,
            strict_textures: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_clamps_ranges() {
        let config = ViewerConfig {
            frames_in_flight: 7,
            light_count: 0,
            znear: 2.0,
            zfar: 1.0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.frames_in_flight, MAX_FRAMES_IN_FLIGHT);
        assert_eq!(config.light_count, 1);
        assert!(config.znear < config.zfar);
    }

    #[test]
    fn defaults_are_already_valid() {
        assert_eq!(ViewerConfig::default().validated(), ViewerConfig::default());
    }
}
