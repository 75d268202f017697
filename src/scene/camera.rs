use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Discrete movement requests, scaled by speed and frame delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraAction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Tunables read from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub mouse_sensitivity: f32,
    pub speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 1.0, 3.0],
            mouse_sensitivity: 0.1,
            speed: 2.5,
        }
    }
}

/// First-person camera: a position plus yaw/pitch look direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees, clamped to ±89.
    pub pitch: f32,
    pub mouse_sensitivity: f32,
    pub speed: f32,

    // === Projection ===
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default())
    }
}

impl Camera {
    pub const PITCH_LIMIT: f32 = 89.0;

    #[must_use]
    pub fn from_settings(settings: &CameraSettings) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(settings.position),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            mouse_sensitivity: settings.mouse_sensitivity,
            speed: settings.speed,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
        };
        camera.update_vectors();
        camera
    }

    #[must_use]
    pub fn front(&self) -> Vec3 {
        self.front
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn process_movement(&mut self, action: CameraAction, dt: f32) {
        let step = self.speed * dt;
        self.position += step
            * match action {
                CameraAction::Forward => self.front,
                CameraAction::Backward => -self.front,
                CameraAction::Left => -self.right,
                CameraAction::Right => self.right,
                CameraAction::Up => self.world_up,
                CameraAction::Down => -self.world_up,
            };
    }

    /// Applies a cursor offset in pixels. Positive `dy` looks up.
    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.update_vectors();
    }

    /// Points the camera at `target` from its current position.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.pitch = dir.y.asin().to_degrees().clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.yaw = dir.z.atan2(dir.x).to_degrees();
        self.update_vectors();
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// glam's `perspective_rh` maps depth to 0..1, as wgpu expects.
    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
