use glam::{Mat4, Quat, Vec3};

/// Perspective lens shared by the main camera and the projector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Lens {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_y_degrees: 70.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Lens {
    /// OpenGL projection matrix (clip depth in `[-1, 1]`).
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_degrees.to_radians(), aspect, self.near, self.far)
    }
}

/// Directions the camera can be pushed in during one frame.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CameraMovement {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

/// First-person camera steered with the keyboard and mouse.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Distance moved per frame while a movement key is held.
    pub linear_speed: f32,
    /// Degrees of rotation per unit of cursor travel.
    pub rotation_gain: f32,
    last_cursor: Option<(f32, f32)>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, 0.0),
            forward: Vec3::NEG_Z,
            linear_speed: 0.15,
            rotation_gain: 30.0,
            last_cursor: None,
        }
    }
}

/// Maps a cursor position in pixels to `[min, max]` centred on the screen, with y pointing up.
pub fn cursor_in_range(
    screen_x: f32,
    screen_y: f32,
    screen_w: f32,
    screen_h: f32,
    min: f32,
    max: f32,
) -> (f32, f32) {
    let span = max - min;
    let x = screen_x / screen_w * span - span / 2.0;
    let y = screen_y / screen_h * span - span / 2.0;
    (x, -y)
}

/// Unit view direction for a yaw about the y axis and a pitch above the horizon, in radians.
///
/// Zero yaw and pitch look down `-z`; positive yaw turns left.
pub fn direction_from_angles(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(-yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos())
}

impl Camera {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize(),
            ..Default::default()
        }
    }

    /// World-to-view matrix. A camera looking straight up or down keeps `-z` as its screen up.
    pub fn view(&self) -> Mat4 {
        let up = if self.forward.cross(Vec3::Y).length_squared() <= f32::EPSILON {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.position + self.forward, up)
    }

    pub fn view_projection(&self, aspect: f32, lens: &Lens) -> Mat4 {
        lens.projection(aspect) * self.view()
    }

    /// Turns the camera by the cursor travel since the previous call.
    ///
    /// The first call only records the position.
    pub fn on_cursor_moved(&mut self, screen_x: f32, screen_y: f32, screen_w: f32, screen_h: f32) {
        let (x, y) = cursor_in_range(screen_x, screen_y, screen_w, screen_h, 0.0, 1.0);
        if let Some((prev_x, prev_y)) = self.last_cursor.replace((x, y)) {
            self.rotate(prev_x - x, prev_y - y);
        }
    }

    /// Turns the camera by a relative mouse motion in pixels, as reported by a grabbed cursor.
    pub fn on_mouse_motion(&mut self, delta_x: f32, delta_y: f32, screen_w: f32, screen_h: f32) {
        self.rotate(-delta_x / screen_w, delta_y / screen_h);
    }

    /// Yaws by `dx` and pitches by `dy`, both in screen widths/heights scaled by
    /// `rotation_gain`.
    ///
    /// Rotations that would bring the view within about 8 degrees of straight up or down are
    /// dropped, which keeps `look_at` well defined.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let gain = self.rotation_gain.to_radians();

        let yawed = Quat::from_rotation_y(gain * dx) * self.forward;
        let pitch_axis = yawed.cross(Vec3::Y).normalize_or_zero();
        if pitch_axis == Vec3::ZERO {
            return;
        }
        let turned = (Quat::from_axis_angle(pitch_axis, gain * -dy) * yawed).normalize();
        if turned.dot(Vec3::Y).abs() < 0.99 {
            self.forward = turned;
        }
    }

    /// Translates the camera one step along the requested directions.
    pub fn apply_movement(&mut self, movement: CameraMovement) {
        let right = self.forward.cross(Vec3::Y).normalize_or_zero();
        let mut dir = Vec3::ZERO;
        if movement.forward {
            dir += self.forward;
        }
        if movement.back {
            dir -= self.forward;
        }
        if movement.right {
            dir += right;
        }
        if movement.left {
            dir -= right;
        }
        if dir.length_squared() > 0.0 {
            self.position += dir.normalize() * self.linear_speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_in_range_centres_and_flips() {
        assert_eq!(cursor_in_range(300.0, 300.0, 600.0, 600.0, 0.0, 1.0), (0.0, 0.0));
        assert_eq!(cursor_in_range(0.0, 0.0, 600.0, 600.0, 0.0, 1.0), (-0.5, 0.5));
        assert_eq!(cursor_in_range(600.0, 600.0, 600.0, 600.0, -1.0, 1.0), (1.0, -1.0));
    }

    #[test]
    fn test_direction_from_angles() {
        assert!(direction_from_angles(0.0, 0.0).distance(Vec3::NEG_Z) < 1e-6);
        let left = direction_from_angles(std::f32::consts::FRAC_PI_2, 0.0);
        assert!(left.distance(Vec3::NEG_X) < 1e-6, "{:?}", left);
        let down = direction_from_angles(0.3, -0.5);
        assert!((down.length() - 1.0).abs() < 1e-6);
        assert!((down.y - (-0.5f32).sin()).abs() < 1e-6);
    }

    #[test]
    fn test_first_cursor_event_only_records() {
        let mut camera = Camera::default();
        camera.on_cursor_moved(10.0, 500.0, 600.0, 600.0);
        assert_eq!(camera.forward, Vec3::NEG_Z);
    }

    #[test]
    fn test_horizontal_cursor_travel_yaws() {
        let mut camera = Camera::default();
        camera.on_cursor_moved(300.0, 300.0, 600.0, 600.0);
        camera.on_cursor_moved(600.0, 300.0, 600.0, 600.0);
        // moving right by half the screen turns 15 degrees to the right
        assert!(camera.forward.x > 0.0, "{:?}", camera.forward);
        assert!(camera.forward.y.abs() < 1e-5);
        let angle = camera.forward.angle_between(Vec3::NEG_Z).to_degrees();
        assert!((angle - 15.0).abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_mouse_motion_matches_cursor_travel() {
        let mut by_cursor = Camera::default();
        by_cursor.on_cursor_moved(300.0, 300.0, 600.0, 600.0);
        by_cursor.on_cursor_moved(360.0, 270.0, 600.0, 600.0);

        let mut by_motion = Camera::default();
        by_motion.on_mouse_motion(60.0, -30.0, 600.0, 600.0);

        assert!(by_cursor.forward.distance(by_motion.forward) < 1e-5);
        assert!(by_motion.forward.y > 0.0, "moving the mouse up looks up");
    }

    #[test]
    fn test_pitch_cannot_reach_vertical() {
        let mut camera = Camera {
            rotation_gain: 180.0,
            ..Default::default()
        };
        camera.on_cursor_moved(300.0, 300.0, 600.0, 600.0);
        // half a screen upwards at 180 degrees per unit would point straight up
        camera.on_cursor_moved(300.0, 0.0, 600.0, 600.0);
        assert_eq!(camera.forward, Vec3::NEG_Z);

        camera.on_cursor_moved(300.0, 150.0, 600.0, 600.0);
        assert!(camera.forward.dot(Vec3::Y).abs() < 0.99);
        assert!((camera.forward.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_movement_is_normalized() {
        let mut camera = Camera::default();
        camera.apply_movement(CameraMovement {
            forward: true,
            right: true,
            ..Default::default()
        });
        let travelled = camera.position.distance(Vec3::new(0.0, 1.6, 0.0));
        assert!((travelled - 0.15).abs() < 1e-5);
        assert!(camera.position.x > 0.0 && camera.position.z < 0.0);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut camera = Camera::default();
        camera.apply_movement(CameraMovement {
            forward: true,
            back: true,
            ..Default::default()
        });
        assert_eq!(camera.position, Vec3::new(0.0, 1.6, 0.0));
    }

    #[test]
    fn test_vertical_camera_has_finite_view() {
        for &forward in &[Vec3::NEG_Y, Vec3::Y] {
            let camera = Camera::new(Vec3::new(0.0, 1.6, 0.0), forward);
            let view_projection = camera.view_projection(1.0, &Lens::default());
            assert!(view_projection.is_finite(), "{:?}", forward);

            let ahead = camera.position + forward * 5.0;
            let clip = view_projection * ahead.extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{:?}", ndc);
        }
    }

    #[test]
    fn test_view_projection_puts_target_in_front() {
        let camera = Camera::default();
        let clip = camera.view_projection(1.0, &Lens::default()) * glam::Vec4::new(0.0, 1.6, -5.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }
}
