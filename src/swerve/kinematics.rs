// Swerve inverse kinematics
// Converts robot-frame chassis velocities (vx, vy, omega) to per-module velocity and heading.

use super::state::{ChassisSpeeds, ModuleState};

/// Below this wheel speed a module keeps its previous heading (m/s)
const HEADING_HOLD_SPEED: f64 = 1e-6;

/// Module mounting locations relative to the robot center, in meters (x forward, y left)
#[derive(Debug, Clone, PartialEq)]
pub struct SwerveKinematics {
    locations: Vec<[f64; 2]>,
}

impl SwerveKinematics {
    pub fn new(locations: Vec<[f64; 2]>) -> Self {
        Self { locations }
    }

    /// Square chassis with the four modules at (+-half_length, +-half_width).
    ///
    /// Order: front left, front right, back left, back right.
    pub fn rectangular(wheel_base: f64, track_width: f64) -> Self {
        let x = wheel_base / 2.0;
        let y = track_width / 2.0;
        Self::new(vec![[x, y], [x, -y], [-x, y], [-x, -y]])
    }

    pub fn module_count(&self) -> usize {
        self.locations.len()
    }

    pub fn locations(&self) -> &[[f64; 2]] {
        &self.locations
    }

    /// Convert chassis speeds to module states.
    ///
    /// Each wheel's velocity is the chassis translation plus omega x r.
    /// Modules asked for (almost) no speed keep the heading in `previous`
    /// so they don't snap back to zero.
    pub fn to_module_states(
        &self,
        speeds: ChassisSpeeds,
        previous: &[ModuleState],
    ) -> Vec<ModuleState> {
        self.locations
            .iter()
            .enumerate()
            .map(|(i, &[x, y])| {
                // Wheel velocity = [vx - omega*y, vy + omega*x]
                let wx = speeds.vx - speeds.omega * y;
                let wy = speeds.vy + speeds.omega * x;
                let speed = wx.hypot(wy);
                if speed < HEADING_HOLD_SPEED {
                    let angle = previous.get(i).map(|s| s.angle).unwrap_or(0.0);
                    ModuleState::new(0.0, angle)
                } else {
                    ModuleState::new(speed, wy.atan2(wx))
                }
            })
            .collect()
    }

    /// Module headings that point every wheel at the center, with zero speed
    pub fn x_brake_states(&self) -> Vec<ModuleState> {
        self.locations
            .iter()
            .map(|&[x, y]| ModuleState::new(0.0, y.atan2(x)))
            .collect()
    }
}

/// Scale all module speeds down if any wheel exceeds `max_speed`, keeping their ratios
pub fn desaturate(states: &mut [ModuleState], max_speed: f64) {
    let fastest = states
        .iter()
        .map(|s| s.speed.abs())
        .fold(0.0f64, f64::max);

    if fastest > max_speed {
        let scale = max_speed / fastest;
        for state in states.iter_mut() {
            state.speed *= scale;
        }
    }
}

//
///
/// These tests verify the inverse kinematics against hand-computed wheel vectors.
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn kinematics() -> SwerveKinematics {
        SwerveKinematics::rectangular(0.6, 0.6)
    }

    #[test]
    fn test_zero_velocity_keeps_headings() {
        let previous = vec![ModuleState::new(0.0, 0.3); 4];
        let states = kinematics().to_module_states(ChassisSpeeds::default(), &previous);
        for state in states {
            assert_eq!(state.speed, 0.0);
            assert_relative_eq!(state.angle, 0.3);
        }
    }

    #[test]
    fn test_forward_motion() {
        // Pure translation: all wheels parallel at the same speed
        let states = kinematics().to_module_states(ChassisSpeeds::new(1.0, 0.0, 0.0), &[]);
        for state in &states {
            assert_relative_eq!(state.speed, 1.0);
            assert_relative_eq!(state.angle, 0.0);
        }
    }

    #[test]
    fn test_strafe_left() {
        let states = kinematics().to_module_states(ChassisSpeeds::new(0.0, 2.0, 0.0), &[]);
        for state in &states {
            assert_relative_eq!(state.speed, 2.0);
            assert_relative_eq!(state.angle, FRAC_PI_2);
        }
    }

    #[test]
    fn test_rotation_only() {
        // Pure rotation: every wheel tangent to the circle through the center
        let omega = 1.0;
        let states = kinematics().to_module_states(ChassisSpeeds::new(0.0, 0.0, omega), &[]);
        let radius = (0.3f64).hypot(0.3);
        for state in &states {
            assert_relative_eq!(state.speed, omega * radius, epsilon = 1e-12);
        }
        // Front left (0.3, 0.3) moves toward -x, +y
        assert_relative_eq!(states[0].angle, 3.0 * FRAC_PI_4, epsilon = 1e-12);
        // Back right (-0.3, -0.3) moves toward +x, -y
        assert_relative_eq!(states[3].angle, -FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_x_brake_points_at_center() {
        let states = kinematics().x_brake_states();
        assert_relative_eq!(states[0].angle, FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(states[1].angle, -FRAC_PI_4, epsilon = 1e-12);
        assert!(states.iter().all(|s| s.speed == 0.0));
    }

    #[test]
    fn test_desaturate_keeps_ratios() {
        let mut states = vec![ModuleState::new(6.0, 0.0), ModuleState::new(-3.0, 0.0)];
        desaturate(&mut states, 4.0);
        assert_relative_eq!(states[0].speed, 4.0);
        assert_relative_eq!(states[1].speed, -2.0);
    }

    #[test]
    fn test_desaturate_leaves_slow_states_alone() {
        let mut states = vec![ModuleState::new(1.0, 0.0), ModuleState::new(-0.5, 0.0)];
        desaturate(&mut states, 4.0);
        assert_eq!(states[0].speed, 1.0);
        assert_eq!(states[1].speed, -0.5);
    }
}
