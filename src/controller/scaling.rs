//! # Scaling Functions
//!
//! Pure numeric conversions between pin value ranges and device ranges.
//!
//! ## Value Ranges
//!
//! - Servo pin: 0-180 degrees, 90 = stopped
//! - Raw motor speed: -255 (full reverse) to 255 (full forward)
//! - Analog pin: 0-1023

/// Lowest servo angle.
pub const SERVO_ANGLE_MIN: i32 = 0;
/// Highest servo angle.
pub const SERVO_ANGLE_MAX: i32 = 180;
/// Servo angle that stops the wheel.
pub const SERVO_ANGLE_CENTER: i32 = 90;

/// Largest motor speed magnitude.
pub const MOTOR_SPEED_MAX: i32 = 255;

/// Highest analog pin value.
pub const ANALOG_VALUE_MAX: u16 = 1023;

/// Converts a servo angle to a signed motor speed.
///
/// Out-of-range angles are clamped to 0-180 first. The center angle always
/// maps to exactly 0.
///
/// # Examples
///
/// ```
/// use rvr_bridge::controller::scaling::servo_angle_to_motor_value;
///
/// assert_eq!(servo_angle_to_motor_value(0), -255);
/// assert_eq!(servo_angle_to_motor_value(90), 0);
/// assert_eq!(servo_angle_to_motor_value(180), 255);
/// assert_eq!(servo_angle_to_motor_value(-40), -255);
/// ```
#[must_use]
pub fn servo_angle_to_motor_value(angle: i32) -> i32 {
    let angle = angle.clamp(SERVO_ANGLE_MIN, SERVO_ANGLE_MAX);

    if angle == SERVO_ANGLE_CENTER {
        return 0;
    }

    let span = (2 * MOTOR_SPEED_MAX) as f64;
    ((angle as f64 / SERVO_ANGLE_MAX as f64) * span - MOTOR_SPEED_MAX as f64).floor() as i32
}

/// Linearly remaps `value` from one range to another and clamps the result.
///
/// `from_low` and `from_high` must differ. Equal bounds are not guarded
/// against and yield a meaningless value.
///
/// # Examples
///
/// ```
/// use rvr_bridge::controller::scaling::clamped_linear_remap;
///
/// assert_eq!(clamped_linear_remap(0.5, 0.0, 1.0, 0.0, 100.0), 50.0);
/// assert_eq!(clamped_linear_remap(7.0, 0.0, 1.0, 0.0, 100.0), 100.0);
/// ```
#[must_use]
pub fn clamped_linear_remap(
    value: f64,
    from_low: f64,
    from_high: f64,
    to_low: f64,
    to_high: f64,
) -> f64 {
    let mapped = ((value - from_low) * (to_high - to_low) / (from_high - from_low)) + to_low;
    mapped.max(to_low.min(to_high)).min(to_low.max(to_high))
}

/// Rounds a remapped value onto the analog pin range.
///
/// Halves round away from zero; non-finite input reads as 0.
#[must_use]
pub fn to_analog_value(value: f64) -> u16 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, ANALOG_VALUE_MAX as f64) as u16
}
