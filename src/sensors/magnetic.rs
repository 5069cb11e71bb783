// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Mocap magnetometer - a fixed earth field seen through the vehicle attitude
//! reported by motion capture.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DeviceId, Driver, DriverSettings, Sample, SampleSource};
use crate::config::MagnetometerConfig;
use crate::core::{Context, Subscription, Topic};
use crate::error::DriverResult;

/// Devtype code of a simulated magnetometer
pub const DEVTYPE_MAGSIM: u8 = 0x03;

/// Vehicle pose from motion capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleOdometry {
    pub timestamp: u64,
    /// NED position, meters
    pub position: [f32; 3],
    /// Attitude quaternion body to world, (w, x, y, z)
    pub q: [f32; 4],
}

impl Topic for VehicleOdometry {
    const NAME: &'static str = "vehicle_visual_odometry";
}

/// Magnetometer report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MagSample {
    pub timestamp: u64,
    pub device_id: u32,
    /// Gauss, body frame
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// °C, NaN when unknown
    pub temperature: f32,
    pub error_count: u64,
    pub is_external: bool,
}

impl Topic for MagSample {
    const NAME: &'static str = "sensor_mag";
}

impl Sample for MagSample {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl MagSample {
    pub fn field(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Express `reference` (world frame) in the body frame of attitude `q`.
///
/// Returns `None` for a quaternion too short to normalize.
pub fn field_in_body_frame(q: [f32; 4], reference: &Vector3<f32>) -> Option<Vector3<f32>> {
    let attitude = UnitQuaternion::try_new(Quaternion::new(q[0], q[1], q[2], q[3]), 1e-6)?;
    Some(attitude.inverse_transform_vector(reference))
}

pub struct MocapMagSource {
    odometry: Subscription<VehicleOdometry>,
    pose: VehicleOdometry,
    reference: Vector3<f32>,
    field: Vector3<f32>,
    device_id: u32,
}

impl MocapMagSource {
    pub fn new(odometry: Subscription<VehicleOdometry>, reference: Vector3<f32>) -> Self {
        Self {
            odometry,
            pose: VehicleOdometry::default(),
            reference,
            field: reference,
            device_id: DeviceId::simulated(DEVTYPE_MAGSIM).encode(),
        }
    }

    fn sample(&self, timestamp: u64) -> MagSample {
        MagSample {
            timestamp,
            device_id: self.device_id,
            x: self.field.x,
            y: self.field.y,
            z: self.field.z,
            temperature: f32::NAN,
            error_count: 0,
            is_external: false,
        }
    }
}

impl SampleSource for MocapMagSource {
    type Sample = MagSample;
    const NAME: &'static str = "mocap_mag";

    fn initial_sample(&self) -> MagSample {
        self.sample(0)
    }

    fn produce(&mut self, now_us: u64) -> MagSample {
        // stale pose keeps the previous field
        if self.odometry.update(&mut self.pose) {
            match field_in_body_frame(self.pose.q, &self.reference) {
                Some(field) => self.field = field,
                None => debug!("mocap_mag: ignoring degenerate attitude {:?}", self.pose.q),
            }
        }
        self.sample(now_us)
    }
}

pub type MocapMag = Driver<MocapMagSource>;

impl MocapMag {
    pub fn from_config(ctx: Context, config: &MagnetometerConfig) -> DriverResult<Self> {
        let odometry = ctx.bus.subscribe::<VehicleOdometry>(config.pose_instance)?;
        let [x, y, z] = config.reference_field;
        Ok(Driver::new(
            ctx,
            MocapMagSource::new(odometry, Vector3::new(x, y, z)),
            DriverSettings {
                class_path: config.class_path.clone(),
                period_us: config.period_us,
                history_depth: config.history_depth,
            },
        ))
    }
}
