// Autonomous routines
//
// A routine is an ordered list of requests plus the pose the robot is
// expected to start from. Routines are described in configuration as a
// list of steps and built against the subsystem handles at mode entry.

mod sequencer;

pub use sequencer::{AutoSequencer, RoutineStatus};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::request::{InstantRequest, Request, SequenceRequest, WaitRequest};
use crate::subsystems::servo::{position_request, settle_request};
use crate::subsystems::{Shared, ServoSubsystem, Subsystem};
use crate::swerve::{ChassisSpeeds, Drive, Pose2d};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RoutineError {
    #[error("Routine {routine} refers to unknown servo {servo}")]
    UnknownServo { routine: String, servo: String },
}

/// One configured routine step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutoStep {
    Wait {
        seconds: f64,
    },
    /// Robot-frame chassis speeds held for a duration, then a stop
    Drive {
        vx: f64,
        vy: f64,
        omega: f64,
        seconds: f64,
    },
    Servo {
        name: String,
        position: f64,
        /// Wait for the mechanism to reach the position
        #[serde(default)]
        settle: bool,
    },
    ServoVoltage {
        name: String,
        volts: f64,
    },
    XBrake,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AutoConfig {
    pub name: String,
    #[serde(default)]
    pub starting_pose: Pose2d,
    #[serde(default)]
    pub steps: Vec<AutoStep>,
}

pub struct AutoRoutine {
    pub name: String,
    pub starting_pose: Pose2d,
    pub steps: Vec<Box<dyn Request>>,
}

impl AutoRoutine {
    /// Build the routine's requests against the live subsystem handles.
    pub fn build(
        config: &AutoConfig,
        drive: &Shared<Drive>,
        servos: &BTreeMap<String, Shared<ServoSubsystem>>,
    ) -> Result<Self, RoutineError> {
        let steps = config
            .steps
            .iter()
            .map(|step| build_step(&config.name, step, drive, servos))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: config.name.clone(),
            starting_pose: config.starting_pose,
            steps,
        })
    }

    pub fn into_sequencer(self) -> AutoSequencer {
        AutoSequencer::new(self.name, self.steps)
    }
}

fn build_step(
    routine: &str,
    step: &AutoStep,
    drive: &Shared<Drive>,
    servos: &BTreeMap<String, Shared<ServoSubsystem>>,
) -> Result<Box<dyn Request>, RoutineError> {
    let servo = |name: &str| {
        servos.get(name).ok_or_else(|| RoutineError::UnknownServo {
            routine: routine.to_string(),
            servo: name.to_string(),
        })
    };

    let request: Box<dyn Request> = match step {
        AutoStep::Wait { seconds } => Box::new(WaitRequest::new(*seconds)),
        AutoStep::Drive {
            vx,
            vy,
            omega,
            seconds,
        } => {
            let speeds = ChassisSpeeds::new(*vx, *vy, *omega);
            let handle = Arc::clone(drive);
            let start: Box<dyn Request> = Box::new(InstantRequest::new("drive_start", move || {
                handle.lock().drive_chassis(speeds);
            }));
            let hold: Box<dyn Request> = Box::new(WaitRequest::new(*seconds));
            Box::new(SequenceRequest::new(
                "drive",
                vec![start, hold, stop_drive(drive)],
            ))
        }
        AutoStep::Servo {
            name,
            position,
            settle,
        } => {
            let servo = servo(name.as_str())?;
            if *settle {
                settle_request(servo, *position)
            } else {
                position_request(servo, *position)
            }
        }
        AutoStep::ServoVoltage { name, volts } => {
            let servo = Arc::clone(servo(name.as_str())?);
            let volts = *volts;
            Box::new(InstantRequest::new(format!("{name}_voltage"), move || {
                servo.lock().set_voltage(volts);
            }))
        }
        AutoStep::XBrake => {
            let drive = Arc::clone(drive);
            Box::new(InstantRequest::new("x_brake", move || drive.lock().set_x()))
        }
        AutoStep::Stop => stop_drive(drive),
    };
    Ok(request)
}

fn stop_drive(drive: &Shared<Drive>) -> Box<dyn Request> {
    let drive = Arc::clone(drive);
    Box::new(InstantRequest::new("drive_stop", move || drive.lock().stop()))
}
