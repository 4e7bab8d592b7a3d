// Fixed-rate control loop with input watchdog
// Note: the watchdog zeroes teleop commands when the operator link goes quiet
// Eg. if the teleop client crashes, the robot stops instead of holding the last stick input

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

// local imports
use crate::auto::{AutoRoutine, AutoSequencer, RoutineError, RoutineStatus};
use crate::config::{ConfigError, RobotConfig, TOPIC_DRIVER_INPUT, TOPIC_MODE, TOPIC_STATUS};
use crate::looper::{total_loop_faults, FnLoop, Looper, LooperError, SubsystemLoop};
use crate::messages::{DriverInput, ModeCommand, RobotMode, RuntimeHealth, RuntimeStatus};
use crate::request::{RequestLoop, RequestQueue};
use crate::snapshot::SnapshotCell;
use crate::subsystems::servo::position_request;
use crate::subsystems::{shared, ServoSubsystem, Shared, Subsystem};
use crate::swerve::{
    ActuatorPort, ChassisSpeeds, Drive, DriveError, DriveSettings, ModuleController, SimActuator,
};
use crate::teleop::{ControlBoard, DriveIntent, OperatorIntent, ServoAction, CLIMBER};

/// Simulated steering speed limit (rad/s)
const SIM_TURN_VELOCITY: f64 = 20.0;

/// Simulated servo mechanism speed limit (units/s)
const SIM_SERVO_VELOCITY: f64 = 5.0;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Drive setup failed: {0}")]
    Drive(#[from] DriveError),

    #[error("Looper setup failed: {0}")]
    Looper(#[from] LooperError),

    #[error("Autonomous routine setup failed: {0}")]
    Routine(#[from] RoutineError),

    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which actuator a port is being built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorRole<'a> {
    Drive(&'a str),
    Turn(&'a str),
    Servo(&'a str),
}

pub struct Runtime {
    config: RobotConfig,
    drive: Shared<Drive>,
    servos: BTreeMap<String, Shared<ServoSubsystem>>,
    requests: Shared<RequestQueue>,
    looper: Looper,
    board: ControlBoard,
    mode: RobotMode,
    latest_input: Option<DriverInput>,
    input_received_at: Option<f64>,
    health: RuntimeHealth,
    auto: Option<AutoSequencer>,
    routine_status: Option<RoutineStatus>,
    odometry_samples: Arc<AtomicU64>,
}

impl Runtime {
    /// Build every subsystem on simulated actuators
    pub fn new(config: RobotConfig) -> Result<Self, RuntimeError> {
        // periods below are undefined for zero rates
        config.validate()?;
        let control = config.control;
        let loop_dt = control.loop_period().as_secs_f64();
        let sample_dt = if control.decoupled_sampling() {
            control.odometry_period().as_secs_f64()
        } else {
            loop_dt
        };
        let max_speed = config.drive.max_module_speed;
        Self::with_actuators(config, |role| -> Box<dyn ActuatorPort> {
            match role {
                ActuatorRole::Drive(name) => Box::new(SimActuator::new(
                    format!("{name}_drive"),
                    sample_dt,
                    max_speed,
                )),
                ActuatorRole::Turn(name) => Box::new(SimActuator::new(
                    format!("{name}_turn"),
                    sample_dt,
                    SIM_TURN_VELOCITY,
                )),
                ActuatorRole::Servo(name) => {
                    Box::new(SimActuator::new(name, loop_dt, SIM_SERVO_VELOCITY))
                }
            }
        })
    }

    /// Build every subsystem once, wire the loops and hand out handles.
    pub fn with_actuators<F>(config: RobotConfig, mut actuator: F) -> Result<Self, RuntimeError>
    where
        F: FnMut(ActuatorRole<'_>) -> Box<dyn ActuatorPort>,
    {
        config.validate()?;

        let limits = Arc::new(SnapshotCell::new(config.limits.uncapped));
        let modules = config
            .drive
            .modules
            .iter()
            .map(|module| {
                ModuleController::new(
                    module.name.clone(),
                    config.drive.module_constants(module),
                    actuator(ActuatorRole::Drive(&module.name)),
                    actuator(ActuatorRole::Turn(&module.name)),
                )
            })
            .collect();
        let drive = shared(Drive::new(
            modules,
            config.drive.kinematics(),
            limits,
            DriveSettings {
                max_module_speed: config.drive.max_module_speed,
                open_loop_teleop: config.drive.open_loop_teleop,
            },
        )?);

        let mut servos = BTreeMap::new();
        for servo in &config.servos {
            if servo.name == CLIMBER && !config.control_board.climber_enabled {
                info!("Climber disabled, not registering {}", servo.name);
                continue;
            }
            let port = actuator(ActuatorRole::Servo(&servo.name));
            servos.insert(
                servo.name.clone(),
                shared(ServoSubsystem::new(servo.clone(), port)),
            );
        }

        // fail at start-up rather than at autonomous entry
        if let Some(auto) = &config.autonomous {
            AutoRoutine::build(auto, &drive, &servos)?;
        }

        let requests = shared(RequestQueue::new());
        let odometry_samples = Arc::new(AtomicU64::new(0));

        let mut looper = Looper::new("enabled", config.control.loop_period());
        looper.register(Box::new(RequestLoop::new(Arc::clone(&requests))))?;
        let drive_loop = SubsystemLoop::new(Arc::clone(&drive));
        let drive_loop = if config.control.decoupled_sampling() {
            drive_loop.without_input_capture()
        } else {
            drive_loop
        };
        looper.register(Box::new(drive_loop))?;
        for servo in servos.values() {
            looper.register(Box::new(SubsystemLoop::new(Arc::clone(servo))))?;
        }
        looper.register(Box::new(FnLoop::new(
            "odometry",
            (Arc::clone(&drive), Arc::clone(&odometry_samples)),
            |state: &mut (Shared<Drive>, Arc<AtomicU64>), _timestamp| {
                let (drive, samples) = state;
                let positions = drive.lock().module_positions();
                // a sample counts once every module has contributed to it
                let complete = positions.iter().map(Vec::len).min().unwrap_or(0);
                samples.fetch_add(complete as u64, Ordering::Relaxed);
                Ok(())
            },
        )))?;

        let board = ControlBoard::new(
            config.control_board,
            config.operator,
            config.limits,
            &config.servos,
        );

        Ok(Self {
            config,
            drive,
            servos,
            requests,
            looper,
            board,
            mode: RobotMode::Disabled,
            latest_input: None,
            input_received_at: None,
            health: RuntimeHealth::Disabled,
            auto: None,
            routine_status: None,
            odometry_samples,
        })
    }

    pub fn drive(&self) -> Shared<Drive> {
        Arc::clone(&self.drive)
    }

    pub fn servo(&self, name: &str) -> Option<Shared<ServoSubsystem>> {
        self.servos.get(name).map(Arc::clone)
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming driver input
    pub fn on_input(&mut self, input: DriverInput, timestamp: f64) {
        self.latest_input = Some(input);
        self.input_received_at = Some(timestamp);
    }

    /// Switch robot mode. Leaving autonomous cancels the running routine.
    pub fn set_mode(&mut self, mode: RobotMode, timestamp: f64) {
        if mode == self.mode {
            return;
        }
        info!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        // any mode change drops the autonomous active signal
        self.tick_routine(timestamp, false);
        self.requests.lock().clear();

        match mode {
            RobotMode::Disabled => {
                self.looper.stop(timestamp);
                self.health = RuntimeHealth::Disabled;
            }
            RobotMode::Teleop | RobotMode::Autonomous => {
                if self.looper.is_running() {
                    self.drive.lock().stop();
                } else {
                    self.looper.start(timestamp);
                }
                if mode == RobotMode::Autonomous {
                    self.start_routine();
                }
            }
        }
    }

    fn start_routine(&mut self) {
        let Some(auto) = &self.config.autonomous else {
            warn!("No autonomous routine configured");
            return;
        };
        match AutoRoutine::build(auto, &self.drive, &self.servos) {
            Ok(routine) => {
                info!(
                    "Starting {} from ({:.2}, {:.2}, {:.2})",
                    routine.name,
                    routine.starting_pose.x,
                    routine.starting_pose.y,
                    routine.starting_pose.heading
                );
                self.routine_status = Some(RoutineStatus::Running);
                self.auto = Some(routine.into_sequencer());
            }
            Err(e) => error!("Cannot start routine: {}", e),
        }
    }

    /// One control tick: arbitrate intent for the current mode, then run the looper.
    pub fn tick(&mut self, timestamp: f64) -> RuntimeStatus {
        match self.mode {
            RobotMode::Disabled => {}
            RobotMode::Teleop => self.run_teleop(timestamp),
            RobotMode::Autonomous => self.run_autonomous(timestamp),
        }
        self.looper.tick(timestamp);
        self.status(timestamp)
    }

    fn run_teleop(&mut self, timestamp: f64) {
        let timeout = self.config.control.input_timeout().as_secs_f64();
        let fresh = self
            .input_received_at
            .is_some_and(|received| timestamp - received <= timeout);

        match (&self.latest_input, fresh) {
            (Some(input), true) => {
                if self.health != RuntimeHealth::Ok {
                    info!("Driver input live");
                }
                self.health = RuntimeHealth::Ok;
                let intent = self.board.update(input, None);
                self.apply_intent(intent);
            }
            _ => {
                // Watchdog triggered - stop the robot
                if self.health != RuntimeHealth::InputStale {
                    warn!("Driver input stale, stopping robot");
                }
                self.health = RuntimeHealth::InputStale;
                self.drive.lock().teleop_drive(ChassisSpeeds::default());
                if self.config.control_board.manual_mode {
                    for servo in self.servos.values() {
                        servo.lock().set_voltage(0.0);
                    }
                }
            }
        }
    }

    fn apply_intent(&mut self, intent: OperatorIntent) {
        {
            let mut drive = self.drive.lock();
            drive.set_kinematic_limits(intent.limits);
            match intent.drive {
                DriveIntent::XBrake => drive.set_x(),
                DriveIntent::Drive(speeds) => drive.teleop_drive(speeds),
            }
        }

        for command in intent.servos {
            let Some(servo) = self.servos.get(&command.name) else {
                continue;
            };
            match command.action {
                ServoAction::Voltage(volts) => servo.lock().set_voltage(volts),
                ServoAction::Brake(enabled) => servo.lock().set_brake_mode(enabled),
                ServoAction::Position(position) => {
                    self.requests.lock().push(position_request(servo, position))
                }
            }
        }
    }

    fn run_autonomous(&mut self, timestamp: f64) {
        self.health = RuntimeHealth::Ok;
        self.tick_routine(timestamp, true);
    }

    /// Single entry for the sequencer's active signal: `true` while in
    /// autonomous, `false` from `set_mode` when leaving it.
    fn tick_routine(&mut self, timestamp: f64, active: bool) {
        let Some(sequencer) = self.auto.as_mut() else {
            return;
        };
        let status = sequencer.tick(timestamp, active);
        self.routine_status = Some(status);
        if status != RoutineStatus::Running {
            self.auto = None;
        }
    }

    fn status(&self, timestamp: f64) -> RuntimeStatus {
        let drive = self.drive.lock();
        let servo_stale: u64 = self.servos.values().map(|s| s.lock().stale_reads()).sum();
        RuntimeStatus {
            timestamp,
            mode: self.mode,
            health: self.health,
            limits: drive.kinematic_limits(),
            demo_limits: self.board.demo_limits(),
            module_states: drive.module_states(),
            odometry_samples: self.odometry_samples.load(Ordering::Relaxed),
            stale_reads: drive.stale_reads() + servo_stale,
            loop_faults: total_loop_faults(),
            looper: self.looper.stats(),
            routine: self.routine_status,
        }
    }
}

/// Capture drive sensor snapshots at the odometry rate, independent of the control loop.
pub fn spawn_sampler(drive: Shared<Drive>, period: Duration, clock: Instant) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let timestamp = clock.elapsed().as_secs_f64();
            drive.lock().read_inputs(timestamp);
        }
    })
}

pub async fn run(config: RobotConfig) -> Result<(), RuntimeError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_input = session.declare_subscriber(TOPIC_DRIVER_INPUT).await?;
    let sub_mode = session.declare_subscriber(TOPIC_MODE).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    let control = config.control;
    let mut runtime = Runtime::new(config)?;
    let clock = Instant::now();
    let sampler = control
        .decoupled_sampling()
        .then(|| spawn_sampler(runtime.drive(), control.odometry_period(), clock));

    let mut tick = interval(control.loop_period());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, {}Hz sampling, {}ms watchdog timeout",
        control.loop_hz,
        control.odometry_hz,
        control.input_timeout().as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_DRIVER_INPUT, TOPIC_MODE);
    info!("Publishing to: {}", TOPIC_STATUS);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
        let now = clock.elapsed().as_secs_f64();

        // 1. Mode changes first so this tick already runs in the new mode
        while let Ok(Some(sample)) = sub_mode.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ModeCommand>(&payload) {
                Ok(cmd) => runtime.set_mode(cmd.mode, now),
                Err(e) => warn!("Failed to parse mode command: {}", e),
            }
        }

        // 2. Drain all pending driver input (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_input.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriverInput>(&payload) {
                Ok(input) => runtime.on_input(input, now),
                Err(e) => warn!("Failed to parse driver input: {}", e),
            }
        }

        // 3. Arbitrate and run the control loops (includes watchdog logic)
        let status = runtime.tick(now);

        // 4. Publish status
        let status_json = serde_json::to_string(&status)?;
        pub_status.put(status_json).await?;
    }

    runtime.set_mode(RobotMode::Disabled, clock.elapsed().as_secs_f64());
    if let Some(sampler) = sampler {
        sampler.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::servo::ServoDemand;
    use crate::swerve::actuator::testing::RecordingActuator;
    use crate::swerve::DriveRequest;
    use approx::assert_relative_eq;

    const CONFIG: &str = r#"
        [control]
        loop_hz = 50
        odometry_hz = 50
        input_timeout_ms = 100

        [drive]
        max_module_speed = 4.8
        modules = [
            { name = "front_left", location = [0.3, 0.3] },
            { name = "front_right", location = [0.3, -0.3] },
            { name = "back_left", location = [-0.3, 0.3] },
            { name = "back_right", location = [-0.3, -0.3] },
        ]

        [limits.uncapped]
        max_linear_velocity = 4.0
        max_angular_velocity = 6.0

        [limits.demo]
        max_linear_velocity = 1.0
        max_angular_velocity = 1.0

        [control_board]
        manual_mode = false

        [[servos]]
        name = "fourbar"
        min_position = 0.0
        max_position = 2.0
        presets = [0.5, 1.5]

        [[servos]]
        name = "climber"
        min_position = 0.0
        max_position = 1.0

        [autonomous]
        name = "wait_then_raise"

        [[autonomous.steps]]
        type = "wait"
        seconds = 0.1

        [[autonomous.steps]]
        type = "servo"
        name = "fourbar"
        position = 1.0

        [[autonomous.steps]]
        type = "wait"
        seconds = 5.0
    "#;

    const DT: f64 = 0.02;

    fn runtime() -> Runtime {
        Runtime::new(RobotConfig::from_toml_str(CONFIG).unwrap()).unwrap()
    }

    fn forward() -> DriverInput {
        DriverInput {
            forward: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_disabled_and_idle() {
        let mut runtime = runtime();
        let status = runtime.tick(0.0);
        assert_eq!(status.mode, RobotMode::Disabled);
        assert_eq!(status.health, RuntimeHealth::Disabled);
        assert_eq!(status.looper.ticks, 0);
    }

    #[test]
    fn test_zero_rates_rejected_without_panic() {
        let mut config = RobotConfig::from_toml_str(CONFIG).unwrap();
        config.control.loop_hz = 0;
        assert!(matches!(
            Runtime::new(config),
            Err(RuntimeError::Config(ConfigError::Invalid(_)))
        ));

        let mut config = RobotConfig::from_toml_str(CONFIG).unwrap();
        config.control.odometry_hz = 0;
        assert!(matches!(
            Runtime::new(config),
            Err(RuntimeError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_routine_completes_and_is_released() {
        let mut config = RobotConfig::from_toml_str(CONFIG).unwrap();
        if let Some(auto) = config.autonomous.as_mut() {
            auto.steps.truncate(2);
        }
        let mut runtime = Runtime::new(config).unwrap();
        runtime.set_mode(RobotMode::Autonomous, 0.0);
        let mut t = 0.0;
        let mut status = runtime.tick(t);
        while t < 1.0 && status.routine == Some(RoutineStatus::Running) {
            t += DT;
            status = runtime.tick(t);
        }
        assert_eq!(status.routine, Some(RoutineStatus::Completed));

        // leaving autonomous afterwards does not turn a completion into a cancel
        runtime.set_mode(RobotMode::Teleop, t + DT);
        assert_eq!(runtime.tick(t + DT).routine, Some(RoutineStatus::Completed));
    }

    #[test]
    fn test_climber_not_registered_when_disabled() {
        let runtime = runtime();
        assert!(runtime.servo("fourbar").is_some());
        assert!(runtime.servo(CLIMBER).is_none());
    }

    #[test]
    fn test_teleop_input_reaches_drive() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        runtime.on_input(forward(), 0.0);
        let status = runtime.tick(0.0);
        assert_eq!(status.health, RuntimeHealth::Ok);

        let drive = runtime.drive();
        let drive = drive.lock();
        match drive.request() {
            DriveRequest::Chassis { speeds, .. } => assert_relative_eq!(speeds.vx, 4.0),
            other => panic!("unexpected {:?}", other),
        }
        for module in drive.modules() {
            assert_relative_eq!(module.setpoint().drive_demand, 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_watchdog_zeroes_stale_input() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        runtime.on_input(forward(), 0.0);
        runtime.tick(0.02);

        let status = runtime.tick(0.2);
        assert_eq!(status.health, RuntimeHealth::InputStale);
        match runtime.drive().lock().request() {
            DriveRequest::Chassis { speeds, .. } => assert!(speeds.is_zero()),
            other => panic!("unexpected {:?}", other),
        }

        // fresh input recovers
        runtime.on_input(forward(), 0.22);
        assert_eq!(runtime.tick(0.24).health, RuntimeHealth::Ok);
    }

    #[test]
    fn test_no_input_yet_is_stale() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        assert_eq!(runtime.tick(0.0).health, RuntimeHealth::InputStale);
    }

    #[test]
    fn test_demo_toggle_swaps_drive_limits() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        runtime.on_input(DriverInput::default(), 0.0);
        runtime.tick(0.0);
        runtime.on_input(
            DriverInput {
                demo_toggle: true,
                ..Default::default()
            },
            0.02,
        );
        let status = runtime.tick(0.02);
        assert!(status.demo_limits);
        assert_eq!(status.limits.max_linear_velocity, 1.0);
        assert_eq!(runtime.drive().lock().kinematic_limits().max_linear_velocity, 1.0);
    }

    #[test]
    fn test_preset_goes_through_request_queue() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        let input = DriverInput {
            servos: vec![crate::messages::ServoInput {
                name: "fourbar".to_string(),
                preset: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        };
        runtime.on_input(input, 0.0);
        runtime.tick(0.0);

        let servo = runtime.servo("fourbar").unwrap();
        assert_eq!(servo.lock().demand(), ServoDemand::Position(1.5));
    }

    #[test]
    fn test_autonomous_runs_routine() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Autonomous, 0.0);
        let mut t = 0.0;
        for _ in 0..20 {
            runtime.tick(t);
            t += DT;
        }
        let servo = runtime.servo("fourbar").unwrap();
        assert_eq!(servo.lock().demand(), ServoDemand::Position(1.0));
        assert_eq!(runtime.tick(t).routine, Some(RoutineStatus::Running));
    }

    #[test]
    fn test_leaving_autonomous_cancels_routine() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Autonomous, 0.0);
        runtime.tick(0.0);
        runtime.tick(DT);
        runtime.set_mode(RobotMode::Disabled, 2.0 * DT);

        let status = runtime.tick(3.0 * DT);
        assert_eq!(status.routine, Some(RoutineStatus::Cancelled));
        assert_eq!(status.health, RuntimeHealth::Disabled);
        // the servo step never ran
        let servo = runtime.servo("fourbar").unwrap();
        assert_eq!(servo.lock().demand(), ServoDemand::Voltage(0.0));
    }

    #[test]
    fn test_odometry_drained_each_tick() {
        let mut runtime = runtime();
        runtime.set_mode(RobotMode::Teleop, 0.0);
        for i in 0..5 {
            runtime.tick(i as f64 * DT);
        }
        let status = runtime.tick(5.0 * DT);
        assert_eq!(status.odometry_samples, 6);
        assert!(runtime.drive().lock().module_positions().iter().all(Vec::is_empty));
    }

    #[test]
    fn test_injected_actuators_receive_commands() {
        let ports: Arc<parking_lot::Mutex<Vec<RecordingActuator>>> = Arc::default();
        let mut runtime = Runtime::with_actuators(
            RobotConfig::from_toml_str(CONFIG).unwrap(),
            |_role| {
                let port = RecordingActuator::new();
                ports.lock().push(port.clone());
                Box::new(port)
            },
        )
        .unwrap();
        // four modules with two ports each, plus the fourbar
        assert_eq!(ports.lock().len(), 9);

        runtime.set_mode(RobotMode::Teleop, 0.0);
        runtime.on_input(forward(), 0.0);
        runtime.tick(0.0);
        assert!(ports.lock()[0].last().is_some());
    }

    #[tokio::test]
    async fn test_sampler_captures_between_ticks() {
        let runtime = runtime();
        let drive = runtime.drive();
        let sampler = spawn_sampler(Arc::clone(&drive), Duration::from_millis(2), Instant::now());
        tokio::time::sleep(Duration::from_millis(50)).await;
        sampler.abort();

        let positions = drive.lock().module_positions();
        assert!(positions.iter().all(|samples| samples.len() >= 2));
    }
}
