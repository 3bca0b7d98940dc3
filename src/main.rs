// FallWatch — Firmware Entry Point
//
// Boot sequence:
//   1. Initialise logging and validate the pipeline configuration.
//   2. Probe and configure the MPU6050 (synthetic IMU on a desktop build).
//   3. Load the classifier model.
//   4. Spawn the sampler, inference and status tasks.
//   5. Stay behind as the supervisor: restart if a critical task dies.
//
// Any startup failure restarts the system.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use fallwatch::classifier::Classifier;
use fallwatch::config::*;
use fallwatch::drivers::SampleSource;
use fallwatch::platform;
use fallwatch::tasks::inference::InferenceWorker;
use fallwatch::tasks::sampler::Sampler;
use fallwatch::tasks::status::StatusMonitor;
use fallwatch::tasks::supervisor::Supervisor;
use fallwatch::tasks::Shared;
use fallwatch::telemetry::LogSink;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------
fn main() -> anyhow::Result<()> {
    init_logging();
    log::info!("=== FallWatch fall detection ===");

    let config = PipelineConfig::default();
    config.validate()?;
    log::info!("{:?}", config);

    // ---- Startup: sensor + model (fatal on failure) -----------------------
    let source = match init_sensor(&config) {
        Ok(source) => source,
        Err(e) => {
            log::error!("IMU initialization failed: {:#}", e);
            platform::restart();
        }
    };
    let classifier = match init_classifier() {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("Classifier initialization failed: {:#}", e);
            platform::restart();
        }
    };

    // ---- Shared state -----------------------------------------------------
    let shared = Shared::new();
    let sampler = Sampler::new(source, &shared);
    let worker = InferenceWorker::new(classifier, LogSink, &shared, &config);
    let monitor = StatusMonitor::new(&shared, LogSink, config.status_interval);

    // ---- Spawn tasks (FreeRTOS tasks via std::thread) ---------------------
    let period = config.sample_interval();
    let sampler_handle = spawn_task(TaskSpec::SAMPLER, move || {
        sampler.run(period);
    })?;
    let inference_handle = spawn_task(TaskSpec::INFERENCE, move || {
        worker.run();
    })?;
    // Not supervised: losing the status report is not fatal.
    spawn_task(TaskSpec::STATUS, move || {
        monitor.run();
    })?;

    log::info!("System initialized, monitoring started");

    let mut supervisor = Supervisor::new(Duration::from_millis(HEALTH_CHECK_INTERVAL_MS));
    supervisor.watch("sampler", sampler_handle);
    supervisor.watch("inference", inference_handle);
    supervisor.run(platform::restart)
}

// ---------------------------------------------------------------------------
// Task spawning
// ---------------------------------------------------------------------------
struct TaskSpec {
    name: &'static str,
    /// NUL-terminated copy of `name` for the FreeRTOS task name.
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    c_name: &'static [u8],
    stack_size: usize,
    priority: u8,
    core: u8,
}

impl TaskSpec {
    const SAMPLER: Self = Self {
        name: "sampler",
        c_name: b"sampler\0",
        stack_size: STACK_SAMPLER,
        priority: PRIORITY_SAMPLER,
        core: 0,
    };
    const INFERENCE: Self = Self {
        name: "inference",
        c_name: b"inference\0",
        stack_size: STACK_INFERENCE,
        priority: PRIORITY_INFERENCE,
        core: 1,
    };
    const STATUS: Self = Self {
        name: "status",
        c_name: b"status\0",
        stack_size: STACK_STATUS,
        priority: PRIORITY_STATUS,
        core: 0,
    };
}

fn spawn_task<F>(task: TaskSpec, body: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    apply_spawn_config(&task)?;
    let handle = thread::Builder::new()
        .name(task.name.into())
        .stack_size(task.stack_size)
        .spawn(body)?;
    Ok(handle)
}

#[cfg(target_os = "espidf")]
fn apply_spawn_config(task: &TaskSpec) -> anyhow::Result<()> {
    use esp_idf_hal::cpu::Core;
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;

    ThreadSpawnConfiguration {
        name: Some(task.c_name),
        stack_size: task.stack_size,
        priority: task.priority,
        pin_to_core: Some(if task.core == 0 { Core::Core0 } else { Core::Core1 }),
        ..Default::default()
    }
    .set()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn apply_spawn_config(task: &TaskSpec) -> anyhow::Result<()> {
    log::debug!(
        "Spawning {} ({} bytes stack; priority {} / core {} apply on target only)",
        task.name,
        task.stack_size,
        task.priority,
        task.core
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Platform bring-up
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn init_logging() {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(target_os = "espidf")]
fn init_sensor(_config: &PipelineConfig) -> anyhow::Result<impl SampleSource> {
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use fallwatch::drivers::imu::Mpu6050;

    let peripherals = Peripherals::take()?;

    let i2c_config = I2cConfig::new().baudrate((I2C_FREQ_HZ / 1000).kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8, // SDA
        peripherals.pins.gpio9, // SCL
        &i2c_config,
    )?;
    log::info!("I2C initialized (SDA GPIO{}, SCL GPIO{})", PIN_I2C_SDA, PIN_I2C_SCL);

    let mut imu = Mpu6050::new(i2c);
    imu.init()?;
    Ok(imu)
}

#[cfg(not(target_os = "espidf"))]
fn init_sensor(config: &PipelineConfig) -> anyhow::Result<impl SampleSource> {
    use fallwatch::drivers::synthetic::SyntheticImu;

    log::info!("No IMU on this target, using synthetic motion");
    Ok(SyntheticImu::new(config.sample_rate_hz))
}

#[cfg(feature = "tflite-micro")]
fn init_classifier() -> anyhow::Result<impl Classifier> {
    Ok(fallwatch::classifier::TfliteClassifier::load()?)
}

#[cfg(not(feature = "tflite-micro"))]
fn init_classifier() -> anyhow::Result<impl Classifier> {
    let mut classifier = fallwatch::classifier::PlaceholderClassifier::default();
    classifier.load()?;
    Ok(classifier)
}
