#![no_std]
#![no_main]

use defmt::{info, warn, Debug2Format};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::time::Hertz;
use embassy_stm32::Config;
use embassy_time::{Delay, Timer};
use {defmt_rtt as _, panic_probe as _};

use pcabot_core::board::{EchoPin, I2C_FREQUENCY_KHZ};
use pcabot_core::config::{LineFollowConfig, UltrasonicConfig, WallAvoidanceConfig};
use pcabot_core::navigation::{self, NavState};
use pcabot_core::sensors::{InfraredSensor, Ultrasonic};
use pcabot_core::{MotorController, Servo};

defmt::timestamp!("{=u64}", { embassy_time::Instant::now().as_millis() });

#[embassy_executor::task]
async fn blink_task(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after_millis(500).await;
    }
}

#[derive(Clone, Copy, PartialEq, defmt::Format)]
enum RobotMode {
    WallAvoidance,
    LineFollower,
}

impl RobotMode {
    fn next(self) -> Self {
        match self {
            RobotMode::WallAvoidance => RobotMode::LineFollower,
            RobotMode::LineFollower => RobotMode::WallAvoidance,
        }
    }
}

/// Servo slot carrying the ultrasonic ranger.
const SONAR_SERVO: Servo = Servo::S1;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Config::default());

    info!("=== PCA9685 Robot Controller ===");

    let led = Output::new(p.PA5, Level::Low, Speed::Low);
    spawner.spawn(blink_task(led)).unwrap();

    // I2C1: PB8=SCL, PB9=SDA
    let bus = I2c::new_blocking(
        p.I2C1,
        p.PB8,
        p.PB9,
        Hertz::khz(I2C_FREQUENCY_KHZ),
        i2c::Config::default(),
    );
    let mut motors = MotorController::new(bus, Delay);
    if let Err(e) = motors.ensure_initialized().await {
        warn!("PCA9685 not responding: {}", Debug2Format(&e));
    }
    info!("Expander initialized");

    let trig = Output::new(p.PA10, Level::Low, Speed::Low);
    let echo = EchoPin::new(Input::new(p.PB3, Pull::None));
    let mut sonar = Ultrasonic::new(trig, echo, Delay, UltrasonicConfig::default());

    let left = InfraredSensor::new(Input::new(p.PB5, Pull::Up));
    let center = InfraredSensor::new(Input::new(p.PB4, Pull::Up));
    let right = InfraredSensor::new(Input::new(p.PB10, Pull::Up));
    info!("Sensors initialized");

    let button = Input::new(p.PC13, Pull::None);

    let wall = WallAvoidanceConfig::default();
    let line = LineFollowConfig::default();
    let mut mode = RobotMode::WallAvoidance;
    info!("Mode: {} (press B1 to switch)", mode);

    loop {
        if button.is_low() {
            mode = mode.next();
            info!("Mode: {}", mode);
            if let Err(e) = motors.stop_all().await {
                warn!("stop failed: {}", Debug2Format(&e));
            }
            // debounce and give the user time to let go
            while button.is_low() {
                Timer::after_millis(20).await;
            }
        }

        let step = match mode {
            RobotMode::WallAvoidance => {
                navigation::avoid_walls(&mut motors, &mut sonar, SONAR_SERVO, &wall)
                    .await
                    .map(|state| {
                        if state != NavState::Forward {
                            info!("escape: {}", state);
                        }
                    })
            }
            RobotMode::LineFollower => {
                navigation::follow_line_three(&mut motors, &left, &center, &right, &line)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = step {
            warn!("step failed: {}", Debug2Format(&e));
            Timer::after_millis(100).await;
        }
    }
}
